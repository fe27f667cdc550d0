use crate::rt::access::Access;
use crate::rt::vv::VersionVec;
use crate::LockId;

use std::collections::HashMap;

/// Synchronization state for every lock touched during one execution.
#[derive(Debug)]
pub(crate) struct Set {
    num_threads: usize,
    locks: HashMap<LockId, Lock>,
}

/// A single lock.
///
/// The clocks published by the most recent release are joined into later
/// acquirers, ordering the critical sections. The per-thread acquire records
/// make contended acquisition itself a schedulable conflict.
#[derive(Debug)]
pub(crate) struct Lock {
    released: Option<VersionVec>,
    released_dpor: Option<VersionVec>,
    acquires: Vec<Option<Access>>,
}

impl Set {
    pub(crate) fn new(num_threads: usize) -> Set {
        Set {
            num_threads,
            locks: HashMap::new(),
        }
    }

    pub(crate) fn contains(&self, lock_id: LockId) -> bool {
        self.locks.contains_key(&lock_id)
    }

    pub(crate) fn lock_mut(&mut self, lock_id: LockId) -> &mut Lock {
        let num_threads = self.num_threads;
        self.locks
            .entry(lock_id)
            .or_insert_with(|| Lock::new(num_threads))
    }
}

impl Lock {
    fn new(num_threads: usize) -> Lock {
        Lock {
            released: None,
            released_dpor: None,
            acquires: vec![None; num_threads],
        }
    }

    pub(crate) fn acquire_records(&self) -> impl Iterator<Item = &Access> {
        self.acquires.iter().flatten()
    }

    pub(crate) fn record_acquire(&mut self, access: Access) {
        let thread_id = access.thread_id();
        self.acquires[thread_id] = Some(access);
    }

    /// Causality clock stored by the most recent release.
    pub(crate) fn released(&self) -> Option<&VersionVec> {
        self.released.as_ref()
    }

    pub(crate) fn released_dpor(&self) -> Option<&VersionVec> {
        self.released_dpor.as_ref()
    }

    pub(crate) fn release(&mut self, causality: &VersionVec, dpor: &VersionVec) {
        self.released = Some(causality.clone());
        self.released_dpor = Some(dpor.clone());
    }
}
