use crate::rt::access::{Access, AccessKind};
use crate::ObjectId;

use std::collections::HashMap;

/// Access history for every shared object touched during one execution.
#[derive(Debug)]
pub(crate) struct Store {
    num_threads: usize,
    objects: HashMap<ObjectId, State>,
}

/// Per-object history: the most recent write plus each thread's most recent
/// access.
///
/// One slot per thread, rather than a single most-recent record, so that a
/// write is checked against every outstanding read and not just the latest.
#[derive(Debug)]
pub(crate) struct State {
    last_write: Option<Access>,
    last_access: Vec<Option<Access>>,
}

impl Store {
    pub(crate) fn new(num_threads: usize) -> Store {
        Store {
            num_threads,
            objects: HashMap::new(),
        }
    }

    pub(crate) fn state_mut(&mut self, object_id: ObjectId) -> &mut State {
        let num_threads = self.num_threads;
        self.objects
            .entry(object_id)
            .or_insert_with(|| State::new(num_threads))
    }
}

impl State {
    fn new(num_threads: usize) -> State {
        State {
            last_write: None,
            last_access: vec![None; num_threads],
        }
    }

    /// Prior accesses a new access of `kind` depends on: the last write for a
    /// read, every thread's last access for a write.
    pub(crate) fn dependent_accesses<'a>(
        &'a self,
        kind: AccessKind,
    ) -> Box<dyn Iterator<Item = &'a Access> + 'a> {
        match kind {
            AccessKind::Read => Box::new(self.last_write.iter()),
            AccessKind::Write => Box::new(self.last_access.iter().flatten()),
        }
    }

    pub(crate) fn record(&mut self, access: Access) {
        if access.kind().is_write() {
            self.last_write = Some(access.clone());
        }

        let thread_id = access.thread_id();
        self.last_access[thread_id] = Some(access);
    }
}
