use crate::error::Error;
use crate::rt::access::AccessKind;
use crate::rt::path::Status;
use crate::rt::{lock, object, thread};
use crate::{ObjectId, ThreadId};

/// All per-run state: thread clocks and statuses, object and lock histories,
/// the schedule trace, and how the run ended.
///
/// An execution lives for exactly one run. The exploration tree itself is the
/// only state shared across runs, and it lives on the engine.
#[derive(Debug)]
pub struct Execution {
    pub(crate) threads: thread::Set,
    pub(crate) objects: object::Store,
    pub(crate) locks: lock::Set,

    schedule_trace: Vec<ThreadId>,
    termination: Option<Termination>,
    races: Vec<Race>,
}

/// Why an execution stopped scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Every thread ran to completion.
    Completed,

    /// No thread is runnable but at least one is blocked.
    Deadlock,

    /// The path hit the configured branch limit.
    BranchLimit,
}

/// A pair of dependent accesses to one object unordered by synchronization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Race {
    /// The object both accesses touched.
    pub object: ObjectId,

    /// Thread that performed the earlier access.
    pub first_thread: ThreadId,

    /// Kind of the earlier access.
    pub first_kind: AccessKind,

    /// Branch at which the earlier access occurred.
    pub first_path_id: usize,

    /// Thread that performed the later access.
    pub second_thread: ThreadId,

    /// Kind of the later access.
    pub second_kind: AccessKind,

    /// Branch at which the later access occurred.
    pub second_path_id: usize,
}

impl Execution {
    pub(crate) fn new(num_threads: usize) -> Execution {
        Execution {
            threads: thread::Set::new(num_threads),
            objects: object::Store::new(num_threads),
            locks: lock::Set::new(num_threads),
            schedule_trace: Vec::new(),
            termination: None,
            races: Vec::new(),
        }
    }

    /// Mark a thread as finished. A finished thread is no longer scheduled.
    pub fn finish_thread(&mut self, thread_id: ThreadId) -> Result<(), Error> {
        self.check_thread(thread_id)?;

        let thread = &mut self.threads[thread_id];

        if thread.is_terminated() {
            return Err(Error::AlreadyFinished { thread_id });
        }

        thread.set_terminated();
        Ok(())
    }

    /// Mark a thread as blocked (waiting on a lock or a join).
    pub fn block_thread(&mut self, thread_id: ThreadId) -> Result<(), Error> {
        self.check_thread(thread_id)?;

        let thread = &mut self.threads[thread_id];

        if thread.is_terminated() {
            return Err(Error::AlreadyFinished { thread_id });
        }

        thread.set_blocked();
        Ok(())
    }

    /// Make a blocked thread runnable again.
    pub fn unblock_thread(&mut self, thread_id: ThreadId) -> Result<(), Error> {
        self.check_thread(thread_id)?;

        let thread = &mut self.threads[thread_id];

        if thread.is_terminated() {
            return Err(Error::AlreadyFinished { thread_id });
        }

        thread.set_runnable();
        Ok(())
    }

    /// Let a thread give up its slot: it is only scheduled again once no other
    /// thread is runnable, or at the following decision.
    pub fn yield_thread(&mut self, thread_id: ThreadId) -> Result<(), Error> {
        self.check_thread(thread_id)?;

        let thread = &mut self.threads[thread_id];

        if thread.is_terminated() {
            return Err(Error::AlreadyFinished { thread_id });
        }

        thread.set_yield();
        Ok(())
    }

    /// Returns `true` if the thread has finished.
    pub fn is_finished(&self, thread_id: ThreadId) -> bool {
        assert!(thread_id < self.threads.len(), "thread out of range");
        self.threads[thread_id].is_terminated()
    }

    /// The sequence of threads scheduled so far in this execution.
    pub fn schedule_trace(&self) -> &[ThreadId] {
        &self.schedule_trace
    }

    /// How the execution ended, once scheduling has returned `None`.
    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    /// Returns `true` if the execution was cut short (deadlock or limit).
    pub fn aborted(&self) -> bool {
        matches!(
            self.termination,
            Some(Termination::Deadlock) | Some(Termination::BranchLimit)
        )
    }

    /// Dependent access pairs observed without an ordering synchronization.
    pub fn races(&self) -> &[Race] {
        &self.races
    }

    /// Number of threads taking part in the execution.
    pub fn num_threads(&self) -> usize {
        self.threads.len()
    }

    pub(crate) fn check_thread(&self, thread_id: ThreadId) -> Result<(), Error> {
        if thread_id >= self.threads.len() {
            return Err(Error::ThreadOutOfRange {
                thread_id,
                num_threads: self.threads.len(),
            });
        }

        Ok(())
    }

    /// Each thread's status as seen by the scheduler right now.
    pub(crate) fn runtime_statuses(&self) -> Vec<Status> {
        self.threads
            .iter()
            .map(|(_, thread)| {
                if thread.is_terminated() {
                    Status::Disabled
                } else if thread.is_blocked() {
                    Status::Blocked
                } else if thread.is_yield() {
                    Status::Yielded
                } else {
                    Status::Pending
                }
            })
            .collect()
    }

    /// Note that `thread_id` was chosen to run. Yielded threads deferred for
    /// exactly one decision; reactivate them.
    pub(crate) fn record_scheduled(&mut self, thread_id: ThreadId) {
        for (_, thread) in self.threads.iter_mut() {
            if thread.is_yield() {
                thread.set_runnable();
            }
        }

        debug_assert!(self.threads[thread_id].is_runnable());

        self.schedule_trace.push(thread_id);
    }

    pub(crate) fn terminate(&mut self, termination: Termination) {
        self.termination = Some(termination);
    }

    pub(crate) fn push_race(&mut self, race: Race) {
        self.races.push(race);
    }

    pub(crate) fn all_finished(&self) -> bool {
        self.threads.iter().all(|(_, thread)| thread.is_terminated())
    }
}
