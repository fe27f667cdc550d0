//! Configure and orchestrate the exploration.

use crate::error::Error;
use crate::rt::access::{Access, AccessKind};
use crate::rt::execution::{Execution, Race, Termination};
use crate::rt::path::Path;
use crate::rt::MAX_THREADS;
use crate::{LockId, ObjectId, ThreadId};

use std::env;

use tracing::{info, trace, warn};

const DEFAULT_MAX_BRANCHES: usize = 100_000;

/// Configure an exploration [`Engine`].
#[derive(Debug)]
#[non_exhaustive]
pub struct Builder {
    /// Number of threads taking part in each execution. Must be between 1 and
    /// [`MAX_THREADS`].
    pub num_threads: usize,

    /// Maximum preemptions per execution; `None` explores without a bound.
    ///
    /// Defaults to the `WEFT_MAX_PREEMPTIONS` environment variable.
    pub preemption_bound: Option<u32>,

    /// Safety cap on the number of scheduling decisions in one execution.
    ///
    /// Defaults to the `WEFT_MAX_BRANCHES` environment variable.
    pub max_branches: usize,

    /// Hard cap on the number of executions explored.
    ///
    /// Defaults to the `WEFT_MAX_EXECUTIONS` environment variable.
    pub max_executions: Option<u64>,
}

impl Builder {
    /// Create a new `Builder`, seeding defaults from the environment.
    pub fn new(num_threads: usize) -> Builder {
        let max_branches = env::var("WEFT_MAX_BRANCHES")
            .map(|v| v.parse().expect("invalid value for `WEFT_MAX_BRANCHES`"))
            .unwrap_or(DEFAULT_MAX_BRANCHES);

        let preemption_bound = env::var("WEFT_MAX_PREEMPTIONS")
            .map(|v| v.parse().expect("invalid value for `WEFT_MAX_PREEMPTIONS`"))
            .ok();

        let max_executions = env::var("WEFT_MAX_EXECUTIONS")
            .map(|v| v.parse().expect("invalid value for `WEFT_MAX_EXECUTIONS`"))
            .ok();

        Builder {
            num_threads,
            preemption_bound,
            max_branches,
            max_executions,
        }
    }

    /// Validate the configuration and construct an [`Engine`].
    pub fn build(&self) -> Result<Engine, Error> {
        if self.num_threads == 0 {
            return Err(Error::InvalidConfig {
                reason: "num_threads must be at least 1",
            });
        }

        if self.num_threads > MAX_THREADS {
            return Err(Error::InvalidConfig {
                reason: "num_threads exceeds MAX_THREADS",
            });
        }

        if self.max_branches == 0 {
            return Err(Error::InvalidConfig {
                reason: "max_branches must be at least 1",
            });
        }

        if self.max_executions == Some(0) {
            return Err(Error::InvalidConfig {
                reason: "max_executions must be at least 1",
            });
        }

        Ok(Engine {
            num_threads: self.num_threads,
            max_branches: self.max_branches,
            max_executions: self.max_executions,
            path: Path::new(self.preemption_bound),
            executions_completed: 0,
            tree_depth: 0,
            incomplete: false,
        })
    }
}

/// A synchronization event reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    /// The reporting thread acquired the lock.
    LockAcquire(LockId),

    /// The reporting thread released the lock.
    LockRelease(LockId),

    /// The reporting thread started the given child thread.
    ThreadSpawn(ThreadId),

    /// The reporting thread joined on the given finished thread.
    ThreadJoin(ThreadId),
}

/// The interleaving exploration engine.
///
/// The engine owns the exploration tree and carries it across executions;
/// everything else lives on the per-run [`Execution`]. The driver alternates
/// between asking [`schedule`](Engine::schedule) which thread runs next,
/// running that thread to its next observable event, and reporting the event
/// back through [`report_access`](Engine::report_access) or
/// [`report_sync`](Engine::report_sync).
#[derive(Debug)]
pub struct Engine {
    num_threads: usize,
    max_branches: usize,
    max_executions: Option<u64>,

    /// The exploration tree, shared by every execution.
    path: Path,

    executions_completed: u64,
    tree_depth: usize,
    incomplete: bool,
}

impl Engine {
    /// Build an engine with default configuration.
    ///
    /// # Panics
    ///
    /// Panics if `num_threads` is zero or exceeds [`MAX_THREADS`].
    pub fn new(num_threads: usize) -> Engine {
        Builder::new(num_threads)
            .build()
            .expect("invalid configuration")
    }

    /// Begin a fresh execution.
    ///
    /// Per-run state starts from scratch; the exploration tree persists and
    /// its recorded prefix will be replayed. Beginning an execution twice
    /// without advancing the tree reproduces the same schedule.
    pub fn begin_execution(&mut self) -> Execution {
        self.path.rewind();
        Execution::new(self.num_threads)
    }

    /// Decide which thread runs next.
    ///
    /// Returns `Ok(None)` when the execution is over; the reason is recorded
    /// on the execution as a [`Termination`].
    pub fn schedule(&mut self, execution: &mut Execution) -> Result<Option<ThreadId>, Error> {
        if execution.termination().is_some() {
            return Ok(None);
        }

        if !self.path.is_replaying() && self.path.len() >= self.max_branches {
            warn!(
                max_branches = self.max_branches,
                "branch limit exceeded; aborting execution"
            );
            self.incomplete = true;
            execution.terminate(Termination::BranchLimit);
            return Ok(None);
        }

        let seed = execution.runtime_statuses();

        match self.path.branch_thread(seed)? {
            Some(thread_id) => {
                execution.record_scheduled(thread_id);
                Ok(Some(thread_id))
            }
            None => {
                let termination = if execution.all_finished() {
                    Termination::Completed
                } else {
                    Termination::Deadlock
                };

                execution.terminate(termination);
                info!(?termination, branches = self.path.len(), "execution done");
                Ok(None)
            }
        }
    }

    /// Record a read or write of a shared object by the scheduled thread.
    ///
    /// If a prior dependent access is concurrent with the reporting thread in
    /// scheduling causality, a backtrack point is inserted at the prior
    /// access's branch so the reversed ordering gets explored. Accesses
    /// concurrent in semantic happens-before are additionally recorded as
    /// [`Race`]s.
    pub fn report_access(
        &mut self,
        execution: &mut Execution,
        thread_id: ThreadId,
        object_id: ObjectId,
        kind: AccessKind,
    ) -> Result<(), Error> {
        execution.check_thread(thread_id)?;

        let path_id = self.path.current_branch().ok_or(Error::NotScheduled)?;

        let dpor_now = execution.threads[thread_id].dpor.clone();
        let causality_now = execution.threads[thread_id].causality.clone();

        let mut joined = dpor_now.clone();
        let mut backtracks = Vec::new();
        let mut races = Vec::new();

        {
            let state = execution.objects.state_mut(object_id);

            for prior in state.dependent_accesses(kind) {
                if !prior.happens_before(&dpor_now) {
                    backtracks.push(prior.path_id());
                }

                if !prior.synchronized_before(&causality_now) {
                    races.push(Race {
                        object: object_id,
                        first_thread: prior.thread_id(),
                        first_kind: prior.kind(),
                        first_path_id: prior.path_id(),
                        second_thread: thread_id,
                        second_kind: kind,
                        second_path_id: path_id,
                    });
                }

                joined.join(prior.dpor());
            }
        }

        for point in backtracks {
            self.path.add_backtrack(point, thread_id);
        }

        for race in races {
            trace!(object = object_id, ?race, "race observed");
            execution.push_race(race);
        }

        let thread = &mut execution.threads[thread_id];
        thread.dpor = joined;
        thread.dpor.inc(thread_id);
        thread.causality.inc(thread_id);

        let access = Access::new(
            path_id,
            thread_id,
            kind,
            thread.dpor.clone(),
            thread.causality.clone(),
        );
        execution.objects.state_mut(object_id).record(access);

        Ok(())
    }

    /// Record a synchronization event performed by the scheduled thread.
    ///
    /// Each event contributes the happens-before edges that keep properly
    /// synchronized accesses from looking concurrent.
    pub fn report_sync(
        &mut self,
        execution: &mut Execution,
        thread_id: ThreadId,
        event: SyncEvent,
    ) -> Result<(), Error> {
        execution.check_thread(thread_id)?;

        match event {
            SyncEvent::LockAcquire(lock_id) => {
                let path_id = self.path.current_branch().ok_or(Error::NotScheduled)?;

                let dpor_now = execution.threads[thread_id].dpor.clone();

                let mut joined = dpor_now.clone();
                let mut backtracks = Vec::new();

                let released = {
                    let lock = execution.locks.lock_mut(lock_id);

                    // Competing acquires of one lock are dependent: each order
                    // is a distinct schedule.
                    for prior in lock.acquire_records() {
                        if !prior.happens_before(&dpor_now) {
                            backtracks.push(prior.path_id());
                        }
                    }

                    if let Some(released_dpor) = lock.released_dpor() {
                        joined.join(released_dpor);
                    }

                    lock.released().cloned()
                };

                for point in backtracks {
                    self.path.add_backtrack(point, thread_id);
                }

                let thread = &mut execution.threads[thread_id];

                if let Some(released) = &released {
                    thread.causality.join(released);
                }

                thread.dpor = joined;
                thread.causality.inc(thread_id);
                thread.dpor.inc(thread_id);

                let access = Access::new(
                    path_id,
                    thread_id,
                    AccessKind::Write,
                    thread.dpor.clone(),
                    thread.causality.clone(),
                );
                execution.locks.lock_mut(lock_id).record_acquire(access);

                Ok(())
            }
            SyncEvent::LockRelease(lock_id) => {
                let known = execution.locks.contains(lock_id);

                let causality = execution.threads[thread_id].causality.clone();
                let dpor = execution.threads[thread_id].dpor.clone();
                execution.locks.lock_mut(lock_id).release(&causality, &dpor);

                if !known {
                    warn!(lock = lock_id, "lock released without a recorded acquire");
                    return Err(Error::UnknownLock { lock_id });
                }

                Ok(())
            }
            SyncEvent::ThreadSpawn(child_id) => {
                execution.check_thread(child_id)?;

                if child_id == thread_id {
                    return Err(Error::SelfReference { thread_id });
                }

                let (parent, child) = execution.threads.pair_mut(thread_id, child_id);

                child.causality.join(&parent.causality);
                child.dpor.join(&parent.dpor);

                parent.causality.inc(thread_id);
                parent.dpor.inc(thread_id);

                Ok(())
            }
            SyncEvent::ThreadJoin(target_id) => {
                execution.check_thread(target_id)?;

                if target_id == thread_id {
                    return Err(Error::SelfReference { thread_id });
                }

                if !execution.threads[target_id].is_terminated() {
                    return Err(Error::JoinUnfinished {
                        thread_id: target_id,
                    });
                }

                let (joiner, target) = execution.threads.pair_mut(thread_id, target_id);

                joiner.causality.join(&target.causality);
                joiner.dpor.join(&target.dpor);

                Ok(())
            }
        }
    }

    /// Advance the exploration tree to the next unexplored branch.
    ///
    /// Returns `false` when the tree is exhausted or the execution limit is
    /// reached; the driver should stop exploring.
    pub fn next_execution(&mut self) -> bool {
        self.executions_completed += 1;
        self.tree_depth = self.path.len();

        let more = self.path.advance();

        if let Some(max) = self.max_executions {
            if self.executions_completed >= max {
                if more {
                    self.incomplete = true;
                }

                info!(
                    executions = self.executions_completed,
                    "execution limit reached"
                );
                return false;
            }
        }

        if !more {
            info!(
                executions = self.executions_completed,
                "exploration complete"
            );
        }

        more
    }

    /// Number of executions completed so far.
    pub fn executions_completed(&self) -> u64 {
        self.executions_completed
    }

    /// Path length at the most recently completed execution.
    pub fn tree_depth(&self) -> usize {
        self.tree_depth
    }

    /// Seed a [`Report`] with what the engine observed. The property judgment
    /// and any counterexamples are the driver's to fill in.
    pub fn report(&self) -> Report {
        Report {
            property_holds: true,
            executions_explored: self.executions_completed,
            counterexample: None,
            failures: Vec::new(),
            complete: !self.incomplete,
        }
    }
}

/// The result of an exploration, as handed across the library boundary.
#[derive(Debug, Clone)]
pub struct Report {
    /// Whether the driver's invariant held in every explored execution.
    pub property_holds: bool,

    /// Number of executions explored.
    pub executions_explored: u64,

    /// Schedule trace of the first failing execution, if any.
    pub counterexample: Option<Vec<ThreadId>>,

    /// Every failing execution: its index and its schedule trace.
    pub failures: Vec<(u64, Vec<ThreadId>)>,

    /// `false` when a branch or execution limit cut the exploration short.
    pub complete: bool,
}

/// Install a global `tracing` subscriber configured from the `WEFT_LOG`
/// environment variable. Later calls keep the first subscriber.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_env("WEFT_LOG"))
        .with_test_writer()
        .without_time()
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[cfg(feature = "checkpoint")]
impl Engine {
    /// Persist the exploration tree so a later process can resume from it.
    pub fn store_checkpoint(&self, file: &std::path::Path) -> std::io::Result<()> {
        let serialized = serde_json::to_string(&self.path)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

        std::fs::write(file, serialized)
    }

    /// Replace the exploration tree with a previously stored one.
    pub fn load_checkpoint(&mut self, file: &std::path::Path) -> std::io::Result<()> {
        let contents = std::fs::read_to_string(file)?;

        self.path = serde_json::from_str(&contents)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        self.path.rewind();

        Ok(())
    }
}
