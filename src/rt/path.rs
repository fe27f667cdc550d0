use crate::error::Error;

#[cfg(feature = "checkpoint")]
use serde::{Deserialize, Serialize};
use tracing::trace;

/// The exploration tree position: every scheduling decision recorded so far,
/// plus the replay cursor of the current execution.
///
/// The path persists across executions. While `pos < branches.len()` the
/// current execution deterministically replays recorded decisions; past the
/// end, each decision appends a new branch.
#[derive(Debug)]
#[cfg_attr(feature = "checkpoint", derive(Serialize, Deserialize))]
pub(crate) struct Path {
    preemption_bound: Option<u32>,

    /// Current execution's position in `branches`.
    pos: usize,

    branches: Vec<Branch>,
}

/// One scheduling decision.
#[derive(Debug)]
#[cfg_attr(feature = "checkpoint", derive(Serialize, Deserialize))]
pub(crate) struct Branch {
    /// Per-thread status at this decision point.
    statuses: Vec<Status>,

    /// The thread chosen to run.
    active: usize,

    /// The creation-time choice, when it continued the previous branch's
    /// thread. Promoting a different thread at such a branch is a preemption.
    /// `None` means any choice here is free.
    initial_active: Option<usize>,

    /// Preemptions accumulated before this branch.
    preemptions: u32,
}

/// Status of one thread at one branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "checkpoint", derive(Serialize, Deserialize))]
pub(crate) enum Status {
    /// Not eligible here: finished, or otherwise unable to run.
    Disabled,

    /// Runnable, but not explored from this branch.
    Pending,

    /// The chosen thread.
    Active,

    /// Marked by conflict detection for future exploration.
    Backtrack,

    /// Explored and exhausted.
    Visited,

    /// Blocked on a synchronization operation.
    Blocked,

    /// Gave up its slot voluntarily; only chosen when nothing is pending.
    Yielded,
}

impl Path {
    pub(crate) fn new(preemption_bound: Option<u32>) -> Path {
        Path {
            preemption_bound,
            pos: 0,
            branches: Vec::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.branches.len()
    }

    /// Index of the branch consumed by the most recent scheduling decision.
    pub(crate) fn current_branch(&self) -> Option<usize> {
        self.pos.checked_sub(1)
    }

    /// Returns `true` while recorded decisions remain to be replayed.
    pub(crate) fn is_replaying(&self) -> bool {
        self.pos < self.branches.len()
    }

    /// Reset the replay cursor to the start of the path.
    pub(crate) fn rewind(&mut self) {
        self.pos = 0;
    }

    /// Take the next scheduling decision given each thread's runtime status.
    ///
    /// In replay mode this reproduces the recorded decision, verifying that
    /// the modeled program still allows it. In exploration mode it picks a
    /// thread, preferring the previously active one so preemptions stay rare,
    /// and records the new branch. Returns `None` when no thread can run.
    pub(crate) fn branch_thread(&mut self, seed: Vec<Status>) -> Result<Option<usize>, Error> {
        if self.pos < self.branches.len() {
            let branch = &self.branches[self.pos];

            if !matches!(seed[branch.active], Status::Pending | Status::Yielded) {
                return Err(Error::ReplayDiverged { position: self.pos });
            }

            let active = branch.active;
            self.pos += 1;

            return Ok(Some(active));
        }

        let prev_active = self.branches.last().map(|branch| branch.active);
        let preemptions = self
            .branches
            .last()
            .map(|branch| branch.preemption_count())
            .unwrap_or(0);

        let chosen = prev_active
            .filter(|&thread_id| seed[thread_id] == Status::Pending)
            .or_else(|| seed.iter().position(|status| *status == Status::Pending))
            .or_else(|| seed.iter().position(|status| *status == Status::Yielded));

        let chosen = match chosen {
            Some(chosen) => chosen,
            None => return Ok(None),
        };

        // The chosen thread continues the previous branch's thread, or the
        // switch was forced (the previous thread cannot run here) and is free.
        // The root decision is free as well.
        let initial_active = match prev_active {
            Some(prev) if prev == chosen => Some(chosen),
            _ => None,
        };

        let mut statuses = seed;
        statuses[chosen] = Status::Active;

        trace!(thread = chosen, preemptions, "branch");

        self.branches.push(Branch {
            statuses,
            active: chosen,
            initial_active,
            preemptions,
        });
        self.pos += 1;

        Ok(Some(chosen))
    }

    /// Mark `thread_id` for exploration at branch `path_id`.
    ///
    /// Under a preemption bound an infeasible insertion falls back to the
    /// earliest branch where the thread can still be explored within the
    /// bound; if none exists, the request is dropped.
    pub(crate) fn add_backtrack(&mut self, path_id: usize, thread_id: usize) {
        assert!(
            path_id < self.branches.len(),
            "backtrack past the end of the path",
        );

        let bound = self.preemption_bound;
        let branch = &mut self.branches[path_id];

        match branch.statuses[thread_id] {
            Status::Pending => {
                if bound.map_or(true, |bound| branch.insertion_feasible(bound)) {
                    branch.statuses[thread_id] = Status::Backtrack;
                    trace!(path_id, thread = thread_id, "backtrack");
                } else {
                    self.add_conservative_backtrack(path_id, thread_id);
                }
            }
            Status::Active | Status::Backtrack | Status::Visited | Status::Yielded => {}
            Status::Disabled | Status::Blocked => {
                // The conflicting thread cannot run at this branch. Explore
                // every thread that can, so the reversed ordering is still
                // reachable through one of them.
                if bound.map_or(true, |bound| branch.insertion_feasible(bound)) {
                    for status in &mut branch.statuses {
                        if *status == Status::Pending {
                            *status = Status::Backtrack;
                        }
                    }
                    trace!(path_id, "backtrack all");
                } else {
                    self.add_conservative_backtrack(path_id, thread_id);
                }
            }
        }
    }

    fn add_conservative_backtrack(&mut self, path_id: usize, thread_id: usize) {
        let bound = self
            .preemption_bound
            .expect("conservative backtrack without a preemption bound");

        for idx in 0..path_id {
            let branch = &mut self.branches[idx];

            if branch.statuses[thread_id] == Status::Pending && branch.insertion_feasible(bound) {
                branch.statuses[thread_id] = Status::Backtrack;
                trace!(path_id, fallback = idx, thread = thread_id, "conservative backtrack");
                return;
            }
        }

        // Sound within the bounded regime; orderings only reachable past the
        // bound stay unexplored.
        trace!(path_id, thread = thread_id, "backtrack dropped by preemption bound");
    }

    /// Move to the next unexplored branch, depth first.
    ///
    /// Walking backward from the tail: the explored thread becomes `Visited`;
    /// the lowest-indexed thread marked `Backtrack` (if any) becomes the
    /// branch's new active thread and everything after the branch is
    /// discarded. Exhausted branches are popped. Returns `false` when the
    /// tree is spent.
    pub(crate) fn advance(&mut self) -> bool {
        self.pos = 0;

        while let Some(branch) = self.branches.last_mut() {
            branch.statuses[branch.active] = Status::Visited;

            if let Some(thread_id) = branch
                .statuses
                .iter()
                .position(|status| *status == Status::Backtrack)
            {
                branch.statuses[thread_id] = Status::Active;
                branch.active = thread_id;

                trace!(
                    path_id = self.branches.len() - 1,
                    thread = thread_id,
                    "advance"
                );

                return true;
            }

            self.branches.pop();
        }

        false
    }
}

impl Branch {
    /// Preemptions accumulated up to and including this branch.
    pub(crate) fn preemption_count(&self) -> u32 {
        match self.initial_active {
            Some(initial) if initial != self.active => self.preemptions + 1,
            _ => self.preemptions,
        }
    }

    /// Whether promoting another thread here can stay within `bound`.
    fn insertion_feasible(&self, bound: u32) -> bool {
        self.preemptions + u32::from(self.initial_active.is_some()) <= bound
    }
}
