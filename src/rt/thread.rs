use crate::rt::vv::VersionVec;

use std::ops;

/// State for a single modeled thread.
#[derive(Debug)]
pub(crate) struct Thread {
    /// Scheduling eligibility.
    pub(crate) state: State,

    /// Semantic happens-before observed by the thread.
    pub(crate) causality: VersionVec,

    /// Scheduling-decision causality, driving conflict detection.
    pub(crate) dpor: VersionVec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    Runnable,
    Blocked,
    Yield,
    Terminated,
}

/// The fixed set of threads taking part in one execution.
#[derive(Debug)]
pub(crate) struct Set {
    threads: Vec<Thread>,
}

impl Thread {
    fn new(num_threads: usize) -> Thread {
        Thread {
            state: State::Runnable,
            causality: VersionVec::new(num_threads),
            dpor: VersionVec::new(num_threads),
        }
    }

    pub(crate) fn is_runnable(&self) -> bool {
        matches!(self.state, State::Runnable)
    }

    pub(crate) fn set_runnable(&mut self) {
        self.state = State::Runnable;
    }

    pub(crate) fn is_blocked(&self) -> bool {
        matches!(self.state, State::Blocked)
    }

    pub(crate) fn set_blocked(&mut self) {
        self.state = State::Blocked;
    }

    pub(crate) fn is_yield(&self) -> bool {
        matches!(self.state, State::Yield)
    }

    pub(crate) fn set_yield(&mut self) {
        self.state = State::Yield;
    }

    pub(crate) fn is_terminated(&self) -> bool {
        matches!(self.state, State::Terminated)
    }

    pub(crate) fn set_terminated(&mut self) {
        self.state = State::Terminated;
    }
}

impl Set {
    /// Create the thread set. All threads start runnable; the initial thread
    /// has already "happened", so its birth occupies position zero of both of
    /// its clocks.
    pub(crate) fn new(num_threads: usize) -> Set {
        let mut threads: Vec<_> = (0..num_threads).map(|_| Thread::new(num_threads)).collect();

        threads[0].causality.inc(0);
        threads[0].dpor.inc(0);

        Set { threads }
    }

    pub(crate) fn len(&self) -> usize {
        self.threads.len()
    }

    pub(crate) fn iter(&self) -> impl ExactSizeIterator<Item = (usize, &Thread)> + '_ {
        self.threads.iter().enumerate()
    }

    pub(crate) fn iter_mut(&mut self) -> impl ExactSizeIterator<Item = (usize, &mut Thread)> + '_ {
        self.threads.iter_mut().enumerate()
    }

    /// Mutable references to two distinct threads.
    pub(crate) fn pair_mut(&mut self, a: usize, b: usize) -> (&mut Thread, &mut Thread) {
        assert!(a != b, "pair_mut requires distinct threads");

        if a < b {
            let (left, right) = self.threads.split_at_mut(b);
            (&mut left[a], &mut right[0])
        } else {
            let (left, right) = self.threads.split_at_mut(a);
            (&mut right[0], &mut left[b])
        }
    }
}

impl ops::Index<usize> for Set {
    type Output = Thread;

    fn index(&self, index: usize) -> &Thread {
        &self.threads[index]
    }
}

impl ops::IndexMut<usize> for Set {
    fn index_mut(&mut self, index: usize) -> &mut Thread {
        &mut self.threads[index]
    }
}
