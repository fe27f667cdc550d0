use crate::{LockId, ThreadId};

/// Errors surfaced by the engine.
///
/// Configuration errors are returned at build time; the rest are usage errors
/// that leave the engine and the exploration tree in a defined state, so the
/// driver may recover or abort. Soft terminations (branch and execution
/// limits) are not errors: they surface through
/// [`Termination`](crate::Termination) and `next_execution` instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The engine configuration is unusable.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What is wrong with the configuration.
        reason: &'static str,
    },

    /// A reported thread id is not below the configured thread count.
    #[error("thread {thread_id} out of range (num_threads = {num_threads})")]
    ThreadOutOfRange {
        /// The offending thread id.
        thread_id: ThreadId,
        /// The configured thread count.
        num_threads: usize,
    },

    /// The thread already finished and cannot change state again.
    #[error("thread {thread_id} already finished")]
    AlreadyFinished {
        /// The offending thread id.
        thread_id: ThreadId,
    },

    /// A join was reported against a thread that has not finished.
    #[error("cannot join thread {thread_id}: it has not finished")]
    JoinUnfinished {
        /// The join target.
        thread_id: ThreadId,
    },

    /// A thread reported a spawn or join naming itself.
    #[error("thread {thread_id} cannot spawn or join itself")]
    SelfReference {
        /// The offending thread id.
        thread_id: ThreadId,
    },

    /// A lock was released without a recorded acquire. Diagnostic: the
    /// release clock is still recorded before the error is returned.
    #[error("lock {lock_id:#x} released without a recorded acquire")]
    UnknownLock {
        /// The offending lock id.
        lock_id: LockId,
    },

    /// An access or synchronization event arrived before any scheduling
    /// decision was taken.
    #[error("event reported before any scheduling decision")]
    NotScheduled,

    /// Replay met a branch whose recorded thread can no longer run: the
    /// modeled program did not behave deterministically.
    #[error("replay diverged at branch {position}: the modeled program is nondeterministic")]
    ReplayDiverged {
        /// Position of the divergent branch in the path.
        position: usize,
    },
}
