#![deny(missing_debug_implementations, missing_docs, rust_2018_idioms)]

//! Weft systematically explores the thread interleavings of a concurrent
//! program, visiting every meaningfully distinct schedule exactly once.
//!
//! The crate is the scheduling core of a concurrency-testing setup: it does
//! not run threads itself. An external driver models the program as a stream
//! of shared-memory accesses and synchronization events, and weft decides,
//! deterministically, which thread runs at every step. Dynamic partial order
//! reduction prunes schedules that only reorder independent operations, and
//! an optional preemption bound trades completeness for tractability on
//! larger models.
//!
//! # How exploration works
//!
//! Each execution runs the modeled program once under a specific schedule.
//! When two threads touch the same object and at least one writes, the engine
//! compares their vector clocks; if no synchronization orders the accesses,
//! it marks the earlier scheduling decision so a future execution runs the
//! other thread there. Finished executions advance a depth-first cursor
//! through the tree of such decisions, replaying the unchanged prefix and
//! diverging at the marked branch, until no unexplored branch remains.
//!
//! Lock acquire/release, thread spawn, and thread join events feed a
//! happens-before order, so properly synchronized accesses never trigger
//! extra schedules.
//!
//! # Driving the engine
//!
//! The driver owns the loop: ask for a thread, run it to its next observable
//! event, report the event, repeat. When `schedule` returns `None` the
//! execution is over, and `next_execution` says whether an unexplored
//! schedule remains.
//!
//! ```
//! use weft::{AccessKind, Engine};
//!
//! // Two threads, each performing a single write to the same object.
//! let mut engine = Engine::new(2);
//!
//! loop {
//!     let mut execution = engine.begin_execution();
//!     let mut steps = [0usize; 2];
//!
//!     while let Some(tid) = engine.schedule(&mut execution).unwrap() {
//!         if steps[tid] == 1 {
//!             execution.finish_thread(tid).unwrap();
//!         } else {
//!             engine
//!                 .report_access(&mut execution, tid, 0, AccessKind::Write)
//!                 .unwrap();
//!             steps[tid] += 1;
//!         }
//!     }
//!
//!     if !engine.next_execution() {
//!         break;
//!     }
//! }
//!
//! // The two writes conflict, so both orders are explored.
//! assert_eq!(2, engine.executions_completed());
//! ```
//!
//! # Determinism
//!
//! The modeled program must behave deterministically given a schedule: replay
//! reproduces recorded decisions verbatim, and a thread that can no longer
//! run where the recording says it did surfaces as
//! [`Error::ReplayDiverged`]. All other sources of non-determinism (time,
//! randomness, real I/O) must be mocked out by the driver.
//!
//! # Limits
//!
//! `max_branches` caps the work of a single execution and `max_executions`
//! caps the whole exploration; hitting either is a soft stop that marks the
//! resulting [`Report`] incomplete. The engine models a sequentially
//! consistent memory at the granularity of reported accesses; weak-memory
//! effects and liveness properties are out of scope.

mod engine;
mod error;
mod rt;

pub use crate::engine::{init_tracing, Builder, Engine, Report, SyncEvent};
pub use crate::error::Error;
pub use crate::rt::access::AccessKind;
pub use crate::rt::execution::{Execution, Race, Termination};
pub use crate::rt::vv::VersionVec;
pub use crate::rt::MAX_THREADS;

/// Identifies a modeled thread; always less than the configured thread count.
pub type ThreadId = usize;

/// Opaque identifier for a shared object; only equality matters.
pub type ObjectId = u64;

/// Opaque identifier for a lock; only equality matters.
pub type LockId = u64;
