#![deny(warnings, rust_2018_idioms)]

mod support;

use support::{run_one, Op};
use weft::{AccessKind, Builder, Engine, Error};

// Beginning an execution twice without advancing the tree must reproduce the
// exact same scheduling decisions.
#[test]
fn begin_twice_reproduces_the_schedule() {
    let mut engine = Builder::new(2).build().unwrap();
    let script: &[Op] = &[Op::Read(0), Op::Write(0)];

    let first = run_one(&mut engine, &[script, script]);
    let second = run_one(&mut engine, &[script, script]);

    assert_eq!(first.trace, second.trace);

    // Advancing the tree changes the schedule.
    assert!(engine.next_execution());
    let third = run_one(&mut engine, &[script, script]);
    assert_ne!(first.trace, third.trace);
}

// Replay reproduces the recorded prefix verbatim: the traces of consecutive
// executions agree up to the divergence point.
#[test]
fn replay_shares_a_prefix_with_the_previous_execution() {
    let mut engine = Builder::new(2).build().unwrap();
    let script: &[Op] = &[Op::Write(0), Op::Write(0)];

    let first = run_one(&mut engine, &[script, script]);
    assert!(engine.next_execution());
    let second = run_one(&mut engine, &[script, script]);

    let shared = first
        .trace
        .iter()
        .zip(&second.trace)
        .take_while(|(a, b)| a == b)
        .count();
    let divergence = engine.tree_depth().min(first.trace.len());

    assert!(shared < first.trace.len());
    assert!(shared <= divergence);
}

// A thread that can no longer run where the recording says it did means the
// modeled program is nondeterministic.
#[test]
fn blocked_replay_thread_diverges() {
    let mut engine = Engine::new(2);

    // First execution: both threads write the same object once.
    let mut execution = engine.begin_execution();
    let mut steps = [0usize; 2];
    while let Some(tid) = engine.schedule(&mut execution).unwrap() {
        if steps[tid] == 1 {
            execution.finish_thread(tid).unwrap();
        } else {
            engine
                .report_access(&mut execution, tid, 0, AccessKind::Write)
                .unwrap();
            steps[tid] += 1;
        }
    }

    // The conflict forces a second schedule starting with thread 1.
    assert!(engine.next_execution());

    let mut execution = engine.begin_execution();
    execution.block_thread(1).unwrap();

    let err = engine.schedule(&mut execution).unwrap_err();
    assert_eq!(err, Error::ReplayDiverged { position: 0 });
}
