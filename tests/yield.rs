#![deny(warnings, rust_2018_idioms)]

mod support;

use support::{explore, Op};
use weft::Builder;

// A yielded thread gives up exactly one decision: the other thread runs
// first, then the yielder resumes.
#[test]
fn yield_defers_one_decision() {
    let builder = Builder::new(2);

    let out = explore(&builder, &[&[Op::Yield, Op::Write(0)], &[Op::Write(1)]]);

    assert_eq!(out.executions, 1);
    assert_eq!(out.traces[0], vec![0, 1, 1, 0, 0]);
    assert_eq!(out.preemptions, vec![0]);
}

// When every runnable thread has yielded, one of them is woken to keep the
// execution moving.
#[test]
fn lone_yielder_still_runs() {
    let builder = Builder::new(1);

    let out = explore(&builder, &[&[Op::Yield, Op::Write(0)]]);

    assert_eq!(out.executions, 1);
    assert_eq!(out.traces[0], vec![0, 0, 0]);
}
