#![deny(warnings, rust_2018_idioms)]

mod support;

use support::{explore, Op};
use weft::Builder;

// Two readers and one writer on a single object. Keeping one access slot per
// thread means the writer is checked against both outstanding reads, so each
// read is explored on both sides of the write.
#[test]
fn reads_are_each_ordered_against_the_write() {
    let builder = Builder::new(3);

    let out = explore(&builder, &[&[Op::Read(0)], &[Op::Read(0)], &[Op::Write(0)]]);

    assert!(out.executions >= 4, "executions = {}", out.executions);
    assert!(out.unique_traces());

    // Depth-first start, then the write pushed all the way to the front.
    assert_eq!(out.traces[0], vec![0, 0, 1, 1, 2, 2]);
    assert!(out.contains_trace(&[2, 2, 0, 0, 1, 1]));

    // Both reads race with the write in the first execution alone.
    assert!(out.races >= 4);
    assert!(out.complete);
}

// Reads do not conflict with each other: no writer, one execution.
#[test]
fn concurrent_reads_are_independent() {
    let builder = Builder::new(2);

    let out = explore(&builder, &[&[Op::Read(0), Op::Read(0)], &[Op::Read(0)]]);

    assert_eq!(out.executions, 1);
    assert_eq!(out.races, 0);
}
