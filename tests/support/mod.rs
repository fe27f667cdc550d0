#![allow(dead_code)]

use std::collections::{HashMap, HashSet};

use weft::{AccessKind, Builder, Engine, LockId, ObjectId, SyncEvent, Termination, ThreadId};

/// One step of a scripted thread.
#[derive(Debug, Clone, Copy)]
pub enum Op {
    Read(ObjectId),
    Write(ObjectId),
    Acquire(LockId),
    Release(LockId),
    Spawn(ThreadId),
    Join(ThreadId),
    Yield,
}

/// What a single execution produced.
#[derive(Debug)]
pub struct Run {
    pub trace: Vec<ThreadId>,
    pub preemptions: u32,
    pub termination: Option<Termination>,
    pub races: usize,
}

/// What an exploration produced, summed over every execution.
#[derive(Debug)]
pub struct Outcome {
    pub executions: u64,
    pub traces: Vec<Vec<ThreadId>>,
    pub deadlocks: usize,
    pub branch_limited: usize,
    pub races: usize,
    pub preemptions: Vec<u32>,
    pub complete: bool,
}

impl Outcome {
    pub fn unique_traces(&self) -> bool {
        let set: HashSet<_> = self.traces.iter().collect();
        set.len() == self.traces.len()
    }

    pub fn contains_trace(&self, trace: &[ThreadId]) -> bool {
        self.traces.iter().any(|t| t == trace)
    }
}

/// Run a single execution of the scripted threads, implementing the
/// turn-taking contract: run the chosen thread to its next observable event,
/// report the event, repeat until scheduling returns `None`.
///
/// The driver owns the blocking rules: a thread stalls on a held lock or an
/// unfinished join target, and threads named by a `Spawn` op stay blocked
/// until their parent spawns them.
pub fn run_one(engine: &mut Engine, scripts: &[&[Op]]) -> Run {
    let mut execution = engine.begin_execution();

    let spawned: HashSet<ThreadId> = scripts
        .iter()
        .flat_map(|script| script.iter())
        .filter_map(|op| match op {
            Op::Spawn(child) => Some(*child),
            _ => None,
        })
        .collect();

    for &child in &spawned {
        execution.block_thread(child).unwrap();
    }

    let mut pc = vec![0usize; scripts.len()];
    let mut finished = vec![false; scripts.len()];
    let mut blocked = vec![false; scripts.len()];
    let mut yielded = vec![false; scripts.len()];

    for &child in &spawned {
        blocked[child] = true;
    }

    let mut owners: HashMap<LockId, ThreadId> = HashMap::new();
    let mut lock_waiters: HashMap<LockId, Vec<ThreadId>> = HashMap::new();
    let mut join_waiters: HashMap<ThreadId, Vec<ThreadId>> = HashMap::new();

    let mut preemptions = 0u32;
    let mut prev: Option<ThreadId> = None;

    while let Some(tid) = engine.schedule(&mut execution).unwrap() {
        if let Some(p) = prev {
            if p != tid && !finished[p] && !blocked[p] && !yielded[p] {
                preemptions += 1;
            }
        }
        prev = Some(tid);

        for y in yielded.iter_mut() {
            *y = false;
        }

        if pc[tid] == scripts[tid].len() {
            execution.finish_thread(tid).unwrap();
            finished[tid] = true;

            for waiter in join_waiters.remove(&tid).unwrap_or_default() {
                execution.unblock_thread(waiter).unwrap();
                blocked[waiter] = false;
            }

            continue;
        }

        match scripts[tid][pc[tid]] {
            Op::Read(object) => {
                engine
                    .report_access(&mut execution, tid, object, AccessKind::Read)
                    .unwrap();
                pc[tid] += 1;
            }
            Op::Write(object) => {
                engine
                    .report_access(&mut execution, tid, object, AccessKind::Write)
                    .unwrap();
                pc[tid] += 1;
            }
            Op::Acquire(lock) => match owners.get(&lock) {
                Some(&owner) if owner != tid => {
                    execution.block_thread(tid).unwrap();
                    blocked[tid] = true;
                    lock_waiters.entry(lock).or_default().push(tid);
                }
                _ => {
                    owners.insert(lock, tid);
                    engine
                        .report_sync(&mut execution, tid, SyncEvent::LockAcquire(lock))
                        .unwrap();
                    pc[tid] += 1;
                }
            },
            Op::Release(lock) => {
                owners.remove(&lock);
                engine
                    .report_sync(&mut execution, tid, SyncEvent::LockRelease(lock))
                    .unwrap();

                for waiter in lock_waiters.remove(&lock).unwrap_or_default() {
                    execution.unblock_thread(waiter).unwrap();
                    blocked[waiter] = false;
                }

                pc[tid] += 1;
            }
            Op::Spawn(child) => {
                engine
                    .report_sync(&mut execution, tid, SyncEvent::ThreadSpawn(child))
                    .unwrap();
                execution.unblock_thread(child).unwrap();
                blocked[child] = false;
                pc[tid] += 1;
            }
            Op::Join(target) => {
                if finished[target] {
                    engine
                        .report_sync(&mut execution, tid, SyncEvent::ThreadJoin(target))
                        .unwrap();
                    pc[tid] += 1;
                } else {
                    execution.block_thread(tid).unwrap();
                    blocked[tid] = true;
                    join_waiters.entry(target).or_default().push(tid);
                }
            }
            Op::Yield => {
                execution.yield_thread(tid).unwrap();
                yielded[tid] = true;
                pc[tid] += 1;
            }
        }
    }

    Run {
        trace: execution.schedule_trace().to_vec(),
        preemptions,
        termination: execution.termination(),
        races: execution.races().len(),
    }
}

/// Explore every schedule of the scripted threads and aggregate the results.
pub fn explore(builder: &Builder, scripts: &[&[Op]]) -> Outcome {
    assert_eq!(builder.num_threads, scripts.len());

    let mut engine = builder.build().unwrap();

    let mut outcome = Outcome {
        executions: 0,
        traces: Vec::new(),
        deadlocks: 0,
        branch_limited: 0,
        races: 0,
        preemptions: Vec::new(),
        complete: true,
    };

    loop {
        let run = run_one(&mut engine, scripts);

        match run.termination {
            Some(Termination::Deadlock) => outcome.deadlocks += 1,
            Some(Termination::BranchLimit) => outcome.branch_limited += 1,
            _ => {}
        }

        outcome.races += run.races;
        outcome.preemptions.push(run.preemptions);
        outcome.traces.push(run.trace);

        if !engine.next_execution() {
            break;
        }
    }

    outcome.executions = engine.executions_completed();
    outcome.complete = engine.report().complete;
    outcome
}
