//! A minimal in-memory [`Scheduler`] used only by this crate's own tests.
//!
//! Priorities are plain `i32`s (higher = more urgent, matching the scenario
//! numbering in `DESIGN.md`/`SPEC_FULL.md`); task identities are `u32`
//! handles into a `HashMap`. Real embedding kernels would back this with
//! their actual TCB array and ready queue instead.

#![allow(dead_code)]

use std::collections::HashMap;

use r3_pi_sem::{BoostLedger, Scheduler, SchedulerCore};

/// Wire up `env_logger` so `RUST_LOG=trace cargo test -- --nocapture` surfaces
/// this crate's `trace`-feature boost/restore decisions. Idempotent.
pub fn init() {
    let _ = env_logger::try_init();
}

pub struct TaskState<const N_NEST: usize> {
    pub base: i32,
    pub sched: i32,
    pub alive: bool,
    pub ledger: BoostLedger<MockSched<N_NEST>, N_NEST>,
}

pub struct MockSched<const N_NEST: usize> {
    tasks: HashMap<u32, TaskState<N_NEST>>,
    current: u32,
    pub interrupt: bool,
    next_id: u32,
    /// Every `set_priority` call, in order, as `(task, priority)` — recorded
    /// so tests can assert on ordering (e.g. the two-pass restore rule)
    /// rather than just final state.
    calls: Vec<(u32, i32)>,
}

impl<const N_NEST: usize> MockSched<N_NEST> {
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
            current: 0,
            interrupt: false,
            next_id: 1,
            calls: Vec::new(),
        }
    }

    /// The `set_priority` call log recorded so far, in call order.
    pub fn call_log(&self) -> &[(u32, i32)] {
        &self.calls
    }

    /// Register a new task at the given base priority, returning its handle.
    pub fn add_task(&mut self, base: i32) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.tasks.insert(
            id,
            TaskState {
                base,
                sched: base,
                alive: true,
                ledger: BoostLedger::new(),
            },
        );
        id
    }

    /// Mark a task as no longer existing, so `verify_tcb` starts failing it.
    pub fn kill(&mut self, task: u32) {
        if let Some(t) = self.tasks.get_mut(&task) {
            t.alive = false;
        }
    }

    pub fn set_current(&mut self, task: u32) {
        self.current = task;
    }

    pub fn ledger_len(&self, task: u32) -> usize {
        self.tasks[&task].ledger.len()
    }
}

impl<const N_NEST: usize> SchedulerCore for MockSched<N_NEST> {
    type TaskRef = u32;
    type Priority = i32;

    fn verify_tcb(&self, task: u32) -> bool {
        self.tasks.get(&task).map(|t| t.alive).unwrap_or(false)
    }

    fn base_priority(&self, task: u32) -> i32 {
        self.tasks[&task].base
    }

    fn sched_priority(&self, task: u32) -> i32 {
        self.tasks[&task].sched
    }

    fn set_priority(&mut self, task: u32, priority: i32) {
        self.calls.push((task, priority));
        if let Some(t) = self.tasks.get_mut(&task) {
            t.sched = priority;
        }
    }

    fn current_task(&self) -> u32 {
        self.current
    }

    fn in_interrupt_context(&self) -> bool {
        self.interrupt
    }
}

impl<const N_NEST: usize> Scheduler<N_NEST> for MockSched<N_NEST> {
    fn with_ledger<R>(
        &mut self,
        task: u32,
        f: impl FnOnce(&mut BoostLedger<Self, N_NEST>) -> R,
    ) -> R {
        let t = self.tasks.get_mut(&task).expect("unknown task");
        f(&mut t.ledger)
    }
}
