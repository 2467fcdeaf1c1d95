//! Cooperative task scheduler.
//!
//! Tasks are stateful routines stepped until they voluntarily suspend. Each
//! step yields one of the [`Step`] signals; there is no preemption and no
//! priority, only activation order. Stopping a task is silent removal — no
//! unwind path runs inside the routine, so anything holding external
//! resources should hold them from a component's `initialize`/`remove` pair
//! rather than inline in a task body.

use std::collections::BTreeMap;
use std::time::Duration;

use log::trace;

use crate::api::types::TaskId;
use crate::core::timer::{Clock, TimerFuture};
use crate::core::world::World;

/// What a routine does with the rest of the tick.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    /// Suspend; resume on the next tick.
    Frame,
    /// Suspend; resume on the first tick where the timer has settled.
    Wait(TimerFuture),
    /// Keep going synchronously without ceding control.
    Continue,
    /// Finished; the scheduler drops the task.
    Done,
}

/// A cooperative routine: stepped with mutable access to the world and to
/// task control, returns how to proceed.
pub trait Routine {
    fn step(&mut self, world: &mut World, tasks: &mut TaskQueue) -> Step;
}

impl<F> Routine for F
where
    F: FnMut(&mut World, &mut TaskQueue) -> Step,
{
    fn step(&mut self, world: &mut World, tasks: &mut TaskQueue) -> Step {
        self(world, tasks)
    }
}

/// Task control available while the scheduler itself is busy.
///
/// Implemented by [`Scheduler`] (applies directly) and [`TaskQueue`] (applies
/// when the current step finishes). Both run a new routine's first steps
/// synchronously, so `start` behaves the same from either side.
pub trait TaskHost {
    fn start_boxed(&mut self, world: &mut World, routine: Box<dyn Routine>) -> TaskId;
    fn stop(&mut self, task: TaskId);
    fn timer(&self, duration: Duration) -> TimerFuture;
}

enum TaskState {
    Runnable,
    Waiting(TimerFuture),
}

impl TaskState {
    fn due(&self, now: f64) -> bool {
        match self {
            TaskState::Runnable => true,
            TaskState::Waiting(timer) => timer.settled(now),
        }
    }
}

struct Task {
    routine: Box<dyn Routine>,
    state: TaskState,
}

/// Steps `routine` until it suspends. `None` means it ran to completion.
fn run_to_suspension(
    routine: &mut dyn Routine,
    world: &mut World,
    queue: &mut TaskQueue,
) -> Option<TaskState> {
    loop {
        match routine.step(world, queue) {
            Step::Continue => continue,
            Step::Frame => return Some(TaskState::Runnable),
            Step::Wait(timer) => return Some(TaskState::Waiting(timer)),
            Step::Done => return None,
        }
    }
}

/// Buffered task control handed to running routines.
///
/// The scheduler cannot be re-entered while it iterates its own task set, so
/// starts and stops land here first and are applied after the current step.
/// A routine started through the queue still runs its first steps
/// synchronously; only its insertion into the active set is deferred, which
/// keeps it out of the current tick's resumption pass.
#[derive(Default)]
pub struct TaskQueue {
    next_id: u64,
    now: f64,
    dt: f32,
    frame: u64,
    pending: Vec<(u64, Task)>,
    stops: Vec<u64>,
}

impl TaskQueue {
    /// Start a routine and run it to its first suspension point.
    pub fn start(&mut self, world: &mut World, routine: impl Routine + 'static) -> TaskId {
        TaskHost::start_boxed(self, world, Box::new(routine))
    }

    /// Request removal of a task; applied once the current step finishes.
    pub fn stop(&mut self, task: TaskId) {
        TaskHost::stop(self, task);
    }

    /// A timer measured from the current tick's clock reading.
    pub fn timer(&self, duration: Duration) -> TimerFuture {
        TaskHost::timer(self, duration)
    }

    /// Time of the current tick, in clock seconds.
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Delta of the current tick, in seconds.
    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// Index of the current tick.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    fn sync(&mut self, clock: &Clock, dt: f32) {
        self.now = clock.now();
        self.dt = dt;
        self.frame = clock.frame();
    }

    fn alloc(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn cancelled(&self, key: u64) -> bool {
        self.stops.contains(&key)
    }
}

impl TaskHost for TaskQueue {
    fn start_boxed(&mut self, world: &mut World, mut routine: Box<dyn Routine>) -> TaskId {
        let key = self.alloc();
        trace!("task {key} started");
        match run_to_suspension(routine.as_mut(), world, self) {
            Some(state) => self.pending.push((key, Task { routine, state })),
            None => trace!("task {key} completed at start"),
        }
        TaskId(key)
    }

    fn stop(&mut self, task: TaskId) {
        self.stops.push(task.0);
    }

    fn timer(&self, duration: Duration) -> TimerFuture {
        TimerFuture::after(self.now, duration)
    }
}

/// Owns the active task set and advances it once per tick.
///
/// Explicit injected state: construct one, keep it next to your [`World`],
/// and tick it from the host loop. Nothing here is scene-scoped — a task
/// outlives the scene that started it unless something stops it.
#[derive(Default)]
pub struct Scheduler {
    clock: Clock,
    tasks: BTreeMap<u64, Task>,
    queue: TaskQueue,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a routine, running it synchronously up to its first suspension.
    ///
    /// Chains of [`Step::Continue`] do not cede control; the routine keeps
    /// stepping until it yields a frame, a timer, or finishes. A routine that
    /// finishes immediately gets a handle that is already inactive.
    pub fn start(&mut self, world: &mut World, routine: impl Routine + 'static) -> TaskId {
        TaskHost::start_boxed(self, world, Box::new(routine))
    }

    /// Drop a task from the active set. No cleanup runs inside the routine;
    /// stopping an inactive handle is a no-op.
    pub fn stop(&mut self, task: TaskId) -> bool {
        let stopped = self.tasks.remove(&task.0).is_some();
        if stopped {
            trace!("task {} stopped", task.0);
        }
        stopped
    }

    pub fn is_active(&self, task: TaskId) -> bool {
        self.tasks.contains_key(&task.0)
    }

    /// Number of suspended tasks awaiting resumption.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// A timer measured from the current clock reading.
    pub fn timer(&self, duration: Duration) -> TimerFuture {
        TimerFuture::after(self.clock.now(), duration)
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Advance the clock and resume every task that was due at tick start, in
    /// activation order.
    ///
    /// Frame-suspended tasks are always due; timer-suspended tasks are due
    /// once their deadline has passed, with no extra frame of delay. Tasks
    /// started during the tick run their first steps at start time but are
    /// not resumed again until the next tick; tasks stopped earlier in the
    /// tick are skipped.
    pub fn tick(&mut self, dt: f32, world: &mut World) {
        self.clock.advance(dt);
        self.queue.sync(&self.clock, dt);
        let now = self.clock.now();

        let due: Vec<u64> = self
            .tasks
            .iter()
            .filter(|(_, task)| task.state.due(now))
            .map(|(&key, _)| key)
            .collect();

        for key in due {
            // May have been stopped by an earlier task this tick.
            let Some(mut task) = self.tasks.remove(&key) else {
                continue;
            };
            match run_to_suspension(task.routine.as_mut(), world, &mut self.queue) {
                Some(state) if !self.queue.cancelled(key) => {
                    task.state = state;
                    self.tasks.insert(key, task);
                }
                Some(_) => trace!("task {key} stopped itself"),
                None => trace!("task {key} completed"),
            }
            self.flush();
        }
        self.flush();
    }

    /// Apply starts and stops buffered by the queue.
    fn flush(&mut self) {
        for (key, task) in self.queue.pending.drain(..) {
            self.tasks.insert(key, task);
        }
        for key in self.queue.stops.drain(..) {
            self.tasks.remove(&key);
        }
    }
}

impl TaskHost for Scheduler {
    fn start_boxed(&mut self, world: &mut World, routine: Box<dyn Routine>) -> TaskId {
        self.queue.now = self.clock.now();
        self.queue.frame = self.clock.frame();
        let id = TaskHost::start_boxed(&mut self.queue, world, routine);
        self.flush();
        id
    }

    fn stop(&mut self, task: TaskId) {
        Scheduler::stop(self, task);
    }

    fn timer(&self, duration: Duration) -> TimerFuture {
        Scheduler::timer(self, duration)
    }
}
