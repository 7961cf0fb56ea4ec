//! Delayed tasks for a single-threaded update loop.
//!
//! Tasks are plain values (the controller uses its own task enum) that
//! become due either after a number of update ticks or at a point in
//! monotonic time. Nothing runs by itself: the owner calls
//! [`Scheduler::tick`] once per update and executes whatever it returns.
//!
//! A task scheduled while due tasks are being executed never runs in the
//! same tick, so a task that reschedules itself cannot spin.

use std::{mem, time::Duration};

/// When a task becomes due.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Delay {
    /// After this many ticks. `0` and `1` both mean the next tick.
    Ticks(u32),
    /// After this much monotonic time, checked on the next tick at the
    /// earliest.
    Time(Duration),
}

/// Handle to a scheduled task.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

#[derive(Copy, Clone, Debug)]
enum Due {
    Tick(u64),
    At(Duration),
}

#[derive(Debug)]
struct Entry<T> {
    id: TaskId,
    due: Due,
    task: T,
}

#[derive(Debug)]
pub struct Scheduler<T> {
    next_id: u64,
    ticks: u64,
    pending: Vec<Entry<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            ticks: 0,
            pending: Vec::new(),
        }
    }
}

impl<T> Scheduler<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `task` to become due after `delay`, measured from `now`.
    pub fn schedule(&mut self, delay: Delay, now: Duration, task: T) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;

        let due = match delay {
            Delay::Ticks(ticks) => Due::Tick(self.ticks + u64::from(ticks.max(1))),
            Delay::Time(after) => Due::At(now + after),
        };

        self.pending.push(Entry { id, due, task });
        id
    }

    /// Cancels a pending task. Returns `false` if it already ran or was
    /// cancelled before.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|entry| entry.id != id);
        self.pending.len() != before
    }

    #[must_use]
    pub fn is_pending(&self, id: TaskId) -> bool {
        self.pending.iter().any(|entry| entry.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Iterates over the pending tasks in scheduling order.
    pub fn pending(&self) -> impl Iterator<Item = &T> {
        self.pending.iter().map(|entry| &entry.task)
    }

    /// Advances one tick and takes every task that is now due, in the order
    /// they were scheduled.
    pub fn tick(&mut self, now: Duration) -> Vec<(TaskId, T)> {
        self.ticks += 1;
        let ticks = self.ticks;

        let (due, pending): (Vec<_>, Vec<_>) =
            mem::take(&mut self.pending)
                .into_iter()
                .partition(|entry| match entry.due {
                    Due::Tick(tick) => tick <= ticks,
                    Due::At(at) => at <= now,
                });
        self.pending = pending;

        due.into_iter().map(|entry| (entry.id, entry.task)).collect()
    }
}
