#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Scheduler implementations backing the Flower Rush session controller.
//!
//! [`VirtualScheduler`] only moves when told to, which makes whole sessions
//! replayable in tests. [`SystemScheduler`] follows the monotonic wall clock.

use std::{
    collections::{BTreeMap, HashMap},
    time::{Duration, Instant},
};

use flower_rush_core::{Scheduler, Task, TimerId, Timestamp};

/// Ordered set of pending tasks keyed by due instant.
#[derive(Debug, Default)]
pub struct TimerQueue {
    next_id: u64,
    entries: BTreeMap<(Timestamp, TimerId), Task>,
    due_by_timer: HashMap<TimerId, Timestamp>,
}

impl TimerQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a task due at `due` and returns its handle.
    pub fn insert(&mut self, due: Timestamp, task: Task) -> TimerId {
        let timer = TimerId::new(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        let _ = self.entries.insert((due, timer), task);
        let _ = self.due_by_timer.insert(timer, due);
        timer
    }

    /// Drops a pending task. Unknown handles are ignored.
    pub fn remove(&mut self, timer: TimerId) {
        if let Some(due) = self.due_by_timer.remove(&timer) {
            let _ = self.entries.remove(&(due, timer));
        }
    }

    /// Due instant of the earliest pending task.
    #[must_use]
    pub fn next_due(&self) -> Option<Timestamp> {
        self.entries.keys().next().map(|(due, _)| *due)
    }

    /// Removes and returns the earliest task due at or before `now`.
    pub fn pop_due(&mut self, now: Timestamp) -> Option<(TimerId, Task)> {
        let (due, timer) = *self.entries.keys().next()?;
        if due > now {
            return None;
        }
        let task = self.entries.remove(&(due, timer))?;
        let _ = self.due_by_timer.remove(&timer);
        Some((timer, task))
    }

    /// Number of pending tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether no task is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Manually driven scheduler used by tests and headless sessions.
///
/// [`VirtualScheduler::advance`] only moves a horizon. Each call to
/// [`Scheduler::pop_due`] then steps the clock to the due instant of the task
/// it releases, so advancing five seconds at once fires every task at the
/// same instant it would have fired at under many small steps. Once nothing
/// is due the clock settles on the horizon.
#[derive(Debug, Default)]
pub struct VirtualScheduler {
    now: Timestamp,
    horizon: Timestamp,
    queue: TimerQueue,
}

impl VirtualScheduler {
    /// Creates a scheduler positioned at the clock origin.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Extends the horizon tasks may be released up to.
    pub fn advance(&mut self, dt: Duration) {
        self.horizon = self.horizon.saturating_add(dt);
    }
}

impl Scheduler for VirtualScheduler {
    fn now(&self) -> Timestamp {
        self.now
    }

    fn schedule(&mut self, delay: Duration, task: Task) -> TimerId {
        self.queue.insert(self.now.saturating_add(delay), task)
    }

    fn cancel(&mut self, timer: TimerId) {
        self.queue.remove(timer);
    }

    fn pop_due(&mut self) -> Option<(TimerId, Task)> {
        match self.queue.next_due() {
            Some(due) if due <= self.horizon => {
                self.now = self.now.max(due);
                self.queue.pop_due(self.now)
            }
            _ => {
                self.now = self.now.max(self.horizon);
                None
            }
        }
    }

    fn pending(&self) -> usize {
        self.queue.len()
    }
}

/// Scheduler that follows the monotonic wall clock.
#[derive(Debug)]
pub struct SystemScheduler {
    origin: Instant,
    queue: TimerQueue,
}

impl SystemScheduler {
    /// Creates a scheduler whose clock origin is the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            queue: TimerQueue::new(),
        }
    }

    /// Time left until the earliest pending task becomes due.
    #[must_use]
    pub fn until_next_due(&self) -> Option<Duration> {
        self.queue
            .next_due()
            .map(|due| due.saturating_duration_since(self.now()))
    }
}

impl Default for SystemScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for SystemScheduler {
    fn now(&self) -> Timestamp {
        let elapsed = self.origin.elapsed().as_millis();
        Timestamp::from_millis(u64::try_from(elapsed).unwrap_or(u64::MAX))
    }

    fn schedule(&mut self, delay: Duration, task: Task) -> TimerId {
        let due = self.now().saturating_add(delay);
        self.queue.insert(due, task)
    }

    fn cancel(&mut self, timer: TimerId) {
        self.queue.remove(timer);
    }

    fn pop_due(&mut self) -> Option<(TimerId, Task)> {
        let now = self.now();
        self.queue.pop_due(now)
    }

    fn pending(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flower_rush_core::TokenId;

    #[test]
    fn ties_release_in_scheduling_order() {
        let mut queue = TimerQueue::new();
        let due = Timestamp::from_millis(10);
        let first = queue.insert(due, Task::SpawnAttempt);
        let second = queue.insert(due, Task::ClockCheck);

        assert_eq!(queue.pop_due(due), Some((first, Task::SpawnAttempt)));
        assert_eq!(queue.pop_due(due), Some((second, Task::ClockCheck)));
        assert!(queue.is_empty());
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut queue = TimerQueue::new();
        let timer = queue.insert(Timestamp::from_millis(5), Task::ClockCheck);
        queue.remove(timer);
        queue.remove(timer);
        assert!(queue.is_empty());
        assert_eq!(queue.pop_due(Timestamp::from_millis(100)), None);
    }

    #[test]
    fn virtual_scheduler_steps_to_each_due_instant() {
        let mut scheduler = VirtualScheduler::new();
        let _ = scheduler.schedule(Duration::from_millis(300), Task::ClockCheck);
        let _ = scheduler.schedule(
            Duration::from_millis(100),
            Task::ExpireToken(TokenId::new(7)),
        );
        scheduler.advance(Duration::from_secs(1));

        assert_eq!(
            scheduler.pop_due().map(|(_, task)| task),
            Some(Task::ExpireToken(TokenId::new(7)))
        );
        assert_eq!(scheduler.now(), Timestamp::from_millis(100));

        let _ = scheduler.schedule(Duration::from_millis(50), Task::SpawnAttempt);
        assert_eq!(
            scheduler.pop_due().map(|(_, task)| task),
            Some(Task::SpawnAttempt)
        );
        assert_eq!(scheduler.now(), Timestamp::from_millis(150));

        assert_eq!(
            scheduler.pop_due().map(|(_, task)| task),
            Some(Task::ClockCheck)
        );
        assert_eq!(scheduler.pop_due(), None);
        assert_eq!(scheduler.now(), Timestamp::from_millis(1_000));
    }

    #[test]
    fn virtual_scheduler_holds_tasks_beyond_horizon() {
        let mut scheduler = VirtualScheduler::new();
        let _ = scheduler.schedule(Duration::from_secs(2), Task::ClockCheck);
        scheduler.advance(Duration::from_secs(1));

        assert_eq!(scheduler.pop_due(), None);
        assert_eq!(scheduler.pending(), 1);

        scheduler.advance(Duration::from_secs(1));
        assert_eq!(
            scheduler.pop_due().map(|(_, task)| task),
            Some(Task::ClockCheck)
        );
        assert_eq!(scheduler.now(), Timestamp::from_millis(2_000));
    }

    #[test]
    fn cancelled_task_never_fires() {
        let mut scheduler = VirtualScheduler::new();
        let timer = scheduler.schedule(Duration::from_millis(10), Task::SpawnAttempt);
        scheduler.cancel(timer);
        scheduler.cancel(timer);
        scheduler.advance(Duration::from_secs(1));
        assert_eq!(scheduler.pop_due(), None);
    }

    #[test]
    fn system_clock_never_runs_backwards() {
        let scheduler = SystemScheduler::new();
        let mut previous = scheduler.now();
        for _ in 0..1_000 {
            let now = scheduler.now();
            assert!(now >= previous);
            previous = now;
        }
    }

    #[test]
    fn system_scheduler_holds_future_tasks() {
        let mut scheduler = SystemScheduler::new();
        let _ = scheduler.schedule(Duration::from_secs(3_600), Task::ClockCheck);

        assert_eq!(scheduler.pop_due(), None);
        assert_eq!(scheduler.pending(), 1);
        let wait = scheduler.until_next_due().expect("one task pending");
        assert!(wait > Duration::from_secs(3_500) && wait <= Duration::from_secs(3_600));
    }

    #[test]
    fn system_scheduler_releases_zero_delay_task_immediately() {
        let mut scheduler = SystemScheduler::new();
        let timer = scheduler.schedule(Duration::ZERO, Task::SpawnAttempt);

        assert_eq!(scheduler.until_next_due(), Some(Duration::ZERO));
        assert_eq!(scheduler.pop_due(), Some((timer, Task::SpawnAttempt)));
        assert_eq!(scheduler.pop_due(), None);
        assert_eq!(scheduler.until_next_due(), None);
    }

    #[test]
    fn system_scheduler_cancel_is_idempotent() {
        let mut scheduler = SystemScheduler::new();
        let timer = scheduler.schedule(Duration::ZERO, Task::ClockCheck);
        let kept = scheduler.schedule(Duration::ZERO, Task::SpawnAttempt);

        scheduler.cancel(timer);
        scheduler.cancel(timer);

        assert_eq!(scheduler.pending(), 1);
        assert_eq!(scheduler.pop_due(), Some((kept, Task::SpawnAttempt)));
        assert_eq!(scheduler.pop_due(), None);
    }
}
