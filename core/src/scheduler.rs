//! Port through which the session controller reads time and schedules work.

use std::time::Duration;

use crate::{Timestamp, TokenId};

/// Unit of deferred work owned by the session controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Task {
    /// Recompute the remaining session time.
    ClockCheck,
    /// Attempt to spawn a token and reschedule the next attempt.
    SpawnAttempt,
    /// Remove a token whose time-to-live elapsed.
    ExpireToken(TokenId),
}

/// Handle identifying a scheduled task so it can be cancelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    /// Creates a timer handle with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }
}

/// Clock and timer capability supplied to the session controller.
///
/// Implementations release tasks strictly in due order; tasks sharing a due
/// instant are released in the order they were scheduled.
pub trait Scheduler {
    /// Current instant.
    fn now(&self) -> Timestamp;

    /// Schedules `task` to become due `delay` after [`Scheduler::now`].
    fn schedule(&mut self, delay: Duration, task: Task) -> TimerId;

    /// Cancels a pending task. Cancelling an unknown or already released timer is a no-op.
    fn cancel(&mut self, timer: TimerId);

    /// Releases the earliest task due at or before the current instant, if any.
    fn pop_due(&mut self) -> Option<(TimerId, Task)>;

    /// Number of tasks still pending.
    fn pending(&self) -> usize;
}
