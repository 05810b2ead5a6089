//! Timers for the scan loop.
//!
//! The controller never sleeps or spawns timer threads itself; it asks a
//! [`Scheduler`] for deadlines and is fed due tasks back. Tests drive a
//! [`ManualScheduler`] by advancing its clock.

use std::time::{Duration, Instant};

/// Work a timer fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerTask {
    /// Start the next cycle
    Tick,
    /// Abandon `cycle` if it is still in flight
    Watchdog { cycle: u64 },
}

/// Identifies one scheduled timer for cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

pub trait Scheduler: Send {
    /// Time elapsed since the scheduler was created
    fn now(&self) -> Duration;

    fn schedule(&mut self, delay: Duration, task: TimerTask) -> TimerHandle;

    /// Returns whether the timer was still pending
    fn cancel(&mut self, handle: TimerHandle) -> bool;

    fn cancel_all(&mut self);

    /// Remove and return the earliest task whose deadline has passed
    fn pop_due(&mut self) -> Option<TimerTask>;

    /// Deadline of the earliest pending task
    fn next_deadline(&self) -> Option<Duration>;

    /// Wait until the next task is due, at most `limit`.
    ///
    /// Returns `false` when nothing is scheduled.
    fn wait_for_next(&mut self, limit: Duration) -> bool;

    fn pending(&self) -> usize;
}

#[derive(Debug, Clone, Copy)]
struct Timer {
    deadline: Duration,
    handle: TimerHandle,
    task: TimerTask,
}

/// Pending timers ordered by deadline, then by scheduling order
#[derive(Debug, Default)]
struct TimerQueue {
    timers: Vec<Timer>,
    next_handle: u64,
}

impl TimerQueue {
    fn push(&mut self, deadline: Duration, task: TimerTask) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        let at = self
            .timers
            .partition_point(|t| (t.deadline, t.handle.0) <= (deadline, handle.0));
        self.timers.insert(at, Timer { deadline, handle, task });
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.handle != handle);
        self.timers.len() != before
    }

    fn pop_due(&mut self, now: Duration) -> Option<TimerTask> {
        match self.timers.first() {
            Some(timer) if timer.deadline <= now => Some(self.timers.remove(0).task),
            _ => None,
        }
    }

    fn next_deadline(&self) -> Option<Duration> {
        self.timers.first().map(|t| t.deadline)
    }
}

/// Virtual clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualScheduler {
    clock: Duration,
    queue: TimerQueue,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, by: Duration) {
        self.clock += by;
    }

    /// Tasks currently pending, earliest first
    pub fn scheduled(&self) -> Vec<TimerTask> {
        self.queue.timers.iter().map(|t| t.task).collect()
    }
}

impl Scheduler for ManualScheduler {
    fn now(&self) -> Duration {
        self.clock
    }

    fn schedule(&mut self, delay: Duration, task: TimerTask) -> TimerHandle {
        self.queue.push(self.clock + delay, task)
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.queue.cancel(handle)
    }

    fn cancel_all(&mut self) {
        self.queue.timers.clear();
    }

    fn pop_due(&mut self) -> Option<TimerTask> {
        self.queue.pop_due(self.clock)
    }

    fn next_deadline(&self) -> Option<Duration> {
        self.queue.next_deadline()
    }

    /// Jumps the clock forward instead of sleeping
    fn wait_for_next(&mut self, limit: Duration) -> bool {
        let Some(deadline) = self.queue.next_deadline() else {
            return false;
        };
        let step = deadline.saturating_sub(self.clock).min(limit);
        self.clock += step;
        true
    }

    fn pending(&self) -> usize {
        self.queue.timers.len()
    }
}

/// Wall-clock scheduler; waiting sleeps the calling thread
#[derive(Debug)]
pub struct SystemScheduler {
    started: Instant,
    queue: TimerQueue,
}

impl SystemScheduler {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            queue: TimerQueue::default(),
        }
    }
}

impl Default for SystemScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for SystemScheduler {
    fn now(&self) -> Duration {
        self.started.elapsed()
    }

    fn schedule(&mut self, delay: Duration, task: TimerTask) -> TimerHandle {
        self.queue.push(self.now() + delay, task)
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.queue.cancel(handle)
    }

    fn cancel_all(&mut self) {
        self.queue.timers.clear();
    }

    fn pop_due(&mut self) -> Option<TimerTask> {
        let now = self.now();
        self.queue.pop_due(now)
    }

    fn next_deadline(&self) -> Option<Duration> {
        self.queue.next_deadline()
    }

    fn wait_for_next(&mut self, limit: Duration) -> bool {
        let Some(deadline) = self.queue.next_deadline() else {
            return false;
        };
        let wait = deadline.saturating_sub(self.now()).min(limit);
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
        true
    }

    fn pending(&self) -> usize {
        self.queue.timers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn tasks_fire_in_deadline_order() {
        let mut scheduler = ManualScheduler::new();
        scheduler.schedule(MS * 300, TimerTask::Watchdog { cycle: 1 });
        scheduler.schedule(MS * 100, TimerTask::Tick);

        assert_eq!(scheduler.pop_due(), None);
        scheduler.advance(MS * 150);
        assert_eq!(scheduler.pop_due(), Some(TimerTask::Tick));
        assert_eq!(scheduler.pop_due(), None);
        scheduler.advance(MS * 150);
        assert_eq!(scheduler.pop_due(), Some(TimerTask::Watchdog { cycle: 1 }));
    }

    #[test]
    fn equal_deadlines_keep_scheduling_order() {
        let mut scheduler = ManualScheduler::new();
        scheduler.schedule(MS * 10, TimerTask::Watchdog { cycle: 7 });
        scheduler.schedule(MS * 10, TimerTask::Tick);
        scheduler.advance(MS * 10);
        assert_eq!(scheduler.pop_due(), Some(TimerTask::Watchdog { cycle: 7 }));
        assert_eq!(scheduler.pop_due(), Some(TimerTask::Tick));
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let mut scheduler = ManualScheduler::new();
        let handle = scheduler.schedule(MS, TimerTask::Tick);
        assert!(scheduler.cancel(handle));
        assert!(!scheduler.cancel(handle));
        scheduler.advance(MS * 5);
        assert_eq!(scheduler.pop_due(), None);
    }

    #[test]
    fn manual_wait_jumps_to_deadline_within_limit() {
        let mut scheduler = ManualScheduler::new();
        assert!(!scheduler.wait_for_next(MS * 50));

        scheduler.schedule(MS * 400, TimerTask::Tick);
        assert!(scheduler.wait_for_next(MS * 100));
        assert_eq!(scheduler.now(), MS * 100);
        assert!(scheduler.wait_for_next(MS * 1000));
        assert_eq!(scheduler.now(), MS * 400);
        assert_eq!(scheduler.pop_due(), Some(TimerTask::Tick));
    }

    #[test]
    fn system_scheduler_fires_zero_delay_immediately() {
        let mut scheduler = SystemScheduler::new();
        scheduler.schedule(Duration::ZERO, TimerTask::Tick);
        assert_eq!(scheduler.pop_due(), Some(TimerTask::Tick));
        assert_eq!(scheduler.pending(), 0);
    }
}
