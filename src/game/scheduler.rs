//! Cancelable timers driven by simulation time.
//!
//! The room advances the scheduler once per tick, so timers never fire
//! between ticks and never outlive a `cancel_all`. Each timer records the
//! epoch it was armed in; bumping the epoch invalidates everything older.
//! Timers are never cancelled one at a time, so there are no handles.

use std::time::Duration;

#[derive(Debug, Clone)]
struct Timer<T> {
    seq: u64,
    due: Duration,
    repeat: Option<Duration>,
    epoch: u64,
    task: T,
}

/// Simulation-time timer wheel
#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    now: Duration,
    epoch: u64,
    next_seq: u64,
    timers: Vec<Timer<T>>,
}

impl<T: Clone> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            epoch: 0,
            next_seq: 0,
            timers: Vec::new(),
        }
    }

    /// Fire `task` once, `delay` from now
    pub fn schedule(&mut self, delay: Duration, task: T) {
        self.push(delay, None, task);
    }

    /// Fire `task` every `interval`, first time one interval from now
    pub fn schedule_repeating(&mut self, interval: Duration, task: T) {
        // zero interval would never leave the firing loop
        let interval = interval.max(Duration::from_millis(1));
        self.push(interval, Some(interval), task);
    }

    fn push(&mut self, delay: Duration, repeat: Option<Duration>, task: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.timers.push(Timer {
            seq,
            due: self.now + delay,
            repeat,
            epoch: self.epoch,
            task,
        });
    }

    /// Invalidate every pending timer
    pub fn cancel_all(&mut self) {
        self.epoch += 1;
        self.timers.clear();
    }

    /// Number of timers still armed
    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    /// Move simulation time forward and return due tasks in firing order
    pub fn advance(&mut self, dt: Duration) -> Vec<T> {
        self.now += dt;

        let mut fired: Vec<(Duration, u64, T)> = Vec::new();
        let now = self.now;
        let epoch = self.epoch;

        self.timers.retain_mut(|timer| {
            if timer.epoch != epoch {
                return false;
            }
            while timer.due <= now {
                fired.push((timer.due, timer.seq, timer.task.clone()));
                match timer.repeat {
                    Some(interval) => timer.due += interval,
                    None => return false,
                }
            }
            true
        });

        fired.sort_by_key(|(due, seq, _)| (*due, *seq));
        fired.into_iter().map(|(_, _, task)| task).collect()
    }
}

impl<T: Clone> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}
