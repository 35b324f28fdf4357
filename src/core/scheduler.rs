//! Tick-relative scheduling
//!
//! Two pieces: a set of recurring timers with fixed periods, and a queue of
//! one-shot work keyed by the tick it becomes due. Both are drained from the
//! owning tick loop; nothing here runs on its own.

use std::collections::BTreeMap;

use crate::core::types::Tick;

#[derive(Debug, Clone)]
struct RecurringTimer<J> {
    job: J,
    period: Tick,
    next_due: Tick,
}

/// Fixed-period jobs, each due first on the tick it was registered
#[derive(Debug, Clone)]
pub struct RecurringTimers<J> {
    timers: Vec<RecurringTimer<J>>,
}

impl<J: Copy + PartialEq> RecurringTimers<J> {
    pub fn new() -> Self {
        Self { timers: Vec::new() }
    }

    /// Register (or re-register) `job` every `period` ticks starting at `now`
    pub fn every(&mut self, job: J, period: Tick, now: Tick) {
        self.cancel(job);
        self.timers.push(RecurringTimer {
            job,
            period: period.max(1),
            next_due: now,
        });
    }

    pub fn cancel(&mut self, job: J) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.job != job);
        before != self.timers.len()
    }

    pub fn cancel_all(&mut self) {
        self.timers.clear();
    }

    pub fn is_scheduled(&self, job: J) -> bool {
        self.timers.iter().any(|t| t.job == job)
    }

    /// Jobs due at `now`, in registration order; each is re-armed one period later
    pub fn due(&mut self, now: Tick) -> Vec<J> {
        let mut jobs = Vec::new();
        for timer in &mut self.timers {
            if timer.next_due <= now {
                jobs.push(timer.job);
                timer.next_due = now + timer.period;
            }
        }
        jobs
    }
}

impl<J: Copy + PartialEq> Default for RecurringTimers<J> {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot work ordered by due tick, FIFO within a tick
#[derive(Debug, Clone)]
pub struct DeferredQueue<T> {
    pending: BTreeMap<Tick, Vec<T>>,
}

impl<T> DeferredQueue<T> {
    pub fn new() -> Self {
        Self {
            pending: BTreeMap::new(),
        }
    }

    pub fn schedule(&mut self, at: Tick, task: T) {
        self.pending.entry(at).or_default().push(task);
    }

    /// Remove and return every task due at or before `now`
    pub fn take_due(&mut self, now: Tick) -> Vec<T> {
        let later = match now.checked_add(1) {
            Some(next) => self.pending.split_off(&next),
            None => BTreeMap::new(),
        };
        let due = std::mem::replace(&mut self.pending, later);
        due.into_values().flatten().collect()
    }

    pub fn len(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

impl<T> Default for DeferredQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
