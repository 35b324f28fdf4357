//! Per-region update accounting
//!
//! Two counters with different lifetimes: the per-tick update count that the
//! tick loop wipes every tick, and the activity score whose increments each
//! expire on their own after a fixed window.

use ahash::AHashMap;

use crate::core::scheduler::DeferredQueue;
use crate::core::types::Tick;
use crate::spatial::RegionKey;

/// Accepted updates per region within the current tick
#[derive(Debug, Clone)]
pub struct UpdateLimiter {
    cap: u32,
    counts: AHashMap<RegionKey, u32>,
}

impl UpdateLimiter {
    pub fn new(cap: u32) -> Self {
        Self {
            cap,
            counts: AHashMap::new(),
        }
    }

    pub fn cap(&self) -> u32 {
        self.cap
    }

    pub fn count(&self, region: &RegionKey) -> u32 {
        self.counts.get(region).copied().unwrap_or(0)
    }

    pub fn is_saturated(&self, region: &RegionKey) -> bool {
        self.count(region) >= self.cap
    }

    /// Count one accepted update; returns the new count
    pub fn record(&mut self, region: &RegionKey) -> u32 {
        let count = self.counts.entry(region.clone()).or_insert(0);
        *count += 1;
        *count
    }

    /// Start a new tick window
    pub fn reset(&mut self) {
        self.counts.clear();
    }
}

/// Decaying per-region activity score
///
/// Every increment schedules its own decrement `window` ticks later. A
/// decrement that lands on a missing entry is dropped, so clearing a region
/// never drives it negative.
#[derive(Debug, Clone)]
pub struct ActivityCounter {
    window: Tick,
    counts: AHashMap<RegionKey, u32>,
    decrements: DeferredQueue<RegionKey>,
}

impl ActivityCounter {
    pub fn new(window: Tick) -> Self {
        Self {
            window,
            counts: AHashMap::new(),
            decrements: DeferredQueue::new(),
        }
    }

    pub fn get(&self, region: &RegionKey) -> u32 {
        self.counts.get(region).copied().unwrap_or(0)
    }

    pub fn increment(&mut self, region: &RegionKey, now: Tick) -> u32 {
        let count = self.counts.entry(region.clone()).or_insert(0);
        *count += 1;
        let value = *count;
        self.decrements.schedule(now + self.window, region.clone());
        value
    }

    /// Apply decrements due at `now`
    pub fn expire(&mut self, now: Tick) {
        for region in self.decrements.take_due(now) {
            if let Some(count) = self.counts.get_mut(&region) {
                if *count > 1 {
                    *count -= 1;
                } else {
                    self.counts.remove(&region);
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.counts.clear();
        self.decrements.clear();
    }

    pub fn tracked_regions(&self) -> usize {
        self.counts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region() -> RegionKey {
        RegionKey::new("world", 0, 0)
    }

    #[test]
    fn test_limiter_saturates_at_cap() {
        let mut limiter = UpdateLimiter::new(3);
        let key = region();
        for expected in 1..=3 {
            assert!(!limiter.is_saturated(&key));
            assert_eq!(limiter.record(&key), expected);
        }
        assert!(limiter.is_saturated(&key));

        limiter.reset();
        assert_eq!(limiter.count(&key), 0);
    }

    #[test]
    fn test_limiter_regions_are_independent() {
        let mut limiter = UpdateLimiter::new(1);
        limiter.record(&region());
        assert!(!limiter.is_saturated(&RegionKey::new("world", 1, 0)));
    }

    #[test]
    fn test_activity_decays_after_window() {
        let mut activity = ActivityCounter::new(200);
        let key = region();
        activity.increment(&key, 0);
        activity.increment(&key, 10);
        assert_eq!(activity.get(&key), 2);

        activity.expire(199);
        assert_eq!(activity.get(&key), 2);
        activity.expire(200);
        assert_eq!(activity.get(&key), 1);
        activity.expire(210);
        assert_eq!(activity.get(&key), 0);
        assert_eq!(activity.tracked_regions(), 0);
    }

    #[test]
    fn test_clear_drops_pending_decrements() {
        let mut activity = ActivityCounter::new(200);
        let key = region();
        activity.increment(&key, 0);
        activity.clear();
        activity.increment(&key, 100);
        activity.expire(200);
        assert_eq!(activity.get(&key), 1);
    }
}
