//! Region cooldowns, lag-machine markers, protection and alert throttling

use ahash::{AHashMap, AHashSet};

use crate::core::types::Tick;
use crate::spatial::RegionKey;

/// Where a region sits in the cooldown state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionPhase {
    Normal,
    Cooldown { until: Tick },
    Protected,
}

#[derive(Debug, Clone)]
pub struct CooldownStore {
    duration: Tick,
    until: AHashMap<RegionKey, Tick>,
    lag_machines: AHashSet<RegionKey>,
    protected: AHashSet<RegionKey>,
    last_notified: AHashMap<RegionKey, Tick>,
}

impl CooldownStore {
    pub fn new(duration: Tick) -> Self {
        Self {
            duration,
            until: AHashMap::new(),
            lag_machines: AHashSet::new(),
            protected: AHashSet::new(),
            last_notified: AHashMap::new(),
        }
    }

    /// Put `region` and its 8 neighbors into cooldown with one shared expiry
    ///
    /// Regions already cooling are refreshed to the new expiry, never stacked.
    pub fn enter(&mut self, region: &RegionKey, now: Tick) -> Tick {
        let expiry = now + self.duration;
        for cell in region.neighborhood() {
            self.until.insert(cell.clone(), expiry);
            self.lag_machines.insert(cell);
        }
        expiry
    }

    pub fn is_cooling(&self, region: &RegionKey, now: Tick) -> bool {
        self.until.get(region).is_some_and(|&until| now < until)
    }

    pub fn cooldown_until(&self, region: &RegionKey) -> Option<Tick> {
        self.until.get(region).copied()
    }

    /// Regions whose cooldown has run out, in key order
    pub fn elapsed(&self, now: Tick) -> Vec<RegionKey> {
        let mut regions: Vec<RegionKey> = self
            .until
            .iter()
            .filter(|(_, &until)| now >= until)
            .map(|(region, _)| region.clone())
            .collect();
        regions.sort();
        regions
    }

    /// Repeat offender: restart this region's cooldown for a full duration
    pub fn extend(&mut self, region: &RegionKey, now: Tick) -> Tick {
        let expiry = now + self.duration;
        self.until.insert(region.clone(), expiry);
        expiry
    }

    /// Return a region to normal
    pub fn release(&mut self, region: &RegionKey) {
        self.until.remove(region);
        self.lag_machines.remove(region);
        self.last_notified.remove(region);
    }

    pub fn is_lag_machine(&self, region: &RegionKey) -> bool {
        self.lag_machines.contains(region)
    }

    pub fn lag_machine_count(&self) -> usize {
        self.lag_machines.len()
    }

    pub fn cooling_count(&self) -> usize {
        self.until.len()
    }

    pub fn set_protected(&mut self, region: &RegionKey, protected: bool) {
        if protected {
            self.protected.insert(region.clone());
        } else {
            self.protected.remove(region);
        }
    }

    pub fn is_protected(&self, region: &RegionKey) -> bool {
        self.protected.contains(region)
    }

    pub fn clear_protection(&mut self) {
        self.protected.clear();
    }

    pub fn phase(&self, region: &RegionKey, now: Tick) -> RegionPhase {
        if self.is_protected(region) {
            RegionPhase::Protected
        } else {
            match self.until.get(region) {
                Some(&until) if now < until => RegionPhase::Cooldown { until },
                _ => RegionPhase::Normal,
            }
        }
    }

    /// Reserve the alert slot for a region's 3x3 neighborhood
    ///
    /// Fails if any of the nine cells was notified within `window` ticks;
    /// otherwise stamps all nine with `now`.
    pub fn claim_notification(&mut self, region: &RegionKey, now: Tick, window: Tick) -> bool {
        let throttled = region.neighborhood().any(|cell| {
            self.last_notified
                .get(&cell)
                .is_some_and(|&at| now.saturating_sub(at) < window)
        });
        if throttled {
            return false;
        }
        for cell in region.neighborhood() {
            self.last_notified.insert(cell, now);
        }
        true
    }

    /// Drop cooldowns and markers; protection and alert stamps survive
    pub fn clear_cooldowns(&mut self) {
        self.until.clear();
        self.lag_machines.clear();
    }

    /// Drop cooldowns, markers and alert stamps; protection survives
    pub fn clear_detections(&mut self) {
        self.clear_cooldowns();
        self.last_notified.clear();
    }

    /// Drop everything, returning every region to normal
    pub fn clear_all(&mut self) {
        self.until.clear();
        self.lag_machines.clear();
        self.protected.clear();
        self.last_notified.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_covers_neighborhood_with_same_expiry() {
        let mut store = CooldownStore::new(600);
        let center = RegionKey::new("world", 3, 3);
        let expiry = store.enter(&center, 100);
        assert_eq!(expiry, 700);

        for cell in center.neighborhood() {
            assert_eq!(store.cooldown_until(&cell), Some(700));
            assert!(store.is_lag_machine(&cell));
        }
        assert_eq!(store.cooldown_until(&center.offset(2, 0)), None);
    }

    #[test]
    fn test_fresh_detection_refreshes_instead_of_stacking() {
        let mut store = CooldownStore::new(600);
        let center = RegionKey::new("world", 0, 0);
        store.enter(&center, 0);
        store.enter(&center, 300);
        assert_eq!(store.cooldown_until(&center), Some(900));
    }

    #[test]
    fn test_phase_transitions() {
        let mut store = CooldownStore::new(600);
        let key = RegionKey::new("world", 0, 0);
        assert_eq!(store.phase(&key, 0), RegionPhase::Normal);

        store.enter(&key, 0);
        assert_eq!(store.phase(&key, 10), RegionPhase::Cooldown { until: 600 });
        assert_eq!(store.phase(&key, 600), RegionPhase::Normal);
        assert_eq!(store.elapsed(600).len(), 9);

        store.set_protected(&key, true);
        assert_eq!(store.phase(&key, 10), RegionPhase::Protected);

        store.release(&key);
        store.set_protected(&key, false);
        assert!(!store.is_lag_machine(&key));
        assert_eq!(store.phase(&key, 10), RegionPhase::Normal);
    }

    #[test]
    fn test_notification_throttled_across_neighbors() {
        let mut store = CooldownStore::new(600);
        let a = RegionKey::new("world", 0, 0);
        let b = RegionKey::new("world", 1, 1);
        let far = RegionKey::new("world", 5, 5);

        assert!(store.claim_notification(&a, 0, 6000));
        assert!(!store.claim_notification(&b, 100, 6000));
        assert!(store.claim_notification(&far, 100, 6000));
        assert!(store.claim_notification(&b, 6000, 6000));
    }

    #[test]
    fn test_clear_cooldowns_keeps_protection() {
        let mut store = CooldownStore::new(600);
        let key = RegionKey::new("world", 0, 0);
        store.enter(&key, 0);
        store.set_protected(&key, true);
        store.clear_cooldowns();
        assert_eq!(store.cooling_count(), 0);
        assert_eq!(store.lag_machine_count(), 0);
        assert!(store.is_protected(&key));

        store.clear_all();
        assert!(!store.is_protected(&key));
    }

    #[test]
    fn test_clear_detections_forgets_alert_stamps() {
        let mut store = CooldownStore::new(600);
        let key = RegionKey::new("world", 0, 0);
        store.enter(&key, 0);
        assert!(store.claim_notification(&key, 0, 6000));
        store.set_protected(&key.offset(4, 4), true);

        store.clear_detections();
        assert_eq!(store.cooling_count(), 0);
        assert!(!store.is_lag_machine(&key));
        assert!(store.claim_notification(&key, 10, 6000));
        assert!(store.is_protected(&key.offset(4, 4)));
    }
}
