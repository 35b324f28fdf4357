//! Explicit keyed store with tick-based expiry

use std::hash::Hash;

use ahash::AHashMap;

use crate::core::types::Tick;

/// Map from key to (value, stamp) whose entries are only trusted for `ttl` ticks
///
/// Stale entries stay in the map until `prune` removes them, so a read past
/// the TTL simply misses and the caller recomputes.
#[derive(Debug, Clone)]
pub struct TtlCache<K, V> {
    ttl: Tick,
    entries: AHashMap<K, (V, Tick)>,
}

impl<K: Eq + Hash, V> TtlCache<K, V> {
    pub fn new(ttl: Tick) -> Self {
        Self {
            ttl,
            entries: AHashMap::new(),
        }
    }

    /// Fresh value for `key`, if one was stored less than `ttl` ticks ago
    pub fn get(&self, key: &K, now: Tick) -> Option<&V> {
        self.entries
            .get(key)
            .filter(|(_, stamp)| now.saturating_sub(*stamp) < self.ttl)
            .map(|(value, _)| value)
    }

    pub fn insert(&mut self, key: K, value: V, now: Tick) {
        self.entries.insert(key, (value, now));
    }

    /// Drop entries older than `max_age`; returns how many were removed
    pub fn prune(&mut self, now: Tick, max_age: Tick) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, (_, stamp)| now.saturating_sub(*stamp) <= max_age);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_expires_after_ttl() {
        let mut cache: TtlCache<u32, &str> = TtlCache::new(4);
        cache.insert(1, "near", 100);
        assert_eq!(cache.get(&1, 100), Some(&"near"));
        assert_eq!(cache.get(&1, 103), Some(&"near"));
        assert_eq!(cache.get(&1, 104), None);
    }

    #[test]
    fn test_reinsert_refreshes_stamp() {
        let mut cache: TtlCache<u32, bool> = TtlCache::new(10);
        cache.insert(7, false, 0);
        cache.insert(7, true, 8);
        assert_eq!(cache.get(&7, 15), Some(&true));
    }

    #[test]
    fn test_prune_removes_only_old_entries() {
        let mut cache: TtlCache<u32, u32> = TtlCache::new(4);
        cache.insert(1, 1, 0);
        cache.insert(2, 2, 1000);
        let removed = cache.prune(1300, 1200);
        assert_eq!(removed, 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&2, 1002), Some(&2));
    }
}
