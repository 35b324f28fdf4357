//! Clock-circuit detection by block adjacency
//!
//! A region holds a lag machine when two things are true at once:
//! - some active-logic element touches at least two monitored blocks in its
//!   horizontal plane, or a stand entity touches a monitored block (a loop,
//!   not a line)
//! - the region holds at least `min_components` monitored components
//!
//! Long idle wire runs fail the first test; tiny pulse loops fail the second.

use std::sync::Arc;

use ahash::AHashSet;

use crate::core::config::SCAN_CACHE_TTL;
use crate::core::error::HostError;
use crate::core::types::{BlockKind, BlockPos, Direction, Tick, MID_HEIGHT, SCAN_HALF_BAND};
use crate::spatial::{RegionKey, TtlCache};
use crate::world::WorldHost;

/// Block kinds the scanner counts as circuit components
pub type MonitoredSet = AHashSet<BlockKind>;

/// Outcome of one full-region scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanResult {
    pub has_complex_clock: bool,
    pub component_count: u32,
    pub scanned_at: Tick,
}

impl ScanResult {
    pub fn is_lag_machine(&self, min_components: u32) -> bool {
        self.has_complex_clock && self.component_count >= min_components
    }
}

/// Inclusive y range scanned in a world: the mid-height band clipped to
/// the world's build limits
pub fn scan_band<H: WorldHost + ?Sized>(host: &H, world: &str) -> Result<(i32, i32), HostError> {
    let (min_height, max_height) = host.height_bounds(world)?;
    Ok((
        min_height.max(MID_HEIGHT - SCAN_HALF_BAND),
        max_height.min(MID_HEIGHT + SCAN_HALF_BAND),
    ))
}

/// Neighbor lookups may cross into an unloaded region; those count as empty
#[inline]
fn is_monitored_at<H: WorldHost + ?Sized>(
    host: &H,
    world: &str,
    pos: BlockPos,
    monitored: &MonitoredSet,
) -> bool {
    host.block_at(world, pos)
        .map(|kind| monitored.contains(&kind))
        .unwrap_or(false)
}

fn monitored_neighbors<H: WorldHost + ?Sized>(
    host: &H,
    world: &str,
    pos: BlockPos,
    faces: &[Direction],
    monitored: &MonitoredSet,
) -> u32 {
    faces
        .iter()
        .filter(|&&face| is_monitored_at(host, world, pos.relative(face), monitored))
        .count() as u32
}

/// Scan every block and stand entity of a region
pub fn scan_region<H: WorldHost + ?Sized>(
    host: &H,
    region: &RegionKey,
    monitored: &MonitoredSet,
    now: Tick,
) -> Result<ScanResult, HostError> {
    let world = &*region.world;
    let (min_y, max_y) = scan_band(host, world)?;

    let mut component_count = 0u32;
    let mut has_complex_clock = false;

    for (x, z) in region.columns() {
        for y in min_y..=max_y {
            let pos = BlockPos::new(x, y, z);
            let kind = host.block_at(world, pos)?;
            if !monitored.contains(&kind) {
                continue;
            }
            component_count += 1;
            if kind.is_active_logic()
                && !has_complex_clock
                && monitored_neighbors(host, world, pos, &Direction::HORIZONTAL, monitored) >= 2
            {
                has_complex_clock = true;
            }
        }
    }

    for entity in host.entities_in(region)?.iter().filter(|e| e.is_stand()) {
        if monitored_neighbors(host, world, entity.pos, &Direction::ALL, monitored) > 0 {
            has_complex_clock = true;
            component_count += 1;
        }
    }

    Ok(ScanResult {
        has_complex_clock,
        component_count,
        scanned_at: now,
    })
}

/// Most connected element of a region, reported as the machine's location
///
/// Active-logic blocks score 5 plus 2 per monitored horizontal neighbor,
/// other monitored blocks score 0, stands score 3 plus 2 per monitored
/// neighbor on any face. Ties keep the first found; an empty region falls
/// back to its center block.
pub fn find_center<H: WorldHost + ?Sized>(
    host: &H,
    region: &RegionKey,
    monitored: &MonitoredSet,
) -> Result<BlockPos, HostError> {
    let world = &*region.world;
    let (min_y, max_y) = scan_band(host, world)?;

    let mut best: Option<(u32, BlockPos)> = None;
    let mut consider = |score: u32, pos: BlockPos| {
        if best.map_or(true, |(top, _)| score > top) {
            best = Some((score, pos));
        }
    };

    for (x, z) in region.columns() {
        for y in min_y..=max_y {
            let pos = BlockPos::new(x, y, z);
            let kind = host.block_at(world, pos)?;
            if !monitored.contains(&kind) {
                continue;
            }
            let score = if kind.is_active_logic() {
                5 + 2 * monitored_neighbors(host, world, pos, &Direction::HORIZONTAL, monitored)
            } else {
                0
            };
            consider(score, pos);
        }
    }

    for entity in host.entities_in(region)?.iter().filter(|e| e.is_stand()) {
        let score =
            3 + 2 * monitored_neighbors(host, world, entity.pos, &Direction::ALL, monitored);
        consider(score, entity.pos);
    }

    Ok(best.map_or_else(|| region.center_block(), |(_, pos)| pos))
}

/// Region scanner with a short-lived result cache
#[derive(Debug, Clone)]
pub struct ClockDetector {
    monitored: Arc<MonitoredSet>,
    min_components: u32,
    cache: TtlCache<RegionKey, ScanResult>,
    scans: u64,
}

impl ClockDetector {
    pub fn new(monitored: Arc<MonitoredSet>, min_components: u32) -> Self {
        Self {
            monitored,
            min_components,
            cache: TtlCache::new(SCAN_CACHE_TTL),
            scans: 0,
        }
    }

    pub fn monitored(&self) -> &Arc<MonitoredSet> {
        &self.monitored
    }

    pub fn min_components(&self) -> u32 {
        self.min_components
    }

    /// Cached-or-fresh clock verdict for a region
    ///
    /// A failed scan is logged and reads as "no clock"; it is not cached so
    /// the next call retries.
    pub fn detect<H: WorldHost + ?Sized>(
        &mut self,
        host: &H,
        region: &RegionKey,
        now: Tick,
    ) -> bool {
        match self.scan(host, region, now) {
            Ok(result) => result.is_lag_machine(self.min_components),
            Err(e) => {
                tracing::warn!("Pattern scan of {} failed: {}", region, e);
                false
            }
        }
    }

    /// Cached-or-fresh scan result
    pub fn scan<H: WorldHost + ?Sized>(
        &mut self,
        host: &H,
        region: &RegionKey,
        now: Tick,
    ) -> Result<ScanResult, HostError> {
        if let Some(cached) = self.cache.get(region, now) {
            return Ok(*cached);
        }
        let result = scan_region(host, region, &self.monitored, now)?;
        self.store(region.clone(), result);
        Ok(result)
    }

    /// Fresh cached result, if any
    pub fn cached(&self, region: &RegionKey, now: Tick) -> Option<ScanResult> {
        self.cache.get(region, now).copied()
    }

    /// Record a result computed elsewhere (scan workers)
    pub fn store(&mut self, region: RegionKey, result: ScanResult) {
        self.scans += 1;
        self.cache.insert(region, result, result.scanned_at);
    }

    pub fn prune(&mut self, now: Tick, max_age: Tick) -> usize {
        self.cache.prune(now, max_age)
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Full scans recorded so far
    pub fn scans_performed(&self) -> u64 {
        self.scans
    }

    pub fn cached_regions(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::MemoryWorld;

    fn monitored() -> MonitoredSet {
        [
            BlockKind::RedstoneWire,
            BlockKind::RedstoneTorch,
            BlockKind::Repeater,
            BlockKind::Comparator,
            BlockKind::Observer,
            BlockKind::Piston,
            BlockKind::StickyPiston,
        ]
        .into_iter()
        .collect()
    }

    fn region() -> RegionKey {
        RegionKey::new("world", 0, 0)
    }

    #[test]
    fn test_repeater_and_observer_pair_is_not_a_machine() {
        let world = MemoryWorld::new();
        world.place("world", BlockPos::new(4, 64, 4), BlockKind::Repeater);
        world.place("world", BlockPos::new(5, 64, 4), BlockKind::Observer);

        let result = scan_region(&world, &region(), &monitored(), 0).unwrap();
        assert_eq!(result.component_count, 2);
        assert!(!result.has_complex_clock);
        assert!(!result.is_lag_machine(10));
    }

    #[test]
    fn test_observer_with_two_monitored_neighbors_is_a_loop() {
        let world = MemoryWorld::new();
        world.place("world", BlockPos::new(4, 64, 4), BlockKind::Observer);
        world.place("world", BlockPos::new(3, 64, 4), BlockKind::RedstoneWire);
        world.place("world", BlockPos::new(5, 64, 4), BlockKind::RedstoneWire);

        let result = scan_region(&world, &region(), &monitored(), 0).unwrap();
        assert!(result.has_complex_clock);
        assert_eq!(result.component_count, 3);
        assert!(!result.is_lag_machine(10));
        assert!(result.is_lag_machine(3));
    }

    #[test]
    fn test_long_wire_run_has_no_loop() {
        let world = MemoryWorld::new();
        for x in 0..16 {
            world.place("world", BlockPos::new(x, 64, 8), BlockKind::RedstoneWire);
        }
        let result = scan_region(&world, &region(), &monitored(), 0).unwrap();
        assert_eq!(result.component_count, 16);
        assert!(!result.has_complex_clock);
    }

    #[test]
    fn test_blocks_outside_band_are_ignored() {
        let world = MemoryWorld::new();
        world.place("world", BlockPos::new(1, 200, 1), BlockKind::Observer);
        world.place("world", BlockPos::new(1, -10, 1), BlockKind::Observer);
        let result = scan_region(&world, &region(), &monitored(), 0).unwrap();
        assert_eq!(result.component_count, 0);
    }

    #[test]
    fn test_band_clipped_to_world_height() {
        let world = MemoryWorld::new();
        world.set_height_bounds("world", 10, 50);
        assert_eq!(scan_band(&world, "world").unwrap(), (10, 50));

        world.place("world", BlockPos::new(1, 5, 1), BlockKind::Observer);
        world.place("world", BlockPos::new(1, 40, 1), BlockKind::Observer);
        let result = scan_region(&world, &region(), &monitored(), 0).unwrap();
        assert_eq!(result.component_count, 1);

        world.set_height_bounds("world", -64, 319);
        assert_eq!(scan_band(&world, "world").unwrap(), (0, 128));
    }

    #[test]
    fn test_stand_touching_component_counts_as_loop() {
        let world = MemoryWorld::new();
        world.place("world", BlockPos::new(2, 65, 2), BlockKind::Piston);
        world.spawn_stand("world", BlockPos::new(2, 64, 2));
        world.spawn_stand("world", BlockPos::new(10, 64, 10));

        let result = scan_region(&world, &region(), &monitored(), 0).unwrap();
        assert!(result.has_complex_clock);
        assert_eq!(result.component_count, 2);
    }

    #[test]
    fn test_center_prefers_most_connected_logic() {
        let world = MemoryWorld::new();
        world.place("world", BlockPos::new(1, 64, 1), BlockKind::RedstoneWire);
        world.place("world", BlockPos::new(8, 70, 8), BlockKind::Repeater);
        world.place("world", BlockPos::new(7, 70, 8), BlockKind::RedstoneWire);
        world.place("world", BlockPos::new(9, 70, 8), BlockKind::RedstoneWire);

        let center = find_center(&world, &region(), &monitored()).unwrap();
        assert_eq!(center, BlockPos::new(8, 70, 8));
    }

    #[test]
    fn test_empty_region_centers_on_middle() {
        let world = MemoryWorld::new();
        world.load_region(&region());
        let center = find_center(&world, &region(), &monitored()).unwrap();
        assert_eq!(center, region().center_block());
    }

    #[test]
    fn test_detector_reuses_cached_result_within_ttl() {
        let world = MemoryWorld::new();
        world.place("world", BlockPos::new(4, 64, 4), BlockKind::Observer);
        let mut detector = ClockDetector::new(Arc::new(monitored()), 10);

        let first = detector.scan(&world, &region(), 0).unwrap();
        let reads = world.block_reads();
        let second = detector.scan(&world, &region(), SCAN_CACHE_TTL - 1).unwrap();
        assert_eq!(first, second);
        assert_eq!(world.block_reads(), reads);
        assert_eq!(detector.scans_performed(), 1);

        detector.scan(&world, &region(), SCAN_CACHE_TTL).unwrap();
        assert_eq!(detector.scans_performed(), 2);
    }

    #[test]
    fn test_detector_treats_unloaded_region_as_no_clock() {
        let world = MemoryWorld::new();
        world.place("world", BlockPos::new(0, 64, 0), BlockKind::Observer);
        let mut detector = ClockDetector::new(Arc::new(monitored()), 1);
        assert!(!detector.detect(&world, &RegionKey::new("world", 9, 9), 0));
        assert_eq!(detector.cached_regions(), 0);
    }
}
