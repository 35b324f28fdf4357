//! In-memory world used by the demo binary and the tests

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ahash::{AHashMap, AHashSet};

use crate::core::error::HostError;
use crate::core::types::{BlockKind, BlockPos, EntityId, EntityKind, EntitySnapshot};
use crate::spatial::RegionKey;
use crate::world::host::WorldHost;

#[derive(Debug, Clone)]
struct WorldData {
    min_height: i32,
    max_height: i32,
    blocks: AHashMap<BlockPos, BlockKind>,
    entities: Vec<EntitySnapshot>,
    players: Vec<(String, BlockPos)>,
    loaded: AHashSet<(i32, i32)>,
}

impl WorldData {
    fn new() -> Self {
        Self {
            min_height: -64,
            max_height: 319,
            blocks: AHashMap::new(),
            entities: Vec::new(),
            players: Vec::new(),
            loaded: AHashSet::new(),
        }
    }
}

/// A mutation applied through the host interface, in call order
#[derive(Debug, Clone, PartialEq)]
pub enum HostMutation {
    SetBlock { pos: BlockPos, kind: BlockKind },
    RemoveEntity(EntityId),
    Refresh { pos: BlockPos, apply_physics: bool },
}

#[derive(Debug, Default)]
struct Inner {
    worlds: AHashMap<Arc<str>, WorldData>,
    tick_rate: Option<f64>,
    observers: Vec<String>,
    messages: Vec<(String, String)>,
    mutations: Vec<HostMutation>,
}

/// Thread-safe in-memory [`WorldHost`]
///
/// Placing a block or entity loads its region. Unset positions read as air.
#[derive(Debug, Default)]
pub struct MemoryWorld {
    inner: RwLock<Inner>,
    block_reads: AtomicU64,
}

impl MemoryWorld {
    pub fn new() -> Self {
        let world = Self::default();
        world.write().tick_rate = Some(20.0);
        world
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    fn with_world<R>(&self, world: &str, f: impl FnOnce(&mut WorldData) -> R) -> R {
        let mut inner = self.write();
        let data = inner
            .worlds
            .entry(Arc::from(world))
            .or_insert_with(WorldData::new);
        f(data)
    }

    pub fn set_height_bounds(&self, world: &str, min: i32, max: i32) {
        self.with_world(world, |w| {
            w.min_height = min;
            w.max_height = max;
        });
    }

    pub fn place(&self, world: &str, pos: BlockPos, kind: BlockKind) {
        let region = RegionKey::containing(&Arc::from(world), pos);
        self.with_world(world, |w| {
            w.loaded.insert((region.x, region.z));
            if kind == BlockKind::Air {
                w.blocks.remove(&pos);
            } else {
                w.blocks.insert(pos, kind);
            }
        });
    }

    pub fn load_region(&self, region: &RegionKey) {
        self.with_world(&region.world, |w| {
            w.loaded.insert((region.x, region.z));
        });
    }

    pub fn unload_region(&self, region: &RegionKey) {
        self.with_world(&region.world, |w| {
            w.loaded.remove(&(region.x, region.z));
        });
    }

    pub fn spawn_stand(&self, world: &str, pos: BlockPos) -> EntityId {
        self.spawn_entity(world, pos, EntityKind::Stand)
    }

    pub fn spawn_entity(&self, world: &str, pos: BlockPos, kind: EntityKind) -> EntityId {
        let id = EntityId::new();
        let region = RegionKey::containing(&Arc::from(world), pos);
        self.with_world(world, |w| {
            w.loaded.insert((region.x, region.z));
            w.entities.push(EntitySnapshot { id, kind, pos });
        });
        id
    }

    pub fn add_player(&self, world: &str, name: &str, pos: BlockPos) {
        self.with_world(world, |w| {
            w.players.retain(|(n, _)| n != name);
            w.players.push((name.to_string(), pos));
        });
    }

    pub fn remove_player(&self, name: &str) {
        let mut inner = self.write();
        for data in inner.worlds.values_mut() {
            data.players.retain(|(n, _)| n != name);
        }
    }

    pub fn add_observer(&self, name: &str) {
        self.write().observers.push(name.to_string());
    }

    /// Script the next tick-rate samples; `None` makes sampling fail
    pub fn set_tick_rate(&self, tps: Option<f64>) {
        self.write().tick_rate = tps;
    }

    pub fn block(&self, world: &str, pos: BlockPos) -> BlockKind {
        self.read()
            .worlds
            .get(world)
            .and_then(|w| w.blocks.get(&pos).cloned())
            .unwrap_or(BlockKind::Air)
    }

    pub fn entity_count(&self, world: &str) -> usize {
        self.read()
            .worlds
            .get(world)
            .map(|w| w.entities.len())
            .unwrap_or(0)
    }

    /// Messages delivered so far as (observer, text)
    pub fn messages(&self) -> Vec<(String, String)> {
        self.read().messages.clone()
    }

    pub fn mutations(&self) -> Vec<HostMutation> {
        self.read().mutations.clone()
    }

    /// Total `block_at` calls served, for asserting cache behavior
    pub fn block_reads(&self) -> u64 {
        self.block_reads.load(Ordering::Relaxed)
    }
}

impl WorldHost for MemoryWorld {
    fn block_at(&self, world: &str, pos: BlockPos) -> Result<BlockKind, HostError> {
        self.block_reads.fetch_add(1, Ordering::Relaxed);
        let inner = self.read();
        let data = inner
            .worlds
            .get(world)
            .ok_or_else(|| HostError::UnknownWorld(world.to_string()))?;
        let region = RegionKey::containing(&Arc::from(world), pos);
        if !data.loaded.contains(&(region.x, region.z)) {
            return Err(HostError::RegionUnloaded(region));
        }
        Ok(data.blocks.get(&pos).cloned().unwrap_or(BlockKind::Air))
    }

    fn height_bounds(&self, world: &str) -> Result<(i32, i32), HostError> {
        self.read()
            .worlds
            .get(world)
            .map(|w| (w.min_height, w.max_height))
            .ok_or_else(|| HostError::UnknownWorld(world.to_string()))
    }

    fn entities_in(&self, region: &RegionKey) -> Result<Vec<EntitySnapshot>, HostError> {
        let inner = self.read();
        let data = inner
            .worlds
            .get(&*region.world)
            .ok_or_else(|| HostError::UnknownWorld(region.world.to_string()))?;
        if !data.loaded.contains(&(region.x, region.z)) {
            return Err(HostError::RegionUnloaded(region.clone()));
        }
        Ok(data
            .entities
            .iter()
            .filter(|e| region.contains(e.pos))
            .cloned()
            .collect())
    }

    fn players_within(
        &self,
        world: &str,
        center: BlockPos,
        radius: u32,
    ) -> Result<bool, HostError> {
        let inner = self.read();
        let data = inner
            .worlds
            .get(world)
            .ok_or_else(|| HostError::UnknownWorld(world.to_string()))?;
        let radius_sq = (radius as i64) * (radius as i64);
        Ok(data
            .players
            .iter()
            .any(|(_, pos)| pos.distance_squared(&center) <= radius_sq))
    }

    fn has_players(&self, world: &str) -> bool {
        self.read()
            .worlds
            .get(world)
            .map(|w| !w.players.is_empty())
            .unwrap_or(false)
    }

    fn online_players(&self) -> usize {
        self.read().worlds.values().map(|w| w.players.len()).sum()
    }

    fn worlds(&self) -> Vec<Arc<str>> {
        let mut names: Vec<Arc<str>> = self.read().worlds.keys().cloned().collect();
        names.sort();
        names
    }

    fn loaded_regions(&self, world: &str) -> Vec<RegionKey> {
        let inner = self.read();
        let Some((name, data)) = inner.worlds.get_key_value(world) else {
            return Vec::new();
        };
        let mut regions: Vec<RegionKey> = data
            .loaded
            .iter()
            .map(|&(x, z)| RegionKey {
                world: Arc::clone(name),
                x,
                z,
            })
            .collect();
        regions.sort();
        regions
    }

    fn tick_rate(&self) -> Result<f64, HostError> {
        self.read().tick_rate.ok_or(HostError::TickRateUnavailable)
    }

    fn set_block(&self, world: &str, pos: BlockPos, kind: BlockKind) -> Result<(), HostError> {
        let mut inner = self.write();
        let data = inner
            .worlds
            .get_mut(world)
            .ok_or_else(|| HostError::UnknownWorld(world.to_string()))?;
        if kind == BlockKind::Air {
            data.blocks.remove(&pos);
        } else {
            data.blocks.insert(pos, kind.clone());
        }
        inner.mutations.push(HostMutation::SetBlock { pos, kind });
        Ok(())
    }

    fn remove_entity(&self, id: EntityId) -> Result<(), HostError> {
        let mut inner = self.write();
        let mut found = false;
        for data in inner.worlds.values_mut() {
            let before = data.entities.len();
            data.entities.retain(|e| e.id != id);
            found |= data.entities.len() != before;
        }
        if !found {
            return Err(HostError::EntityGone(id));
        }
        inner.mutations.push(HostMutation::RemoveEntity(id));
        Ok(())
    }

    fn refresh_block(
        &self,
        _world: &str,
        pos: BlockPos,
        apply_physics: bool,
    ) -> Result<(), HostError> {
        self.write()
            .mutations
            .push(HostMutation::Refresh { pos, apply_physics });
        Ok(())
    }

    fn authorized_observers(&self) -> Vec<String> {
        self.read().observers.clone()
    }

    fn send_message(&self, observer: &str, message: &str) {
        self.write()
            .messages
            .push((observer.to_string(), message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_blocks_read_as_air() {
        let world = MemoryWorld::new();
        world.place("world", BlockPos::new(1, 64, 1), BlockKind::Repeater);
        assert_eq!(
            world.block_at("world", BlockPos::new(2, 64, 1)).unwrap(),
            BlockKind::Air
        );
        assert_eq!(
            world.block_at("world", BlockPos::new(1, 64, 1)).unwrap(),
            BlockKind::Repeater
        );
    }

    #[test]
    fn test_unloaded_region_read_fails() {
        let world = MemoryWorld::new();
        world.place("world", BlockPos::new(0, 64, 0), BlockKind::Observer);
        let result = world.block_at("world", BlockPos::new(100, 64, 0));
        assert!(matches!(result, Err(HostError::RegionUnloaded(_))));
    }

    #[test]
    fn test_player_radius_is_inclusive() {
        let world = MemoryWorld::new();
        world.add_player("world", "alex", BlockPos::new(10, 64, 0));
        assert!(world
            .players_within("world", BlockPos::new(0, 64, 0), 10)
            .unwrap());
        assert!(!world
            .players_within("world", BlockPos::new(0, 64, 0), 9)
            .unwrap());
    }

    #[test]
    fn test_remove_missing_entity_reports_gone() {
        let world = MemoryWorld::new();
        let id = world.spawn_stand("world", BlockPos::new(0, 64, 0));
        assert!(world.remove_entity(id).is_ok());
        assert_eq!(world.remove_entity(id), Err(HostError::EntityGone(id)));
    }
}
