//! Boundary between the engine and the host simulation
//!
//! The engine never owns world data. Everything it knows about blocks,
//! entities and players comes through [`WorldHost`], and every mutation it
//! makes goes back through it. Queries may run on scan workers, so hosts must
//! be `Send + Sync`; mutations are only issued from the tick loop.

use std::sync::Arc;

use crate::core::error::HostError;
use crate::core::types::{BlockKind, BlockPos, EntityId, EntitySnapshot};
use crate::spatial::RegionKey;

pub trait WorldHost: Send + Sync {
    // === QUERIES ===

    /// Block type at a position; fails if the containing region is not loaded
    fn block_at(&self, world: &str, pos: BlockPos) -> Result<BlockKind, HostError>;

    /// Inclusive (min, max) build height of a world
    fn height_bounds(&self, world: &str) -> Result<(i32, i32), HostError>;

    /// Entities currently inside a region
    fn entities_in(&self, region: &RegionKey) -> Result<Vec<EntitySnapshot>, HostError>;

    /// Whether any player stands within `radius` blocks of `center`
    fn players_within(&self, world: &str, center: BlockPos, radius: u32) -> Result<bool, HostError>;

    /// Whether a world has any players at all
    fn has_players(&self, world: &str) -> bool;

    /// Players online across all worlds
    fn online_players(&self) -> usize;

    fn worlds(&self) -> Vec<Arc<str>>;

    fn loaded_regions(&self, world: &str) -> Vec<RegionKey>;

    /// Most recent one-minute average ticks per second
    fn tick_rate(&self) -> Result<f64, HostError>;

    // === MUTATIONS (tick loop only) ===

    fn set_block(&self, world: &str, pos: BlockPos, kind: BlockKind) -> Result<(), HostError>;

    fn remove_entity(&self, id: EntityId) -> Result<(), HostError>;

    /// Re-evaluate a block's state, optionally propagating physics to its neighbors
    fn refresh_block(
        &self,
        world: &str,
        pos: BlockPos,
        apply_physics: bool,
    ) -> Result<(), HostError>;

    // === OBSERVERS ===

    /// Names of observers permitted to receive lag alerts
    fn authorized_observers(&self) -> Vec<String>;

    fn send_message(&self, observer: &str, message: &str);
}
