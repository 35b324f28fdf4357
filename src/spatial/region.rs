//! Region identity for the 16x16 world columns every store is keyed by

use std::sync::Arc;

use derive_more::Display;

use crate::core::types::{BlockPos, MID_HEIGHT};

/// Width of a region in blocks along x and z
pub const REGION_SIZE: i32 = 16;

/// A fixed-size horizontal column of a world
///
/// Equal iff world, x and z all match. The world name is shared so keys are
/// cheap to clone into the many per-region maps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display(fmt = "{}:({}, {})", world, x, z)]
pub struct RegionKey {
    pub world: Arc<str>,
    pub x: i32,
    pub z: i32,
}

impl RegionKey {
    pub fn new(world: impl Into<Arc<str>>, x: i32, z: i32) -> Self {
        Self {
            world: world.into(),
            x,
            z,
        }
    }

    /// Region containing a block
    #[inline]
    pub fn containing(world: &Arc<str>, pos: BlockPos) -> Self {
        Self {
            world: Arc::clone(world),
            x: pos.x.div_euclid(REGION_SIZE),
            z: pos.z.div_euclid(REGION_SIZE),
        }
    }

    /// Region offset by whole regions in the same world
    pub fn offset(&self, dx: i32, dz: i32) -> Self {
        Self {
            world: Arc::clone(&self.world),
            x: self.x + dx,
            z: self.z + dz,
        }
    }

    /// The region itself plus its 8 neighbors (3x3 neighborhood)
    pub fn neighborhood(&self) -> impl Iterator<Item = RegionKey> + '_ {
        (-1..=1).flat_map(move |dx| (-1..=1).map(move |dz| self.offset(dx, dz)))
    }

    /// Lowest-corner block x/z of the region
    pub fn origin(&self) -> (i32, i32) {
        (self.x * REGION_SIZE, self.z * REGION_SIZE)
    }

    /// Block at local (8, 64, 8), used for proximity checks and as the
    /// fallback machine center
    pub fn center_block(&self) -> BlockPos {
        let (ox, oz) = self.origin();
        BlockPos::new(ox + REGION_SIZE / 2, MID_HEIGHT, oz + REGION_SIZE / 2)
    }

    /// Every (x, z) column of the region in absolute block coordinates
    pub fn columns(&self) -> impl Iterator<Item = (i32, i32)> {
        let (ox, oz) = self.origin();
        (0..REGION_SIZE).flat_map(move |lx| (0..REGION_SIZE).map(move |lz| (ox + lx, oz + lz)))
    }

    pub fn contains(&self, pos: BlockPos) -> bool {
        pos.x.div_euclid(REGION_SIZE) == self.x && pos.z.div_euclid(REGION_SIZE) == self.z
    }
}
