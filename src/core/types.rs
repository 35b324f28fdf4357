//! Core type definitions used throughout the codebase

use derive_more::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Host simulation tick counter (engine time unit)
pub type Tick = u64;

/// Host ticks per wall-clock second at full speed
pub const TICKS_PER_SECOND: u64 = 20;

/// Logical mid-height of the world; scans cover ±64 blocks around it
pub const MID_HEIGHT: i32 = 64;

/// Half-height of the scanned vertical band
pub const SCAN_HALF_BAND: i32 = 64;

/// Convert whole seconds to ticks
pub fn seconds_to_ticks(seconds: u64) -> Tick {
    seconds * TICKS_PER_SECOND
}

/// Unique identifier for entities placed by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

/// Absolute block position in a world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display)]
#[display(fmt = "({}, {}, {})", x, y, z)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn relative(&self, dir: Direction) -> Self {
        let (dx, dy, dz) = dir.offset();
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }

    pub fn distance_squared(&self, other: &Self) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        let dz = (self.z - other.z) as i64;
        dx * dx + dy * dy + dz * dz
    }
}

/// Block faces used for adjacency checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    East,
    West,
    Up,
    Down,
}

impl Direction {
    /// The four faces sharing the block's horizontal plane
    pub const HORIZONTAL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// All six faces
    pub const ALL: [Direction; 6] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::Up,
        Direction::Down,
    ];

    pub fn offset(&self) -> (i32, i32, i32) {
        match self {
            Direction::North => (0, 0, -1),
            Direction::South => (0, 0, 1),
            Direction::East => (1, 0, 0),
            Direction::West => (-1, 0, 0),
            Direction::Up => (0, 1, 0),
            Direction::Down => (0, -1, 0),
        }
    }
}

/// Block material as reported by the host
///
/// Names follow the host's SCREAMING_SNAKE_CASE material ids so that
/// configuration lists can name any block, including ones this crate has
/// no special handling for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BlockKind {
    Air,
    Lever,
    Button,
    RedstoneTorch,
    RedstoneWire,
    Repeater,
    Comparator,
    Observer,
    Piston,
    StickyPiston,
    Other(String),
}

impl BlockKind {
    pub fn name(&self) -> &str {
        match self {
            BlockKind::Air => "AIR",
            BlockKind::Lever => "LEVER",
            BlockKind::Button => "BUTTON",
            BlockKind::RedstoneTorch => "REDSTONE_TORCH",
            BlockKind::RedstoneWire => "REDSTONE_WIRE",
            BlockKind::Repeater => "REPEATER",
            BlockKind::Comparator => "COMPARATOR",
            BlockKind::Observer => "OBSERVER",
            BlockKind::Piston => "PISTON",
            BlockKind::StickyPiston => "STICKY_PISTON",
            BlockKind::Other(name) => name,
        }
    }

    /// Manually actuated roots of a circuit; never throttled
    pub fn is_signal_source(&self) -> bool {
        matches!(
            self,
            BlockKind::Lever | BlockKind::Button | BlockKind::RedstoneTorch
        )
    }

    /// Elements that can close a feedback loop (torch, repeater, comparator,
    /// observer, pistons)
    pub fn is_active_logic(&self) -> bool {
        matches!(
            self,
            BlockKind::RedstoneTorch
                | BlockKind::Repeater
                | BlockKind::Comparator
                | BlockKind::Observer
                | BlockKind::Piston
                | BlockKind::StickyPiston
        )
    }

    /// Sources that keep an adjacent wire powered without player input
    pub fn powers_wire(&self) -> bool {
        matches!(self, BlockKind::Lever | BlockKind::Button)
    }
}

impl From<&str> for BlockKind {
    fn from(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "AIR" => BlockKind::Air,
            "LEVER" => BlockKind::Lever,
            "BUTTON" => BlockKind::Button,
            "REDSTONE_TORCH" => BlockKind::RedstoneTorch,
            "REDSTONE_WIRE" => BlockKind::RedstoneWire,
            "REPEATER" => BlockKind::Repeater,
            "COMPARATOR" => BlockKind::Comparator,
            "OBSERVER" => BlockKind::Observer,
            "PISTON" => BlockKind::Piston,
            "STICKY_PISTON" => BlockKind::StickyPiston,
            other => BlockKind::Other(other.to_string()),
        }
    }
}

impl From<String> for BlockKind {
    fn from(name: String) -> Self {
        BlockKind::from(name.as_str())
    }
}

impl From<BlockKind> for String {
    fn from(kind: BlockKind) -> Self {
        kind.name().to_string()
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Entity categories the engine cares about
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Armor-stand style entity; contraptions built from these count as
    /// circuit elements
    Stand,
    Other(String),
}

/// Point-in-time view of an entity, positioned at the block it occupies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub kind: EntityKind,
    pub pos: BlockPos,
}

impl EntitySnapshot {
    pub fn is_stand(&self) -> bool {
        self.kind == EntityKind::Stand
    }
}
