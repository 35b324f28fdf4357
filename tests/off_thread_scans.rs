//! Region scans stay off the tick thread
//!
//! [`TickThreadAudit`] wraps a [`MemoryWorld`] and counts block and entity
//! reads issued from the thread that built it (the test thread, which drives
//! `on_tick` and the update gate). Flagging a machine and expiring its
//! cooldown must leave that count at zero; the work shows up once the worker
//! results are applied.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;

use lag_warden::core::error::HostError;
use lag_warden::core::types::{BlockKind, BlockPos, EntityId, EntitySnapshot, Tick};
use lag_warden::core::RedstoneConfig;
use lag_warden::redstone::{GateDecision, RedstoneEngine};
use lag_warden::spatial::RegionKey;
use lag_warden::world::{MemoryWorld, WorldHost};

const WAIT: Duration = Duration::from_secs(10);

struct TickThreadAudit {
    world: MemoryWorld,
    tick_thread: ThreadId,
    tick_thread_reads: AtomicU64,
}

impl TickThreadAudit {
    fn new(world: MemoryWorld) -> Self {
        Self {
            world,
            tick_thread: thread::current().id(),
            tick_thread_reads: AtomicU64::new(0),
        }
    }

    fn note_read(&self) {
        if thread::current().id() == self.tick_thread {
            self.tick_thread_reads.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn tick_thread_reads(&self) -> u64 {
        self.tick_thread_reads.load(Ordering::Relaxed)
    }
}

impl WorldHost for TickThreadAudit {
    fn block_at(&self, world: &str, pos: BlockPos) -> Result<BlockKind, HostError> {
        self.note_read();
        self.world.block_at(world, pos)
    }

    fn height_bounds(&self, world: &str) -> Result<(i32, i32), HostError> {
        self.world.height_bounds(world)
    }

    fn entities_in(&self, region: &RegionKey) -> Result<Vec<EntitySnapshot>, HostError> {
        self.note_read();
        self.world.entities_in(region)
    }

    fn players_within(
        &self,
        world: &str,
        center: BlockPos,
        radius: u32,
    ) -> Result<bool, HostError> {
        self.world.players_within(world, center, radius)
    }

    fn has_players(&self, world: &str) -> bool {
        self.world.has_players(world)
    }

    fn online_players(&self) -> usize {
        self.world.online_players()
    }

    fn worlds(&self) -> Vec<Arc<str>> {
        self.world.worlds()
    }

    fn loaded_regions(&self, world: &str) -> Vec<RegionKey> {
        self.world.loaded_regions(world)
    }

    fn tick_rate(&self) -> Result<f64, HostError> {
        self.world.tick_rate()
    }

    fn set_block(&self, world: &str, pos: BlockPos, kind: BlockKind) -> Result<(), HostError> {
        self.world.set_block(world, pos, kind)
    }

    fn remove_entity(&self, id: EntityId) -> Result<(), HostError> {
        self.world.remove_entity(id)
    }

    fn refresh_block(
        &self,
        world: &str,
        pos: BlockPos,
        apply_physics: bool,
    ) -> Result<(), HostError> {
        self.world.refresh_block(world, pos, apply_physics)
    }

    fn authorized_observers(&self) -> Vec<String> {
        self.world.authorized_observers()
    }

    fn send_message(&self, observer: &str, message: &str) {
        self.world.send_message(observer, message)
    }
}

fn origin() -> RegionKey {
    RegionKey::new("world", 0, 0)
}

/// Observer loop plus a long wire run, spread over the whole column height
fn audited_world() -> Arc<TickThreadAudit> {
    let world = MemoryWorld::new();
    world.add_player("world", "alex", BlockPos::new(8, 64, 8));
    world.add_observer("admin");
    world.place("world", BlockPos::new(4, 64, 4), BlockKind::Observer);
    world.place("world", BlockPos::new(3, 64, 4), BlockKind::RedstoneWire);
    world.place("world", BlockPos::new(5, 64, 4), BlockKind::RedstoneWire);
    for x in 0..16 {
        world.place("world", BlockPos::new(x, 70, 10), BlockKind::RedstoneWire);
    }
    Arc::new(TickThreadAudit::new(world))
}

fn engine(host: &Arc<TickThreadAudit>, config: RedstoneConfig) -> RedstoneEngine<TickThreadAudit> {
    RedstoneEngine::new(config, Arc::clone(host)).unwrap()
}

fn run_ticks(engine: &mut RedstoneEngine<TickThreadAudit>, from: Tick, to: Tick) {
    for tick in from..=to {
        engine.on_tick(tick);
    }
}

// ============================================================================
// Flag Path
// ============================================================================

#[test]
fn test_gate_flag_surveys_machine_on_worker() {
    let host = audited_world();
    let mut engine = engine(
        &host,
        RedstoneConfig {
            activity_threshold: 1,
            destroy_components: true,
            max_destroyed_components: 5,
            rng_seed: Some(9),
            pattern_scan_enabled: false,
            ..Default::default()
        },
    );

    assert_eq!(
        engine.decide(&origin(), &BlockKind::Observer),
        GateDecision::DenyLagMachine
    );
    assert!(engine.is_lag_machine(&origin()));
    assert_eq!(host.tick_thread_reads(), 0);
    assert_eq!(engine.pending_dismantle_jobs(), 0);
    assert!(host.world.messages().is_empty());

    assert_eq!(engine.await_scans(WAIT), 1);
    assert_eq!(host.tick_thread_reads(), 0);
    assert_eq!(engine.pending_dismantle_jobs(), 1);

    let messages = host.world.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].1.contains("4, 64, 4"));
}

#[test]
fn test_survey_dropped_once_detection_is_off() {
    let host = audited_world();
    let mut engine = engine(
        &host,
        RedstoneConfig {
            activity_threshold: 1,
            destroy_components: true,
            pattern_scan_enabled: false,
            ..Default::default()
        },
    );

    engine.decide(&origin(), &BlockKind::Observer);
    engine.set_detection_active(false);
    assert_eq!(engine.await_scans(WAIT), 1);
    assert_eq!(engine.pending_dismantle_jobs(), 0);
    assert!(host.world.messages().is_empty());
}

// ============================================================================
// Cooldown Expiry
// ============================================================================

#[test]
fn test_expiry_rescan_runs_on_worker() {
    let host = audited_world();
    let mut engine = engine(
        &host,
        RedstoneConfig {
            activity_threshold: 1,
            pattern_scan_enabled: false,
            ..Default::default()
        },
    );
    engine.start();
    engine.on_tick(0);
    engine.decide(&origin(), &BlockKind::Observer);
    engine.await_scans(WAIT);
    let until = engine.cooldown_until(&origin()).unwrap();

    run_ticks(&mut engine, 1, until);
    assert_eq!(host.tick_thread_reads(), 0);
    // Still elapsed: nothing is decided until the re-scan reports
    assert_eq!(engine.cooldown_until(&origin()), Some(until));

    engine.await_scans(WAIT);
    assert_eq!(host.tick_thread_reads(), 0);
    assert_eq!(
        engine.cooldown_until(&origin()),
        Some(until + engine.config().cooldown_ticks())
    );
    assert!(!engine.is_lag_machine(&origin().offset(1, 0)));
}

#[test]
fn test_elapsed_region_is_not_rescanned_twice() {
    let host = audited_world();
    let mut engine = engine(
        &host,
        RedstoneConfig {
            activity_threshold: 1,
            pattern_scan_enabled: false,
            ..Default::default()
        },
    );
    engine.start();
    engine.on_tick(0);
    engine.decide(&origin(), &BlockKind::Observer);
    engine.await_scans(WAIT);
    let until = engine.cooldown_until(&origin()).unwrap();

    run_ticks(&mut engine, 1, until);
    assert_eq!(engine.scans_in_flight(), 1);
    engine.on_tick(until + 20);
    assert!(engine.scans_in_flight() <= 1);

    engine.await_scans(WAIT);
    assert!(engine.is_lag_machine(&origin()));
}
