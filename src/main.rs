//! Lag Warden - demo driver
//!
//! Builds a small in-memory world with one clock contraption and one idle
//! wire run, drives the engine for a number of ticks while the clock keeps
//! firing, and prints what the engine did about it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use lag_warden::core::error::Result;
use lag_warden::core::types::{BlockKind, BlockPos, TICKS_PER_SECOND};
use lag_warden::core::RedstoneConfig;
use lag_warden::redstone::RedstoneEngine;
use lag_warden::spatial::RegionKey;
use lag_warden::world::{MemoryWorld, WorldHost};

#[derive(Parser, Debug)]
#[command(name = "lag-warden")]
#[command(about = "Drive the redstone engine against a demo world")]
struct Args {
    /// TOML configuration file (defaults apply when absent)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Ticks to simulate
    #[arg(long, default_value_t = 400)]
    ticks: u64,

    /// Seed for the dismantler shuffle
    #[arg(long)]
    seed: Option<u64>,

    /// Tick rate reported by the demo host
    #[arg(long, default_value_t = 20.0)]
    tps: f64,

    /// Remove components of detected machines
    #[arg(long)]
    destroy: bool,

    /// Clock pulses per tick
    #[arg(long, default_value_t = 2)]
    pulses: u32,
}

const WORLD: &str = "world";

/// Observer/comparator clock in region (0, 0)
fn clock_layout() -> Vec<(BlockPos, BlockKind)> {
    let mut blocks = Vec::new();
    for (x, z) in [
        (2, 2),
        (3, 2),
        (4, 2),
        (5, 2),
        (5, 3),
        (5, 4),
        (4, 4),
        (3, 4),
        (2, 4),
        (2, 3),
    ] {
        let corner = (x == 2 || x == 5) && (z == 2 || z == 4);
        let kind = if corner {
            BlockKind::Repeater
        } else {
            BlockKind::RedstoneWire
        };
        blocks.push((BlockPos::new(x, 64, z), kind));
    }
    blocks.push((BlockPos::new(3, 64, 3), BlockKind::Comparator));
    blocks.push((BlockPos::new(4, 64, 3), BlockKind::Observer));
    blocks
}

fn build_world(tps: f64) -> (Arc<MemoryWorld>, Vec<(BlockPos, BlockKind)>) {
    let world = Arc::new(MemoryWorld::new());
    world.set_tick_rate(Some(tps));

    let clock = clock_layout();
    for (pos, kind) in &clock {
        world.place(WORLD, *pos, kind.clone());
    }

    // Long idle wire run two regions over, fed by a lever
    world.place(WORLD, BlockPos::new(31, 64, 8), BlockKind::Lever);
    for x in 32..48 {
        world.place(WORLD, BlockPos::new(x, 64, 8), BlockKind::RedstoneWire);
    }

    world.add_player(WORLD, "steve", BlockPos::new(10, 64, 10));
    world.add_observer("admin");
    (world, clock)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("lag_warden=debug")
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => RedstoneConfig::load(path)?,
        None => RedstoneConfig::default(),
    };
    if args.seed.is_some() {
        config.rng_seed = args.seed;
    }
    if args.destroy {
        config.destroy_components = true;
    }

    tracing::info!("Lag Warden demo starting ({} ticks)", args.ticks);

    let (world, clock) = build_world(args.tps);
    let world_name: Arc<str> = Arc::from(WORLD);
    let mut engine = RedstoneEngine::new(config, Arc::clone(&world))?;
    engine.start();

    let mut denied = 0u64;
    for tick in 0..args.ticks {
        engine.on_tick(tick);
        if engine.scans_in_flight() > 0 {
            engine.await_scans(Duration::from_secs(1));
        }

        for _ in 0..args.pulses {
            for (pos, kind) in &clock {
                if world.block(WORLD, *pos) != *kind {
                    continue;
                }
                if !engine.on_redstone_event(&world_name, *pos, kind) {
                    denied += 1;
                }
            }
        }
    }
    engine.await_scans(Duration::from_secs(1));
    engine.stop();

    let clock_region = RegionKey::new(WORLD, 0, 0);
    let wire_region = RegionKey::new(WORLD, 2, 0);
    let stats = engine.stats();
    let surviving = clock
        .iter()
        .filter(|(pos, kind)| world.block(WORLD, *pos) == *kind)
        .count();

    println!("\n=== LAG WARDEN SUMMARY ===");
    println!(
        "Simulated {} ticks ({:.1} s)",
        args.ticks,
        args.ticks as f64 / TICKS_PER_SECOND as f64
    );
    println!(
        "Gate: {} allowed, {} denied ({} clock events denied), {} faults",
        stats.allowed, stats.denied, denied, stats.faults
    );
    println!(
        "Detections: {}, sweeps dispatched: {}, scans: {}",
        stats.detections,
        stats.sweeps_dispatched,
        engine.scans_performed()
    );
    println!(
        "Removed: {} blocks, {} stands; clock components left: {}/{}",
        stats.blocks_removed,
        stats.entities_removed,
        surviving,
        clock.len()
    );
    println!("Clock region {}: {:?}", clock_region, engine.region_status(&clock_region));
    println!("Wire region {}: {:?}", wire_region, engine.region_status(&wire_region));
    println!(
        "Flagged regions: {}, tick rate: {:.2}",
        engine.lag_machine_count(),
        world.tick_rate()?
    );
    for (observer, message) in world.messages() {
        println!("  [{}] {}", observer, message);
    }

    Ok(())
}
