//! Rate-limited removal of a detected machine's components
//!
//! Candidates are collected by a scan worker and selection happens in one
//! step on the tick loop; destruction never happens in one step. Blocks and stand
//! entities become two independent jobs that remove at most
//! [`DISMANTLE_BATCH_SIZE`] items per step, with [`DISMANTLE_BATCH_DELAY`]
//! ticks between steps, until exhausted.

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::core::config::{DISMANTLE_BATCH_DELAY, DISMANTLE_BATCH_SIZE};
use crate::core::error::HostError;
use crate::core::scheduler::DeferredQueue;
use crate::core::types::{BlockKind, BlockPos, EntityId, Tick};
use crate::redstone::scanner::{scan_band, MonitoredSet};
use crate::redstone::wiring::refresh_neighbors;
use crate::spatial::RegionKey;
use crate::world::WorldHost;

/// One thing the dismantler may remove
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Block(BlockPos),
    Entity(EntityId),
}

/// Everything that may be removed from a region, in scan order
pub fn collect_candidates<H: WorldHost + ?Sized>(
    host: &H,
    region: &RegionKey,
    monitored: &MonitoredSet,
) -> Result<Vec<Target>, HostError> {
    let world = &*region.world;
    let (min_y, max_y) = scan_band(host, world)?;

    let mut targets = Vec::new();
    for (x, z) in region.columns() {
        for y in min_y..=max_y {
            let pos = BlockPos::new(x, y, z);
            let kind = host.block_at(world, pos)?;
            if monitored.contains(&kind) && kind.is_active_logic() {
                targets.push(Target::Block(pos));
            }
        }
    }
    targets.extend(
        host.entities_in(region)?
            .into_iter()
            .filter(|e| e.is_stand())
            .map(|e| Target::Entity(e.id)),
    );
    Ok(targets)
}

/// Shuffle `candidates` and keep at most `max`
pub fn choose_targets<R: rand::Rng + ?Sized>(
    mut candidates: Vec<Target>,
    max: usize,
    rng: &mut R,
) -> Vec<Target> {
    let count = max.min(candidates.len());
    if count == 0 {
        return Vec::new();
    }
    candidates.shuffle(rng);
    candidates.truncate(count);
    candidates
}

#[derive(Debug, Clone)]
enum JobWork {
    Blocks {
        remaining: VecDeque<BlockPos>,
        destroyed: Vec<BlockPos>,
    },
    Entities {
        remaining: VecDeque<EntityId>,
    },
}

#[derive(Debug, Clone)]
struct DismantleJob {
    region: RegionKey,
    work: JobWork,
}

/// What one drain pass changed in the world
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub blocks_removed: usize,
    pub entities_removed: usize,
    pub jobs_finished: usize,
}

#[derive(Debug, Clone)]
pub struct Dismantler {
    rng: ChaCha8Rng,
    jobs: DeferredQueue<DismantleJob>,
}

impl Dismantler {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            rng,
            jobs: DeferredQueue::new(),
        }
    }

    /// Pick up to `max` of a region's `candidates` and queue their removal
    ///
    /// The first batch runs on the tick after `now`. Returns how many items
    /// were queued.
    pub fn queue(
        &mut self,
        region: &RegionKey,
        candidates: Vec<Target>,
        max: usize,
        now: Tick,
    ) -> usize {
        let chosen = choose_targets(candidates, max, &mut self.rng);
        if chosen.is_empty() {
            return 0;
        }

        let mut blocks = VecDeque::new();
        let mut entities = VecDeque::new();
        for target in &chosen {
            match *target {
                Target::Block(pos) => blocks.push_back(pos),
                Target::Entity(id) => entities.push_back(id),
            }
        }

        tracing::info!(
            "Queued removal of {} blocks and {} stands in {}",
            blocks.len(),
            entities.len(),
            region
        );

        if !blocks.is_empty() {
            self.jobs.schedule(
                now + 1,
                DismantleJob {
                    region: region.clone(),
                    work: JobWork::Blocks {
                        remaining: blocks,
                        destroyed: Vec::new(),
                    },
                },
            );
        }
        if !entities.is_empty() {
            self.jobs.schedule(
                now + 1,
                DismantleJob {
                    region: region.clone(),
                    work: JobWork::Entities { remaining: entities },
                },
            );
        }
        chosen.len()
    }

    /// Run every batch step due at `now`
    pub fn drain<H: WorldHost + ?Sized>(&mut self, host: &H, now: Tick) -> DrainReport {
        let mut report = DrainReport::default();

        for mut job in self.jobs.take_due(now) {
            let world = &*job.region.world;
            let finished = match &mut job.work {
                JobWork::Blocks {
                    remaining,
                    destroyed,
                } => {
                    for pos in remaining.drain(..DISMANTLE_BATCH_SIZE.min(remaining.len())) {
                        match host.set_block(world, pos, BlockKind::Air) {
                            Ok(()) => {
                                tracing::debug!("Removed component at {} in {}", pos, job.region);
                                destroyed.push(pos);
                                report.blocks_removed += 1;
                            }
                            Err(e) => tracing::warn!("Failed to remove block at {}: {}", pos, e),
                        }
                    }
                    if remaining.is_empty() {
                        for pos in destroyed.iter() {
                            refresh_neighbors(host, world, *pos, false);
                        }
                        tracing::info!("Finished removing blocks in {}", job.region);
                        true
                    } else {
                        false
                    }
                }
                JobWork::Entities { remaining } => {
                    for id in remaining.drain(..DISMANTLE_BATCH_SIZE.min(remaining.len())) {
                        match host.remove_entity(id) {
                            Ok(()) => {
                                tracing::debug!("Removed stand {} in {}", id, job.region);
                                report.entities_removed += 1;
                            }
                            Err(e) => tracing::debug!("Stand already gone: {}", e),
                        }
                    }
                    remaining.is_empty()
                }
            };

            if finished {
                report.jobs_finished += 1;
            } else {
                self.jobs.schedule(now + DISMANTLE_BATCH_DELAY, job);
            }
        }

        report
    }

    pub fn pending_jobs(&self) -> usize {
        self.jobs.len()
    }

    pub fn clear(&mut self) {
        self.jobs.clear();
    }
}
