//! Region scans on the worker pool, applied on the tick loop
//!
//! Every full-region read the engine needs goes through here: periodic
//! sweeps, cooldown-expiry re-scans and the survey of a freshly flagged
//! machine. The tick loop hands out jobs and later consumes the reports; the
//! workers only read the world through the host and never touch engine state.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::core::error::HostError;
use crate::core::types::{BlockPos, Tick};
use crate::redstone::dismantle::{collect_candidates, Target};
use crate::redstone::scanner::{find_center, scan_region, MonitoredSet, ScanResult};
use crate::spatial::RegionKey;
use crate::world::WorldHost;

/// Why a batch of clock scans was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPurpose {
    /// Periodic pattern sweep
    Sweep,
    /// Re-check of regions whose cooldown ran out
    Expiry,
}

/// Where a flagged machine sits and what may be removed from it
#[derive(Debug, Clone, PartialEq)]
pub struct MachineSurvey {
    pub center: BlockPos,
    /// Empty unless candidates were requested
    pub candidates: Vec<Target>,
}

#[derive(Debug)]
pub enum ScanReport {
    Scans {
        purpose: ScanPurpose,
        results: Vec<(RegionKey, Result<ScanResult, HostError>)>,
    },
    Survey {
        region: RegionKey,
        result: Result<MachineSurvey, HostError>,
    },
}

/// One finished job
#[derive(Debug)]
pub struct WorkerOutcome {
    pub dispatched_at: Tick,
    pub report: ScanReport,
}

/// Center and (optionally) dismantle candidates of a region
pub fn survey_region<H: WorldHost + ?Sized>(
    host: &H,
    region: &RegionKey,
    monitored: &MonitoredSet,
    with_candidates: bool,
) -> Result<MachineSurvey, HostError> {
    let center = find_center(host, region, monitored)?;
    let candidates = if with_candidates {
        collect_candidates(host, region, monitored)?
    } else {
        Vec::new()
    };
    Ok(MachineSurvey { center, candidates })
}

#[derive(Debug)]
pub struct ScanWorker {
    tx: Sender<WorkerOutcome>,
    rx: Receiver<WorkerOutcome>,
    in_flight: usize,
}

impl ScanWorker {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx,
            in_flight: 0,
        }
    }

    /// Scan `regions` in parallel; results arrive through `collect`
    pub fn dispatch_scans<H: WorldHost + 'static>(
        &mut self,
        host: Arc<H>,
        regions: Vec<RegionKey>,
        monitored: Arc<MonitoredSet>,
        purpose: ScanPurpose,
        now: Tick,
    ) {
        if regions.is_empty() {
            return;
        }
        self.in_flight += 1;
        let tx = self.tx.clone();
        rayon::spawn(move || {
            let results = regions
                .into_par_iter()
                .map(|region| {
                    let result = scan_region(&*host, &region, &monitored, now);
                    (region, result)
                })
                .collect();
            // Receiver only goes away with the engine
            let _ = tx.send(WorkerOutcome {
                dispatched_at: now,
                report: ScanReport::Scans { purpose, results },
            });
        });
    }

    /// Survey a flagged region off the tick thread
    pub fn dispatch_survey<H: WorldHost + 'static>(
        &mut self,
        host: Arc<H>,
        region: RegionKey,
        monitored: Arc<MonitoredSet>,
        with_candidates: bool,
        now: Tick,
    ) {
        self.in_flight += 1;
        let tx = self.tx.clone();
        rayon::spawn(move || {
            let result = survey_region(&*host, &region, &monitored, with_candidates);
            let _ = tx.send(WorkerOutcome {
                dispatched_at: now,
                report: ScanReport::Survey { region, result },
            });
        });
    }

    /// Outcomes that finished since the last call, without blocking
    pub fn collect(&mut self) -> Vec<WorkerOutcome> {
        let outcomes: Vec<WorkerOutcome> = self.rx.try_iter().collect();
        self.in_flight = self.in_flight.saturating_sub(outcomes.len());
        outcomes
    }

    /// Block until every in-flight job reports or `timeout` passes
    pub fn wait(&mut self, timeout: Duration) -> Vec<WorkerOutcome> {
        let deadline = Instant::now() + timeout;
        let mut outcomes = Vec::new();
        while self.in_flight > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(outcome) => {
                    self.in_flight -= 1;
                    outcomes.push(outcome);
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        outcomes
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}

impl Default for ScanWorker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::BlockKind;
    use crate::world::MemoryWorld;

    fn monitored() -> Arc<MonitoredSet> {
        Arc::new([BlockKind::Observer, BlockKind::RedstoneWire].into_iter().collect())
    }

    #[test]
    fn test_dispatched_scan_reports_back() {
        let world = Arc::new(MemoryWorld::new());
        world.place("world", BlockPos::new(1, 64, 1), BlockKind::Observer);
        world.place("world", BlockPos::new(0, 64, 1), BlockKind::RedstoneWire);
        world.place("world", BlockPos::new(2, 64, 1), BlockKind::RedstoneWire);

        let mut worker = ScanWorker::new();
        worker.dispatch_scans(
            Arc::clone(&world),
            vec![RegionKey::new("world", 0, 0), RegionKey::new("world", 7, 7)],
            monitored(),
            ScanPurpose::Expiry,
            40,
        );
        assert_eq!(worker.in_flight(), 1);

        let outcomes = worker.wait(Duration::from_secs(10));
        assert_eq!(outcomes.len(), 1);
        assert_eq!(worker.in_flight(), 0);
        assert_eq!(outcomes[0].dispatched_at, 40);

        let ScanReport::Scans { purpose, results } = &outcomes[0].report else {
            panic!("expected scan results");
        };
        assert_eq!(*purpose, ScanPurpose::Expiry);
        let first = results[0].1.as_ref().unwrap();
        assert!(first.has_complex_clock);
        assert_eq!(first.component_count, 3);
        assert!(matches!(results[1].1, Err(HostError::RegionUnloaded(_))));
    }

    #[test]
    fn test_survey_finds_center_and_candidates() {
        let world = Arc::new(MemoryWorld::new());
        world.place("world", BlockPos::new(5, 70, 5), BlockKind::Observer);
        world.place("world", BlockPos::new(4, 70, 5), BlockKind::RedstoneWire);
        world.place("world", BlockPos::new(6, 70, 5), BlockKind::RedstoneWire);
        let region = RegionKey::new("world", 0, 0);

        let mut worker = ScanWorker::new();
        worker.dispatch_survey(Arc::clone(&world), region.clone(), monitored(), true, 3);
        let outcomes = worker.wait(Duration::from_secs(10));

        let ScanReport::Survey { region: surveyed, result } = &outcomes[0].report else {
            panic!("expected a survey");
        };
        assert_eq!(*surveyed, region);
        let survey = result.as_ref().unwrap();
        assert_eq!(survey.center, BlockPos::new(5, 70, 5));
        assert_eq!(survey.candidates, vec![Target::Block(BlockPos::new(5, 70, 5))]);
    }

    #[test]
    fn test_survey_without_candidates_skips_collection() {
        let world = MemoryWorld::new();
        world.place("world", BlockPos::new(5, 70, 5), BlockKind::Observer);
        let survey =
            survey_region(&world, &RegionKey::new("world", 0, 0), &monitored(), false).unwrap();
        assert!(survey.candidates.is_empty());
        assert_eq!(survey.center, BlockPos::new(5, 70, 5));
    }

    #[test]
    fn test_empty_dispatch_is_ignored() {
        let world = Arc::new(MemoryWorld::new());
        let mut worker = ScanWorker::new();
        worker.dispatch_scans(
            world,
            Vec::new(),
            Arc::new(MonitoredSet::default()),
            ScanPurpose::Sweep,
            0,
        );
        assert_eq!(worker.in_flight(), 0);
        assert!(worker.collect().is_empty());
    }
}
