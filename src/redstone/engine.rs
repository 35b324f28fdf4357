//! The redstone engine: one owned instance per server (or test harness)
//!
//! Everything region-scoped lives here and is only touched from the tick
//! loop: the host calls [`RedstoneEngine::on_tick`] once per tick and routes
//! circuit events through [`RedstoneEngine::on_redstone_event`] and
//! [`RedstoneEngine::on_block_broken`]. Operator commands map onto the admin
//! methods at the bottom.
//!
//! Full-region reads triggered by the tick loop go to a [`ScanWorker`]; their
//! results are applied at the start of a later tick.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ahash::AHashSet;

use crate::core::config::{
    RedstoneConfig, ACTIVITY_WINDOW, CACHE_MAX_AGE, CACHE_PRUNE_INTERVAL,
    COOLDOWN_CHECK_INTERVAL, HEALTH_SAMPLE_INTERVAL, NOTIFICATION_COOLDOWN, PLAYER_CACHE_TTL,
    SWEEP_REGIONS_PER_PASS,
};
use crate::core::error::{ConfigError, HostError};
use crate::core::scheduler::{DeferredQueue, RecurringTimers};
use crate::core::types::{BlockKind, BlockPos, Tick};
use crate::redstone::cooldown::{CooldownStore, RegionPhase};
use crate::redstone::dismantle::{DrainReport, Dismantler};
use crate::redstone::health::{HealthMonitor, HealthTransition};
use crate::redstone::limiter::{ActivityCounter, UpdateLimiter};
use crate::redstone::notify::{Alert, Notifier};
use crate::redstone::scanner::{ClockDetector, MonitoredSet, ScanResult};
use crate::redstone::worker::{MachineSurvey, ScanPurpose, ScanReport, ScanWorker, WorkerOutcome};
use crate::redstone::wiring::refresh_neighbors;
use crate::spatial::{RegionKey, TtlCache};
use crate::world::WorldHost;

/// Sweep selection slower than this is worth a warning
const SLOW_SWEEP: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineTimer {
    HealthSample,
    CachePrune,
    CooldownExpiry,
    PatternSweep,
}

#[derive(Debug, Clone)]
enum DeferredTask {
    RefreshNeighbors {
        world: Arc<str>,
        pos: BlockPos,
        apply_physics: bool,
    },
}

/// Which gate rule decided an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    AllowSignalSource,
    AllowOptimizationOff,
    DenyGlobalShutdown,
    AllowDetectionOff,
    AllowProtected,
    DenyNoPlayers,
    DenyCooldown,
    DenyRateLimit,
    DenyLowTps,
    AllowWhitelisted,
    DenyLagMachine,
    Allow,
    /// A host query failed while deciding
    DenyFault,
}

impl GateDecision {
    pub fn allowed(&self) -> bool {
        matches!(
            self,
            GateDecision::AllowSignalSource
                | GateDecision::AllowOptimizationOff
                | GateDecision::AllowDetectionOff
                | GateDecision::AllowProtected
                | GateDecision::AllowWhitelisted
                | GateDecision::Allow
        )
    }
}

/// Running totals since the engine was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub allowed: u64,
    pub denied: u64,
    pub faults: u64,
    pub detections: u64,
    pub sweeps_dispatched: u64,
    pub blocks_removed: u64,
    pub entities_removed: u64,
}

/// Read-only view of one region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionStatus {
    pub phase: RegionPhase,
    pub lag_machine: bool,
    pub activity: u32,
    pub updates_this_tick: u32,
}

pub struct RedstoneEngine<H: WorldHost + 'static> {
    config: Arc<RedstoneConfig>,
    host: Arc<H>,
    whitelist: AHashSet<BlockKind>,

    detector: ClockDetector,
    proximity: TtlCache<RegionKey, bool>,
    limiter: UpdateLimiter,
    activity: ActivityCounter,
    cooldowns: CooldownStore,
    health: HealthMonitor,
    dismantler: Dismantler,
    notifier: Notifier,
    worker: ScanWorker,
    /// Elapsed cooldowns whose re-scan is on a worker
    pending_expiry: AHashSet<RegionKey>,

    timers: RecurringTimers<EngineTimer>,
    deferred: DeferredQueue<DeferredTask>,

    detection_active: bool,
    running: bool,
    now: Tick,
    stats: EngineStats,
}

impl<H: WorldHost + 'static> RedstoneEngine<H> {
    pub fn new(config: RedstoneConfig, host: Arc<H>) -> Result<Self, ConfigError> {
        config.validate()?;

        let monitored: Arc<MonitoredSet> =
            Arc::new(config.monitored_blocks.iter().cloned().collect());
        let whitelist = config.whitelist_blocks.iter().cloned().collect();

        Ok(Self {
            detector: ClockDetector::new(monitored, config.min_redstone_components),
            proximity: TtlCache::new(PLAYER_CACHE_TTL),
            limiter: UpdateLimiter::new(config.max_updates_per_tick),
            activity: ActivityCounter::new(ACTIVITY_WINDOW),
            cooldowns: CooldownStore::new(config.cooldown_ticks()),
            health: HealthMonitor::new(
                config.critical_tps_threshold,
                config.recovery_tps_threshold(),
            ),
            dismantler: Dismantler::new(config.rng_seed),
            notifier: Notifier::new(config.messages.clone(), config.console_notifications),
            worker: ScanWorker::new(),
            pending_expiry: AHashSet::new(),
            timers: RecurringTimers::new(),
            deferred: DeferredQueue::new(),
            detection_active: config.lag_detection_enabled,
            running: false,
            now: 0,
            stats: EngineStats::default(),
            whitelist,
            host,
            config: Arc::new(config),
        })
    }

    // === LIFECYCLE ===

    /// Register the recurring timers, first run on the current tick
    pub fn start(&mut self) {
        let now = self.now;
        self.timers.every(EngineTimer::HealthSample, HEALTH_SAMPLE_INTERVAL, now);
        self.timers.every(EngineTimer::CachePrune, CACHE_PRUNE_INTERVAL, now);
        self.timers.every(EngineTimer::CooldownExpiry, COOLDOWN_CHECK_INTERVAL, now);
        self.schedule_sweep();
        self.running = true;
        tracing::info!(
            "Redstone engine started (detection {})",
            if self.detection_active { "on" } else { "off" }
        );
    }

    /// Remove all timers; queued dismantling and refreshes still drain
    pub fn stop(&mut self) {
        self.timers.cancel_all();
        self.running = false;
        tracing::info!("Redstone engine stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn schedule_sweep(&mut self) {
        if self.config.pattern_scan_enabled && self.config.optimization_enabled {
            let interval = self.config.sweep_interval();
            self.timers.every(EngineTimer::PatternSweep, interval, self.now);
        } else {
            tracing::info!("Pattern sweep disabled");
        }
    }

    /// Advance to `tick` and run everything due
    pub fn on_tick(&mut self, tick: Tick) {
        self.now = tick;
        self.limiter.reset();
        self.activity.expire(tick);

        for outcome in self.worker.collect() {
            self.apply_outcome(outcome);
        }

        for timer in self.timers.due(tick) {
            match timer {
                EngineTimer::HealthSample => self.sample_health(),
                EngineTimer::CachePrune => self.prune_caches(),
                EngineTimer::CooldownExpiry => self.check_cooldown_expiration(),
                EngineTimer::PatternSweep => self.run_sweep(),
            }
        }

        for task in self.deferred.take_due(tick) {
            match task {
                DeferredTask::RefreshNeighbors {
                    world,
                    pos,
                    apply_physics,
                } => {
                    refresh_neighbors(&*self.host, &world, pos, apply_physics);
                }
            }
        }

        let DrainReport {
            blocks_removed,
            entities_removed,
            ..
        } = self.dismantler.drain(&*self.host, tick);
        self.stats.blocks_removed += blocks_removed as u64;
        self.stats.entities_removed += entities_removed as u64;
    }

    // === UPDATE GATE ===

    /// Whether a circuit update in `region` may proceed
    pub fn allow_update(&mut self, region: &RegionKey, kind: &BlockKind) -> bool {
        self.decide(region, kind).allowed()
    }

    /// Gate decision with the rule that produced it
    pub fn decide(&mut self, region: &RegionKey, kind: &BlockKind) -> GateDecision {
        let decision = match self.evaluate(region, kind) {
            Ok(decision) => decision,
            Err(e) => {
                tracing::error!("Update gate fault in {}: {}", region, e);
                self.stats.faults += 1;
                GateDecision::DenyFault
            }
        };
        if decision.allowed() {
            self.stats.allowed += 1;
        } else {
            self.stats.denied += 1;
        }
        tracing::trace!("{} update in {}: {:?}", kind, region, decision);
        decision
    }

    fn evaluate(
        &mut self,
        region: &RegionKey,
        kind: &BlockKind,
    ) -> Result<GateDecision, HostError> {
        if kind.is_signal_source() {
            return Ok(GateDecision::AllowSignalSource);
        }
        if !self.config.optimization_enabled {
            return Ok(GateDecision::AllowOptimizationOff);
        }
        if self.health.is_globally_disabled() {
            return Ok(GateDecision::DenyGlobalShutdown);
        }
        if !self.detection_active {
            return Ok(GateDecision::AllowDetectionOff);
        }
        if self.cooldowns.is_protected(region) {
            return Ok(GateDecision::AllowProtected);
        }
        if self.config.player_radius_check && !self.players_nearby(region)? {
            return Ok(GateDecision::DenyNoPlayers);
        }
        if self.cooldowns.is_cooling(region, self.now) {
            return Ok(GateDecision::DenyCooldown);
        }
        if self.limiter.is_saturated(region) {
            tracing::debug!("Update cap {} reached in {}", self.limiter.cap(), region);
            return Ok(GateDecision::DenyRateLimit);
        }
        if self.config.low_tps_throttle
            && self.health.cached_tps(&*self.host, self.now) < self.config.low_tps_threshold
        {
            return Ok(GateDecision::DenyLowTps);
        }
        if self.whitelist.contains(kind) {
            return Ok(GateDecision::AllowWhitelisted);
        }

        let activity = self.activity.increment(region, self.now);
        if activity >= self.config.activity_threshold {
            self.flag_lag_machine(region);
            return Ok(GateDecision::DenyLagMachine);
        }

        self.limiter.record(region);
        Ok(GateDecision::Allow)
    }

    /// Cached player-proximity check around the region's center block
    fn players_nearby(&mut self, region: &RegionKey) -> Result<bool, HostError> {
        if let Some(&nearby) = self.proximity.get(region, self.now) {
            return Ok(nearby);
        }
        let nearby = self.host.players_within(
            &region.world,
            region.center_block(),
            self.config.player_radius,
        )?;
        self.proximity.insert(region.clone(), nearby, self.now);
        tracing::debug!(
            "Players within {} of {}: {}",
            self.config.player_radius,
            region,
            nearby
        );
        Ok(nearby)
    }

    // === HOST EVENTS ===

    /// Host hook for an attempted circuit change at `pos`
    ///
    /// Returns false when the new signal must be forced to zero; the
    /// neighbors of a denied block are refreshed on the next tick.
    pub fn on_redstone_event(&mut self, world: &Arc<str>, pos: BlockPos, kind: &BlockKind) -> bool {
        if !self.config.optimization_enabled || kind.is_signal_source() {
            return true;
        }
        let region = RegionKey::containing(world, pos);
        let allowed = self.allow_update(&region, kind);
        if !allowed {
            self.deferred.schedule(
                self.now + 1,
                DeferredTask::RefreshNeighbors {
                    world: Arc::clone(world),
                    pos,
                    apply_physics: false,
                },
            );
        }
        allowed
    }

    /// Host hook for a broken block; removed signal sources let their
    /// neighbors settle on the next tick
    pub fn on_block_broken(&mut self, world: &Arc<str>, pos: BlockPos, kind: &BlockKind) {
        if kind.is_signal_source() {
            tracing::debug!("Signal source {} broken at {} in {}", kind, pos, world);
            self.deferred.schedule(
                self.now + 1,
                DeferredTask::RefreshNeighbors {
                    world: Arc::clone(world),
                    pos,
                    apply_physics: true,
                },
            );
        }
    }

    // === DETECTION ===

    /// Clock verdict for a region, cached for 10 seconds
    pub fn detect_clock(&mut self, region: &RegionKey) -> bool {
        self.detector.detect(&*self.host, region, self.now)
    }

    /// Cached scan result, if still fresh
    pub fn scan_result(&self, region: &RegionKey) -> Option<ScanResult> {
        self.detector.cached(region, self.now)
    }

    /// Cool down the neighborhood now; unless the neighborhood was alerted
    /// recently, survey the machine on a worker and alert when it reports
    fn flag_lag_machine(&mut self, region: &RegionKey) {
        let expiry = self.cooldowns.enter(region, self.now);
        self.stats.detections += 1;
        tracing::warn!(
            "Lag machine flagged in {}; redstone off in 3x3 neighborhood until tick {}",
            region,
            expiry
        );

        if !self.cooldowns.claim_notification(region, self.now, NOTIFICATION_COOLDOWN) {
            tracing::debug!("Alert for {} suppressed: neighborhood recently notified", region);
            return;
        }

        self.worker.dispatch_survey(
            Arc::clone(&self.host),
            region.clone(),
            Arc::clone(self.detector.monitored()),
            self.config.destroy_components,
            self.now,
        );
    }

    /// Queue dismantling and broadcast the alert for a surveyed machine
    fn apply_survey(&mut self, region: RegionKey, result: Result<MachineSurvey, HostError>) {
        if !self.detection_active || !self.cooldowns.is_lag_machine(&region) {
            tracing::debug!("Dropping survey of {}: no longer flagged", region);
            return;
        }

        let (center, candidates) = match result {
            Ok(MachineSurvey { center, candidates }) => (center, candidates),
            Err(e) => {
                tracing::warn!("Could not survey {}: {}", region, e);
                (region.center_block(), Vec::new())
            }
        };

        let destroyed = if self.config.destroy_components {
            let max = self.config.max_destroyed_components as usize;
            self.dismantler.queue(&region, candidates, max, self.now)
        } else {
            0
        };

        tracing::warn!(
            "Lag machine in {} centered at {}, {} components queued for removal",
            region,
            center,
            destroyed
        );
        self.notifier.broadcast(
            &*self.host,
            &Alert::LagMachineDetected {
                region,
                center,
                destroyed,
            },
        );
    }

    /// Resolve elapsed cooldowns from fresh cache entries; re-scan the rest
    /// on a worker
    fn check_cooldown_expiration(&mut self) {
        let min_components = self.detector.min_components();
        let mut stale = Vec::new();
        for region in self.cooldowns.elapsed(self.now) {
            if self.pending_expiry.contains(&region) {
                continue;
            }
            match self.detector.cached(&region, self.now) {
                Some(scan) => self.resolve_expiry(&region, scan.is_lag_machine(min_components)),
                None => stale.push(region),
            }
        }

        if !stale.is_empty() {
            tracing::debug!("Re-scanning {} regions with elapsed cooldowns", stale.len());
            self.pending_expiry.extend(stale.iter().cloned());
            self.worker.dispatch_scans(
                Arc::clone(&self.host),
                stale,
                Arc::clone(self.detector.monitored()),
                ScanPurpose::Expiry,
                self.now,
            );
        }
    }

    fn apply_expiry_results(&mut self, results: Vec<(RegionKey, Result<ScanResult, HostError>)>) {
        let min_components = self.detector.min_components();
        for (region, result) in results {
            self.pending_expiry.remove(&region);
            let present = match result {
                Ok(scan) => {
                    self.detector.store(region.clone(), scan);
                    scan.is_lag_machine(min_components)
                }
                Err(e) => {
                    tracing::warn!("Expiry scan of {} failed: {}", region, e);
                    false
                }
            };
            self.resolve_expiry(&region, present);
        }
    }

    /// Extend or release a cooldown that is still elapsed
    fn resolve_expiry(&mut self, region: &RegionKey, present: bool) {
        match self.cooldowns.cooldown_until(region) {
            Some(until) if self.now >= until => {}
            _ => return,
        }
        if present {
            let expiry = self.cooldowns.extend(region, self.now);
            tracing::info!(
                "Lag machine still present in {}; cooldown extended to tick {}",
                region,
                expiry
            );
        } else {
            self.cooldowns.release(region);
            tracing::info!("Cooldown over in {}; redstone allowed", region);
        }
    }

    fn sample_health(&mut self) {
        let Some(transition) = self.health.sample(&*self.host, self.now) else {
            return;
        };
        match transition {
            HealthTransition::Critical { tps } => {
                self.cooldowns.clear_cooldowns();
                tracing::warn!("Tick rate critical ({:.2}); redstone disabled globally", tps);
                self.notifier.broadcast(&*self.host, &Alert::TpsCritical { tps });
            }
            HealthTransition::Restored { tps } => {
                tracing::info!("Tick rate recovered ({:.2}); redstone enabled", tps);
                self.notifier.broadcast(&*self.host, &Alert::TpsRestored { tps });
            }
        }
    }

    fn prune_caches(&mut self) {
        if self.proximity.is_empty() && self.detector.cached_regions() == 0 {
            return;
        }
        let players = self.proximity.prune(self.now, CACHE_MAX_AGE);
        let scans = self.detector.prune(self.now, CACHE_MAX_AGE);
        tracing::debug!(
            "Pruned {} proximity and {} scan entries; {} and {} remain",
            players,
            scans,
            self.proximity.len(),
            self.detector.cached_regions()
        );
    }

    // === PATTERN SWEEP ===

    fn run_sweep(&mut self) {
        if !self.detection_active || self.host.online_players() == 0 {
            tracing::debug!("Pattern sweep paused: detection off or nobody online");
            return;
        }

        let started = Instant::now();
        let host = Arc::clone(&self.host);
        let mut targets = Vec::new();

        'worlds: for world in host.worlds() {
            if !host.has_players(&world) {
                continue;
            }
            for region in host.loaded_regions(&world) {
                if self.cooldowns.is_protected(&region) {
                    continue;
                }
                match self.players_nearby(&region) {
                    Ok(true) => targets.push(region),
                    Ok(false) => {}
                    Err(e) => tracing::debug!("Skipping {} in sweep: {}", region, e),
                }
                if targets.len() >= SWEEP_REGIONS_PER_PASS {
                    break 'worlds;
                }
            }
        }

        // Fresh cache entries need no worker
        let mut stale = Vec::new();
        for region in targets {
            match self.detector.cached(&region, self.now) {
                Some(result) => {
                    if result.is_lag_machine(self.detector.min_components()) {
                        self.flag_lag_machine(&region);
                    }
                }
                None => stale.push(region),
            }
        }

        if !stale.is_empty() {
            tracing::debug!("Dispatching sweep of {} regions", stale.len());
            self.stats.sweeps_dispatched += 1;
            self.worker.dispatch_scans(
                host,
                stale,
                Arc::clone(self.detector.monitored()),
                ScanPurpose::Sweep,
                self.now,
            );
        }

        let elapsed = started.elapsed();
        if elapsed > SLOW_SWEEP {
            tracing::warn!("Pattern sweep selection took {:?}", elapsed);
        }
    }

    fn apply_outcome(&mut self, outcome: WorkerOutcome) {
        tracing::trace!("Applying scan job dispatched at tick {}", outcome.dispatched_at);
        match outcome.report {
            ScanReport::Scans {
                purpose: ScanPurpose::Sweep,
                results,
            } => self.apply_sweep_results(results),
            ScanReport::Scans {
                purpose: ScanPurpose::Expiry,
                results,
            } => self.apply_expiry_results(results),
            ScanReport::Survey { region, result } => self.apply_survey(region, result),
        }
    }

    fn apply_sweep_results(&mut self, results: Vec<(RegionKey, Result<ScanResult, HostError>)>) {
        for (region, result) in results {
            match result {
                Ok(scan) => {
                    self.detector.store(region.clone(), scan);
                    if self.detection_active
                        && !self.cooldowns.is_protected(&region)
                        && scan.is_lag_machine(self.detector.min_components())
                    {
                        self.flag_lag_machine(&region);
                    }
                }
                Err(e) => tracing::warn!("Sweep scan of {} failed: {}", region, e),
            }
        }
    }

    /// Block until every worker job reports, applying each outcome
    ///
    /// Applying one outcome may dispatch more work (a sweep hit is surveyed
    /// next), which is waited for as well. Returns the number of outcomes
    /// applied.
    pub fn await_scans(&mut self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut applied = 0;
        while self.worker.in_flight() > 0 {
            let outcomes = self.worker.wait(deadline.saturating_duration_since(Instant::now()));
            if outcomes.is_empty() {
                break;
            }
            applied += outcomes.len();
            for outcome in outcomes {
                self.apply_outcome(outcome);
            }
        }
        applied
    }

    // === ADMINISTRATION ===

    pub fn is_detection_active(&self) -> bool {
        self.detection_active
    }

    /// Turning detection off forgets every cooldown, marker, alert stamp and
    /// activity count; protection is kept
    pub fn set_detection_active(&mut self, active: bool) {
        if !active {
            self.cooldowns.clear_detections();
            self.activity.clear();
            self.pending_expiry.clear();
        }
        self.detection_active = active;
    }

    /// Force re-entry into active detection
    ///
    /// Clears all protection, turns detection on and synchronously flags
    /// every loaded, player-occupied region that holds a clock or has
    /// reached the activity threshold. Returns the number flagged.
    pub fn enable_detection(&mut self) -> usize {
        self.cooldowns.clear_protection();
        self.detection_active = true;

        let host = Arc::clone(&self.host);
        let mut flagged = 0;
        for world in host.worlds() {
            if !host.has_players(&world) {
                continue;
            }
            for region in host.loaded_regions(&world) {
                if !matches!(self.players_nearby(&region), Ok(true)) {
                    continue;
                }
                let busy = self.activity.get(&region) >= self.config.activity_threshold;
                if busy || self.detector.detect(&*host, &region, self.now) {
                    self.flag_lag_machine(&region);
                    flagged += 1;
                }
            }
        }
        tracing::info!("Detection enabled; {} regions flagged", flagged);
        flagged
    }

    /// Force every region back to normal and turn detection off
    ///
    /// Wires near players are re-placed with physics so circuits held at
    /// zero start again.
    pub fn disable_detection(&mut self) {
        self.cooldowns.clear_all();
        self.activity.clear();
        self.pending_expiry.clear();
        self.dismantler.clear();
        self.health.reset();
        self.detection_active = false;

        let repowered = self.repower_wires();
        tracing::info!(
            "Detection disabled; all cooldowns cleared, {} wires refreshed",
            repowered
        );
    }

    fn repower_wires(&mut self) -> usize {
        let host = Arc::clone(&self.host);
        let mut refreshed = 0;
        for world in host.worlds() {
            if !host.has_players(&world) {
                continue;
            }
            let Ok((min_y, max_y)) = host.height_bounds(&world) else {
                continue;
            };
            for region in host.loaded_regions(&world) {
                if !matches!(self.players_nearby(&region), Ok(true)) {
                    continue;
                }
                for (x, z) in region.columns() {
                    for y in min_y..=max_y {
                        let pos = BlockPos::new(x, y, z);
                        if matches!(host.block_at(&world, pos), Ok(BlockKind::RedstoneWire))
                            && host.refresh_block(&world, pos, true).is_ok()
                        {
                            refreshed += 1;
                        }
                    }
                }
            }
        }
        refreshed
    }

    /// Full reset: cooldowns, protection, counters and every cache
    ///
    /// Detection is left off and the pattern sweep stays paused until the
    /// next [`start`](Self::start).
    pub fn reset(&mut self) {
        if self.timers.cancel(EngineTimer::PatternSweep) {
            tracing::info!("Pattern sweep cancelled");
        }
        self.cooldowns.clear_all();
        self.activity.clear();
        self.pending_expiry.clear();
        self.dismantler.clear();
        self.limiter.reset();
        self.proximity.clear();
        self.detector.clear();
        self.health.reset();
        self.detection_active = false;
        tracing::info!("All redstone cooldowns, protection and caches reset");
    }

    pub fn set_protected(&mut self, region: &RegionKey, protected: bool) {
        self.cooldowns.set_protected(region, protected);
    }

    pub fn is_protected(&self, region: &RegionKey) -> bool {
        self.cooldowns.is_protected(region)
    }

    pub fn is_globally_disabled(&self) -> bool {
        self.health.is_globally_disabled()
    }

    pub fn set_alerts_enabled(&mut self, observer: &str, enabled: bool) {
        self.notifier.set_alerts_enabled(observer, enabled);
    }

    pub fn alerts_enabled(&self, observer: &str) -> bool {
        self.notifier.alerts_enabled(observer)
    }

    // === INSPECTION ===

    pub fn now(&self) -> Tick {
        self.now
    }

    pub fn config(&self) -> &RedstoneConfig {
        &self.config
    }

    pub fn host(&self) -> &Arc<H> {
        &self.host
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn region_status(&self, region: &RegionKey) -> RegionStatus {
        RegionStatus {
            phase: self.cooldowns.phase(region, self.now),
            lag_machine: self.cooldowns.is_lag_machine(region),
            activity: self.activity.get(region),
            updates_this_tick: self.limiter.count(region),
        }
    }

    pub fn cooldown_until(&self, region: &RegionKey) -> Option<Tick> {
        self.cooldowns.cooldown_until(region)
    }

    pub fn is_lag_machine(&self, region: &RegionKey) -> bool {
        self.cooldowns.is_lag_machine(region)
    }

    pub fn lag_machine_count(&self) -> usize {
        self.cooldowns.lag_machine_count()
    }

    pub fn pending_dismantle_jobs(&self) -> usize {
        self.dismantler.pending_jobs()
    }

    /// Worker jobs dispatched but not yet applied
    pub fn scans_in_flight(&self) -> usize {
        self.worker.in_flight()
    }

    pub fn scans_performed(&self) -> u64 {
        self.detector.scans_performed()
    }
}
