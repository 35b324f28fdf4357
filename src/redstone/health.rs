//! Server tick-rate monitoring and the global redstone kill-switch

use crate::core::config::HEALTH_SAMPLE_INTERVAL;
use crate::core::types::Tick;
use crate::world::WorldHost;

/// Kill-switch edge produced by a health evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HealthTransition {
    /// Rate fell below the critical threshold; circuits are now disabled
    Critical { tps: f64 },
    /// Rate climbed back to the recovery threshold; circuits resume
    Restored { tps: f64 },
}

/// Two-threshold switch over the sampled tick rate
///
/// Sets below `critical`, clears only at or above `recovery`. Anything in
/// between leaves the switch where it is.
#[derive(Debug, Clone)]
pub struct HealthMonitor {
    critical: f64,
    recovery: f64,
    globally_disabled: bool,
    cached_tps: f64,
    last_sample: Option<Tick>,
}

impl HealthMonitor {
    pub fn new(critical: f64, recovery: f64) -> Self {
        Self {
            critical,
            recovery,
            globally_disabled: false,
            cached_tps: 20.0,
            last_sample: None,
        }
    }

    pub fn is_globally_disabled(&self) -> bool {
        self.globally_disabled
    }

    /// Last successfully sampled rate
    pub fn last_tps(&self) -> f64 {
        self.cached_tps
    }

    /// Tick rate, sampled at most once per [`HEALTH_SAMPLE_INTERVAL`]
    ///
    /// A failed sample keeps the previous value.
    pub fn cached_tps<H: WorldHost + ?Sized>(&mut self, host: &H, now: Tick) -> f64 {
        let stale = self
            .last_sample
            .map_or(true, |at| now.saturating_sub(at) >= HEALTH_SAMPLE_INTERVAL);
        if stale {
            match host.tick_rate() {
                Ok(tps) => self.cached_tps = tps,
                Err(e) => tracing::warn!(
                    "Tick rate sample failed ({}); keeping {:.2}",
                    e,
                    self.cached_tps
                ),
            }
            self.last_sample = Some(now);
        }
        self.cached_tps
    }

    /// Sample the host and apply the result
    pub fn sample<H: WorldHost + ?Sized>(
        &mut self,
        host: &H,
        now: Tick,
    ) -> Option<HealthTransition> {
        let tps = self.cached_tps(host, now);
        self.evaluate(tps)
    }

    /// Apply one tick-rate reading to the switch
    pub fn evaluate(&mut self, tps: f64) -> Option<HealthTransition> {
        if !self.globally_disabled && tps < self.critical {
            self.globally_disabled = true;
            Some(HealthTransition::Critical { tps })
        } else if self.globally_disabled && tps >= self.recovery {
            self.globally_disabled = false;
            Some(HealthTransition::Restored { tps })
        } else {
            None
        }
    }

    /// Clear the switch without a recovery reading (operator reset)
    pub fn reset(&mut self) {
        self.globally_disabled = false;
    }
}
