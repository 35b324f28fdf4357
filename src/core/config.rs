//! Engine configuration with documented constants
//!
//! Tunables a server operator may change are fields of [`RedstoneConfig`] and
//! load from TOML. Fixed timings that only make sense as a set are the
//! constants at the top of this module.

use std::path::Path;

use serde::Deserialize;

use crate::core::error::ConfigError;
use crate::core::types::{seconds_to_ticks, BlockKind, Tick};

// === FIXED TIMINGS (ticks) ===

/// How long a player-proximity answer is trusted
///
/// Proximity is asked on nearly every gate decision, so even 4 ticks
/// (200 ms) removes almost all of the player-list walks.
pub const PLAYER_CACHE_TTL: Tick = 4;

/// How long a pattern-scan result is trusted (10 s)
pub const SCAN_CACHE_TTL: Tick = 200;

/// Entries older than this are removed by the cache prune sweep (60 s)
pub const CACHE_MAX_AGE: Tick = 1200;

/// Period of the cache prune sweep (60 s)
pub const CACHE_PRUNE_INTERVAL: Tick = 1200;

/// Lifetime of one activity increment before its scheduled decrement (10 s)
pub const ACTIVITY_WINDOW: Tick = 200;

/// Minimum gap between detection alerts in one 3x3 neighborhood (300 s)
pub const NOTIFICATION_COOLDOWN: Tick = 6000;

/// Tick-rate sampling period and sample cache window (1 s)
pub const HEALTH_SAMPLE_INTERVAL: Tick = 20;

/// Period of the cooldown expiration check
pub const COOLDOWN_CHECK_INTERVAL: Tick = 20;

/// Fastest allowed period for the background pattern sweep
pub const MIN_SWEEP_INTERVAL: Tick = 600;

/// Regions handed to the scan workers per sweep
pub const SWEEP_REGIONS_PER_PASS: usize = 2;

/// Destructive mutations per batch step
pub const DISMANTLE_BATCH_SIZE: usize = 3;

/// Ticks between two batch steps of the same job
pub const DISMANTLE_BATCH_DELAY: Tick = 5;

/// Operator-facing configuration for the redstone engine
///
/// Keys are kebab-case in TOML; every key is optional and falls back to the
/// value in [`Default`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RedstoneConfig {
    // === UPDATE GATE ===
    /// Master switch; when false every update is allowed untouched
    pub optimization_enabled: bool,

    /// Accepted circuit updates per region per tick
    ///
    /// A busy but legitimate build (item sorter, door bank) stays well
    /// under 200; a clock farm saturates it within a few ticks.
    pub max_updates_per_tick: u32,

    /// Blocks whose updates skip activity and per-tick accounting
    pub whitelist_blocks: Vec<BlockKind>,

    // === PLAYER PROXIMITY ===
    /// Deny updates in regions nobody is near
    pub player_radius_check: bool,

    /// Radius in blocks around the region's center block
    pub player_radius: u32,

    // === LAG DETECTION ===
    /// Initial state of lag detection; toggled at runtime by operators
    pub lag_detection_enabled: bool,

    /// Accounted updates inside one activity window that flag a region
    ///
    /// Each accounted update lives for [`ACTIVITY_WINDOW`] ticks, so the
    /// default 3600 means "18 updates per tick sustained for 10 s".
    pub activity_threshold: u32,

    /// Cooldown applied to a flagged region and its neighbors
    pub cooldown_seconds: u64,

    /// Minimum monitored components before a loop counts as a machine
    ///
    /// Guards against short two-element loops that are normal in doors
    /// and pulse extenders.
    pub min_redstone_components: u32,

    /// Blocks counted as circuit components by the scanner
    pub monitored_blocks: Vec<BlockKind>,

    // === DISMANTLING ===
    /// Physically remove components of a detected machine
    pub destroy_components: bool,

    /// Upper bound on removals per detection
    pub max_destroyed_components: u32,

    /// Seed for the dismantler shuffle; entropy when absent
    pub rng_seed: Option<u64>,

    // === PATTERN SWEEP ===
    /// Run the background scan of player-occupied regions
    pub pattern_scan_enabled: bool,

    /// Requested sweep period, clamped up to [`MIN_SWEEP_INTERVAL`]
    pub pattern_scan_interval_ticks: Tick,

    // === SERVER HEALTH ===
    /// Deny updates while the cached tick rate is below `low_tps_threshold`
    pub low_tps_throttle: bool,

    /// Low-rate throttle threshold; also the recovery threshold for the
    /// global kill-switch
    pub low_tps_threshold: f64,

    /// Tick rate below which all circuit simulation is disabled
    pub critical_tps_threshold: f64,

    // === NOTIFICATIONS ===
    /// Mirror alerts to the log
    pub console_notifications: bool,

    pub messages: AlertMessages,
}

/// Alert templates
///
/// Placeholders: `{world} {x} {y} {z} {count} {type}` for detections and
/// `{tps}` for health alerts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AlertMessages {
    pub lag_machine_detected: Vec<String>,
    pub tps_critical: Vec<String>,
    pub tps_restored: Vec<String>,
}

impl Default for AlertMessages {
    fn default() -> Self {
        Self {
            lag_machine_detected: vec![
                "Lag machine ({type}) found in {world} at {x}, {y}, {z}; removed {count} components"
                    .to_string(),
            ],
            tps_critical: vec![
                "Tick rate critical ({tps}); redstone disabled globally".to_string(),
            ],
            tps_restored: vec!["Tick rate recovered ({tps}); redstone re-enabled".to_string()],
        }
    }
}

impl Default for RedstoneConfig {
    fn default() -> Self {
        Self {
            optimization_enabled: true,
            max_updates_per_tick: 200,
            whitelist_blocks: Vec::new(),

            player_radius_check: true,
            player_radius: 128,

            lag_detection_enabled: true,
            activity_threshold: 3600,
            cooldown_seconds: 30,
            min_redstone_components: 10,
            monitored_blocks: [
                "REDSTONE_WIRE",
                "REDSTONE_TORCH",
                "REPEATER",
                "COMPARATOR",
                "OBSERVER",
                "PISTON",
                "STICKY_PISTON",
                "REDSTONE_BLOCK",
            ]
            .into_iter()
            .map(BlockKind::from)
            .collect(),

            destroy_components: false,
            max_destroyed_components: 3,
            rng_seed: None,

            pattern_scan_enabled: true,
            pattern_scan_interval_ticks: 6000,

            low_tps_throttle: false,
            low_tps_threshold: 10.0,
            critical_tps_threshold: 5.0,

            console_notifications: true,
            messages: AlertMessages::default(),
        }
    }
}

impl RedstoneConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: RedstoneConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn cooldown_ticks(&self) -> Tick {
        seconds_to_ticks(self.cooldown_seconds)
    }

    /// Tick rate at which the global kill-switch clears
    pub fn recovery_tps_threshold(&self) -> f64 {
        self.low_tps_threshold
    }

    pub fn sweep_interval(&self) -> Tick {
        self.pattern_scan_interval_ticks.max(MIN_SWEEP_INTERVAL)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Hysteresis needs a gap between the two thresholds
        if self.critical_tps_threshold >= self.low_tps_threshold {
            return Err(ConfigError::Invalid(format!(
                "critical-tps-threshold ({}) should be < low-tps-threshold ({})",
                self.critical_tps_threshold, self.low_tps_threshold
            )));
        }

        if self.max_updates_per_tick == 0 {
            return Err(ConfigError::Invalid(
                "max-updates-per-tick must be positive".into(),
            ));
        }

        if self.activity_threshold == 0 {
            return Err(ConfigError::Invalid(
                "activity-threshold must be positive".into(),
            ));
        }

        if self.cooldown_seconds == 0 {
            return Err(ConfigError::Invalid(
                "cooldown-seconds must be positive".into(),
            ));
        }

        if self.player_radius_check && self.player_radius == 0 {
            return Err(ConfigError::Invalid(
                "player-radius must be positive when the radius check is enabled".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = RedstoneConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cooldown_ticks(), 600);
        assert_eq!(config.sweep_interval(), 6000);
        assert!(config.monitored_blocks.contains(&BlockKind::Observer));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RedstoneConfig::from_toml_str(
            r#"
            max-updates-per-tick = 50
            destroy-components = true
            whitelist-blocks = ["hopper"]
            rng-seed = 7

            [messages]
            tps-critical = ["down to {tps}"]
            "#,
        )
        .unwrap();

        assert_eq!(config.max_updates_per_tick, 50);
        assert!(config.destroy_components);
        assert_eq!(config.whitelist_blocks, vec![BlockKind::from("HOPPER")]);
        assert_eq!(config.rng_seed, Some(7));
        assert_eq!(config.messages.tps_critical, vec!["down to {tps}".to_string()]);
        assert_eq!(config.messages.tps_restored.len(), 1);
        assert_eq!(config.player_radius, 128);
    }

    #[test]
    fn test_sweep_interval_is_clamped() {
        let config = RedstoneConfig {
            pattern_scan_interval_ticks: 20,
            ..Default::default()
        };
        assert_eq!(config.sweep_interval(), MIN_SWEEP_INTERVAL);
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let result = RedstoneConfig::from_toml_str(
            r#"
            critical-tps-threshold = 12.0
            low-tps-threshold = 10.0
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let result = RedstoneConfig::from_toml_str("max-updates-per-tick = \"lots\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
