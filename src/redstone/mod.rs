//! Redstone lag-machine detection and throttling
//!
//! [`RedstoneEngine`] is the entry point; the other modules are its parts
//! and are usable on their own.

pub mod cooldown;
pub mod dismantle;
pub mod engine;
pub mod health;
pub mod limiter;
pub mod notify;
pub mod scanner;
pub mod wiring;
pub mod worker;

pub use cooldown::{CooldownStore, RegionPhase};
pub use dismantle::Dismantler;
pub use engine::{EngineStats, GateDecision, RedstoneEngine, RegionStatus};
pub use health::{HealthMonitor, HealthTransition};
pub use limiter::{ActivityCounter, UpdateLimiter};
pub use notify::{Alert, Notifier};
pub use scanner::{find_center, scan_region, ClockDetector, MonitoredSet, ScanResult};
pub use worker::{MachineSurvey, ScanPurpose, ScanReport, ScanWorker, WorkerOutcome};
