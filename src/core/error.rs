use thiserror::Error;

use crate::core::types::EntityId;
use crate::spatial::RegionKey;

/// Failures reported by the host world while the engine queries or mutates it
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
    #[error("Region not loaded: {0}")]
    RegionUnloaded(RegionKey),

    #[error("Entity no longer exists: {0}")]
    EntityGone(EntityId),

    #[error("Unknown world: {0}")]
    UnknownWorld(String),

    #[error("Tick rate unavailable")]
    TickRateUnavailable,
}

/// Configuration could not be loaded or is inconsistent
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum WardenError {
    #[error("Host error: {0}")]
    Host(#[from] HostError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, WardenError>;
