pub mod config;
pub mod error;
pub mod scheduler;
pub mod types;

pub use config::RedstoneConfig;
pub use error::{ConfigError, HostError, WardenError};
