//! Lag Warden - redstone lag-machine detection and throttling

pub mod core;
pub mod redstone;
pub mod spatial;
pub mod world;
