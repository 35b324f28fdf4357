//! Host world access

pub mod host;
pub mod memory;

pub use host::WorldHost;
pub use memory::{HostMutation, MemoryWorld};
