//! Region identity and region-keyed stores

pub mod region;
pub mod ttl_cache;

pub use region::{RegionKey, REGION_SIZE};
pub use ttl_cache::TtlCache;
