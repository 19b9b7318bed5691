pub mod capabilities;
pub mod data;

pub use capabilities::CapabilityCache;
pub use data::{CacheState, DataService};
