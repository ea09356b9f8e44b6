/// Platform-specific functionality: host/volume descriptors, attribute
/// flags and timestamps.
pub mod attributes;
pub mod host;

pub use attributes::{attributes, timestamps};
pub use host::{default_workers, host_info, volume_for};
