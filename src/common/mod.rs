//! Common utilities and types shared across geocdn

pub mod config;
pub mod error;
pub mod region;
pub mod tracing_middleware;
pub mod utils;

pub use config::{Config, DuplicatePolicy, FanoutMode, RegistryBackend};
pub use error::{Error, Result};
pub use region::{default_regions, Region, RegionConfig, RegionSet};
pub use utils::{encode_name, format_bytes, timestamp_now, validate_name};
