//! Configuration for the geocdn coordinator
//!
//! Sources, lowest priority first:
//! 1. built-in defaults
//! 2. TOML file named by `GEOCDN_CONFIG` (default `geocdn.toml`, optional)
//! 3. `GEOCDN__*` environment variables
//! 4. command-line flags (applied by the binaries)

use crate::common::region::{default_regions, RegionConfig};
use crate::common::Result;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "GEOCDN_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "geocdn.toml";

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bind address for HTTP API
    pub bind_addr: SocketAddr,

    /// RocksDB path for the object registry
    pub db_path: PathBuf,

    /// Registry backend
    pub registry: RegistryBackend,

    /// Storage regions (fixed for the process lifetime)
    pub regions: Vec<RegionConfig>,

    /// Base URL of the ip-api compatible geolocation service
    pub geo_endpoint: String,

    /// Timeout for one geolocation lookup
    pub geo_timeout_ms: u64,

    /// Timeout for one call to one storage node
    pub region_timeout_ms: u64,

    /// Budget for a whole upload or delete fan-out
    pub request_timeout_ms: u64,

    /// Largest accepted upload body
    pub max_upload_bytes: usize,

    /// How uploads and deletes reach the regions
    pub fanout: FanoutMode,

    /// What to do when an uploaded name already exists
    pub on_duplicate: DuplicatePolicy,

    /// Logging level
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryBackend {
    Rocksdb,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanoutMode {
    /// One region after another in region order; stop at the first failure
    Sequential,
    /// All regions concurrently; commit only if every leg succeeded
    Parallel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Refuse the upload before any region is contacted
    Reject,
    /// Re-replicate and replace the existing record
    Overwrite,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            db_path: PathBuf::from("./geocdn-data"),
            registry: RegistryBackend::Rocksdb,
            regions: default_regions(),
            geo_endpoint: "http://ip-api.com".to_string(),
            geo_timeout_ms: 3_000,
            region_timeout_ms: 10_000,
            request_timeout_ms: 60_000,
            max_upload_bytes: 64 * 1024 * 1024,
            fanout: FanoutMode::Sequential,
            on_duplicate: DuplicatePolicy::Reject,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load defaults, then the config file, then environment overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("GEOCDN")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_ms == 0 || self.region_timeout_ms == 0 || self.geo_timeout_ms == 0
        {
            return Err(crate::Error::InvalidConfig(
                "timeouts must be greater than zero".into(),
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err(crate::Error::InvalidConfig(
                "max_upload_bytes must be greater than zero".into(),
            ));
        }
        crate::common::RegionSet::new(&self.regions)?;
        Ok(())
    }

    pub fn geo_timeout(&self) -> Duration {
        Duration::from_millis(self.geo_timeout_ms)
    }

    pub fn region_timeout(&self) -> Duration {
        Duration::from_millis(self.region_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
