//! Static region set
//!
//! Regions are fixed at startup. [`RegionSet`] keeps them sorted by name, and
//! that order drives fan-out order and nearest-region tie-breaks.

use crate::common::{encode_name, Error, Result};
use crate::geo::Coordinates;
use serde::{Deserialize, Serialize};

/// One deployment location with a storage endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    /// Storage node base URL, without trailing slash
    pub base_address: String,
    pub coordinates: Coordinates,
}

impl Region {
    /// Public URL of `object` on this region's storage node
    pub fn object_url(&self, object: &str) -> String {
        format!("{}/files/{}", self.base_address, encode_name(object))
    }

    pub fn upload_url(&self) -> String {
        format!("{}/upload", self.base_address)
    }

    pub fn delete_url(&self) -> String {
        format!("{}/delete", self.base_address)
    }
}

/// Region entry as written in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    pub name: String,
    pub base_address: String,
    pub lat: f64,
    pub lon: f64,
}

impl RegionConfig {
    pub fn new(name: &str, base_address: &str, lat: f64, lon: f64) -> Self {
        Self {
            name: name.to_string(),
            base_address: base_address.to_string(),
            lat,
            lon,
        }
    }
}

/// Immutable, name-ordered set of regions
#[derive(Debug, Clone)]
pub struct RegionSet {
    regions: Vec<Region>,
}

impl RegionSet {
    pub fn new(configs: &[RegionConfig]) -> Result<Self> {
        if configs.is_empty() {
            return Err(Error::InvalidConfig("at least one region is required".into()));
        }

        let mut regions = Vec::with_capacity(configs.len());
        for cfg in configs {
            let name = cfg.name.trim();
            if name.is_empty() {
                return Err(Error::InvalidConfig("region name cannot be empty".into()));
            }

            let base_address = cfg.base_address.trim().trim_end_matches('/').to_string();
            let parsed = reqwest::Url::parse(&base_address).map_err(|e| {
                Error::InvalidConfig(format!("region {}: invalid base address: {}", name, e))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(Error::InvalidConfig(format!(
                    "region {}: base address must be http(s)",
                    name
                )));
            }

            let coordinates = Coordinates::new(cfg.lat, cfg.lon)
                .map_err(|e| Error::InvalidConfig(format!("region {}: {}", name, e)))?;

            regions.push(Region {
                name: name.to_string(),
                base_address,
                coordinates,
            });
        }

        regions.sort_by(|a, b| a.name.cmp(&b.name));
        if let Some(dup) = regions.windows(2).find(|w| w[0].name == w[1].name) {
            return Err(Error::InvalidConfig(format!(
                "duplicate region name: {}",
                dup[0].name
            )));
        }

        Ok(Self { regions })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.regions.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// The three reference regions
pub fn default_regions() -> Vec<RegionConfig> {
    vec![
        RegionConfig::new("Singapore", "http://35.197.153.160:5001", 1.3521, 103.8198),
        RegionConfig::new("New York", "http://34.174.158.135:5002", 40.7128, -74.0060),
        RegionConfig::new("London", "http://34.147.235.178:5003", 51.5074, -0.1278),
    ]
}
