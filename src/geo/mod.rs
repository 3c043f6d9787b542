//! Geographic primitives
//!
//! - [`Coordinates`]: a validated latitude/longitude pair in degrees
//! - [`distance`]: haversine distance and nearest-candidate selection
//! - [`lookup`]: client address → coordinates via an external service

pub mod distance;
pub mod lookup;

pub use distance::{haversine_km, nearest, EARTH_RADIUS_KM};
pub use lookup::{GeoLocator, IpApiLocator};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Latitude/longitude in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    /// Build coordinates, rejecting values outside [-90,90] / [-180,180].
    pub fn new(lat: f64, lon: f64) -> crate::Result<Self> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(crate::Error::InvalidInput(format!(
                "latitude out of range: {}",
                lat
            )));
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(crate::Error::InvalidInput(format!(
                "longitude out of range: {}",
                lon
            )));
        }
        Ok(Self { lat, lon })
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.lat, self.lon)
    }
}
