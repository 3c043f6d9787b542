//! Client address → coordinates resolution
//!
//! The production locator talks to an ip-api compatible service:
//! `GET {endpoint}/json/{address}` answering a JSON object with numeric
//! `lat` and `lon` fields. One call per request, no retries, no caching.

use super::Coordinates;
use crate::common::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Resolves a network address to coordinates.
#[async_trait]
pub trait GeoLocator: Send + Sync {
    async fn locate(&self, address: &str) -> Result<Coordinates>;
}

/// ip-api compatible HTTP locator
pub struct IpApiLocator {
    client: reqwest::Client,
    endpoint: String,
}

impl IpApiLocator {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, endpoint))
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Self { client, endpoint }
    }
}

#[async_trait]
impl GeoLocator for IpApiLocator {
    async fn locate(&self, address: &str) -> Result<Coordinates> {
        let address = address.trim();
        if address.is_empty() {
            return Err(Error::GeoLookup("empty client address".into()));
        }

        let url = format!(
            "{}/json/{}",
            self.endpoint,
            crate::common::encode_name(address)
        );
        tracing::debug!(client = %address, %url, "Fetching geolocation");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::GeoLookup(format!("request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::GeoLookup(format!("service returned {}", status)));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| Error::GeoLookup(format!("failed to read response: {}", e)))?;
        let value: serde_json::Value = serde_json::from_slice(&body)
            .map_err(|e| Error::GeoLookup(format!("invalid JSON response: {}", e)))?;

        let coords = parse_coordinates(&value)?;
        tracing::debug!(client = %address, coordinates = %coords, "Resolved client location");
        Ok(coords)
    }
}

/// Extract numeric `lat`/`lon` from a geolocation response body.
pub fn parse_coordinates(value: &serde_json::Value) -> Result<Coordinates> {
    let lat = value.get("lat").and_then(serde_json::Value::as_f64);
    let lon = value.get("lon").and_then(serde_json::Value::as_f64);

    match (lat, lon) {
        (Some(lat), Some(lon)) => Coordinates::new(lat, lon).map_err(|e| Error::GeoLookup(e.to_string())),
        _ => {
            let detail = value
                .get("message")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("missing lat/lon");
            Err(Error::GeoLookup(format!(
                "failed to extract lat/lon: {}",
                detail
            )))
        }
    }
}
