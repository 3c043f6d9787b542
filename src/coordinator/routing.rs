//! Nearest-region routing
//!
//! Client address → coordinates (geolocation service) → nearest region
//! (haversine) → that region's URL. There is no fallback region: if the
//! client cannot be located, or the chosen region has no URL, the request
//! fails.

use crate::common::{Error, Region, RegionSet, Result};
use crate::coordinator::registry::ObjectRecord;
use crate::geo::{self, GeoLocator};
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Best-effort client address: first `X-Forwarded-For` entry, else the peer IP.
pub fn client_address(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    let forwarded = headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match forwarded {
        Some(addr) => Some(strip_port(addr)),
        None => peer.map(|addr| addr.ip().to_string()),
    }
}

/// Drop a `:port` suffix from `host:port` or `[v6]:port`.
pub fn strip_port(addr: &str) -> String {
    match addr.parse::<SocketAddr>() {
        Ok(sock) => sock.ip().to_string(),
        Err(_) => addr.to_string(),
    }
}

/// Where one object should be fetched from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NearestLocation {
    pub region: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NearestEntry {
    pub filename: String,
    pub url: String,
}

/// Every object projected onto the client's nearest region
#[derive(Debug, Clone)]
pub struct NearestListing {
    pub region: String,
    pub entries: Vec<NearestEntry>,
}

pub struct RoutingResolver {
    regions: Arc<RegionSet>,
    locator: Arc<dyn GeoLocator>,
}

impl RoutingResolver {
    pub fn new(regions: Arc<RegionSet>, locator: Arc<dyn GeoLocator>) -> Self {
        Self { regions, locator }
    }

    /// Region closest to `client`; ties go to the region first in name order.
    pub async fn nearest_region(&self, client: &str) -> Result<&Region> {
        let coords = self.locator.locate(client).await.map_err(|e| match e {
            Error::GeoLookup(reason) => Error::GeoLookup(reason),
            other => Error::GeoLookup(other.to_string()),
        })?;

        let candidates = self
            .regions
            .iter()
            .map(|r| (r.name.as_str(), r.coordinates));
        let (name, distance_km) = geo::nearest(coords, candidates)
            .ok_or_else(|| Error::Internal("no regions configured".into()))?;

        tracing::debug!(
            client = %client,
            coordinates = %coords,
            region = %name,
            distance_km,
            "Selected nearest region"
        );

        self.regions
            .get(name)
            .ok_or_else(|| Error::Internal(format!("unknown region {}", name)))
    }

    /// URL of the copy nearest to `client`.
    pub async fn resolve_nearest(
        &self,
        client: &str,
        locations: &BTreeMap<String, String>,
    ) -> Result<NearestLocation> {
        let region = self.nearest_region(client).await?;
        let url = locations
            .get(&region.name)
            .ok_or_else(|| Error::NoRegionUrl(region.name.clone()))?;

        Ok(NearestLocation {
            region: region.name.clone(),
            url: url.clone(),
        })
    }

    /// Project every record onto the nearest region, keeping record order.
    ///
    /// The client is located once per call, not once per record. Records
    /// missing a URL for that region are skipped.
    pub async fn list_for_nearest(
        &self,
        client: &str,
        records: &[ObjectRecord],
    ) -> Result<NearestListing> {
        let region = self.nearest_region(client).await?;

        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            match record.locations.get(&region.name) {
                Some(url) => entries.push(NearestEntry {
                    filename: record.name.clone(),
                    url: url.clone(),
                }),
                None => tracing::warn!(
                    object = %record.name,
                    region = %region.name,
                    "Record has no URL for nearest region, skipping"
                ),
            }
        }

        Ok(NearestListing {
            region: region.name.clone(),
            entries,
        })
    }
}
