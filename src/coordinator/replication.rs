//! Replication coordinator
//!
//! Upload and delete both run in two phases:
//! 1. fan-out: the operation is sent to every region, producing one
//!    [`Leg`] per region
//! 2. commit: the registry is touched only if every leg succeeded
//!
//! A failed leg aborts the operation with the first failure in region order.
//! Nothing is rolled back on the storage nodes: regions offer no undo, so a
//! registry failure after a full fan-out is surfaced as
//! [`Error::MetadataCommit`] and the blobs stay orphaned until an operator
//! cleans them up.

use crate::common::{
    format_bytes, timestamp_now, validate_name, DuplicatePolicy, Error, FanoutMode, Region,
    RegionSet, Result,
};
use crate::coordinator::node_client::RegionTransport;
use crate::coordinator::registry::{ObjectRecord, RegistryStore};
use bytes::Bytes;
use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Result of one region's part of a fan-out
#[derive(Debug)]
pub enum Leg<T> {
    Done(T),
    Failed(Error),
    /// Not attempted because an earlier leg failed
    Skipped,
}

/// Per-region results of a fan-out, in region order
#[derive(Debug)]
pub struct FanoutOutcome<T> {
    legs: Vec<(String, Leg<T>)>,
}

/// Upload fan-out: region → stored URL
pub type ReplicationOutcome = FanoutOutcome<String>;

impl<T> FanoutOutcome<T> {
    pub fn legs(&self) -> &[(String, Leg<T>)] {
        &self.legs
    }

    /// Region → value if every leg succeeded, otherwise the first failure.
    pub fn into_result(self) -> Result<BTreeMap<String, T>> {
        let mut done = BTreeMap::new();
        for (region, leg) in self.legs {
            match leg {
                Leg::Done(value) => {
                    done.insert(region, value);
                }
                Leg::Failed(err) => return Err(err),
                Leg::Skipped => {
                    return Err(Error::Internal(format!(
                        "region {} skipped without a recorded failure",
                        region
                    )))
                }
            }
        }
        Ok(done)
    }
}

/// Names with an upload or delete currently fanning out
#[derive(Default)]
struct InFlight {
    names: Mutex<HashSet<String>>,
}

impl InFlight {
    /// Reserve `name` until the returned guard is dropped; `None` if taken.
    fn reserve(&self, name: &str) -> Result<Option<Reservation<'_>>> {
        let mut names = self
            .names
            .lock()
            .map_err(|_| Error::Internal("in-flight set poisoned".into()))?;
        if !names.insert(name.to_string()) {
            return Ok(None);
        }
        Ok(Some(Reservation {
            in_flight: self,
            name: name.to_string(),
        }))
    }
}

struct Reservation<'a> {
    in_flight: &'a InFlight,
    name: String,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        let mut names = self
            .in_flight
            .names
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        names.remove(&self.name);
    }
}

/// Fans uploads and deletes out to every region and commits metadata last.
///
/// A name is reserved for the whole operation, so two uploads (or an upload
/// and a delete) of the same name never fan out at the same time.
pub struct ReplicationCoordinator {
    regions: Arc<RegionSet>,
    transport: Arc<dyn RegionTransport>,
    registry: Arc<dyn RegistryStore>,
    fanout: FanoutMode,
    on_duplicate: DuplicatePolicy,
    request_timeout: Duration,
    in_flight: InFlight,
}

impl ReplicationCoordinator {
    pub fn new(
        regions: Arc<RegionSet>,
        transport: Arc<dyn RegionTransport>,
        registry: Arc<dyn RegistryStore>,
    ) -> Self {
        Self {
            regions,
            transport,
            registry,
            fanout: FanoutMode::Sequential,
            on_duplicate: DuplicatePolicy::Reject,
            request_timeout: Duration::from_secs(60),
            in_flight: InFlight::default(),
        }
    }

    pub fn with_fanout(mut self, fanout: FanoutMode) -> Self {
        self.fanout = fanout;
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.on_duplicate = policy;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn regions(&self) -> &RegionSet {
        &self.regions
    }

    /// Replicate `content` to every region and record its locations.
    pub async fn replicate(&self, name: &str, content: Bytes) -> Result<ObjectRecord> {
        validate_name(name)?;

        let Some(_reservation) = self.in_flight.reserve(name)? else {
            return Err(match self.on_duplicate {
                DuplicatePolicy::Reject => Error::AlreadyExists(name.to_string()),
                DuplicatePolicy::Overwrite => Error::Busy(name.to_string()),
            });
        };

        if self.on_duplicate == DuplicatePolicy::Reject && self.registry.contains(name)? {
            return Err(Error::AlreadyExists(name.to_string()));
        }

        let size = content.len() as u64;
        tracing::info!(
            object = %name,
            size = %format_bytes(size),
            regions = self.regions.len(),
            "Replicating object"
        );

        let transport = &self.transport;
        let outcome = self
            .bounded("upload", name, self.fan_out(|region| {
                let content = content.clone();
                async move {
                    transport.store(region, name, content).await?;
                    Ok(region.object_url(name))
                }
            }))
            .await?;

        self.log_outcome("upload", name, &outcome);
        let locations = outcome.into_result()?;

        let record = ObjectRecord {
            name: name.to_string(),
            locations,
            size,
            created_at: timestamp_now(),
        };

        let committed = match self.on_duplicate {
            DuplicatePolicy::Reject => self.registry.add(&record),
            DuplicatePolicy::Overwrite => self.registry.replace(&record),
        };
        if let Err(e) = committed {
            if matches!(e, Error::AlreadyExists(_)) {
                tracing::warn!(object = %name, "Record appeared during fan-out");
                return Err(e);
            }
            tracing::error!(
                object = %name,
                error = %e,
                "Metadata commit failed after all regions stored the object; regional blobs are orphaned, remove them with a forced delete"
            );
            return Err(Error::MetadataCommit {
                name: name.to_string(),
                reason: e.to_string(),
            });
        }

        tracing::info!(object = %name, "Object replicated to all regions");
        Ok(record)
    }

    /// Delete `name` from every region, then drop its record.
    pub async fn delete(&self, name: &str) -> Result<()> {
        self.remove_everywhere(name, false).await
    }

    /// Delete `name` from every region whether or not it has a record.
    ///
    /// Cleans up blobs left behind by an aborted upload or a failed metadata
    /// commit. The record, if any, is dropped once every region succeeded.
    pub async fn purge(&self, name: &str) -> Result<()> {
        self.remove_everywhere(name, true).await
    }

    async fn remove_everywhere(&self, name: &str, force: bool) -> Result<()> {
        validate_name(name)?;

        let Some(_reservation) = self.in_flight.reserve(name)? else {
            return Err(Error::Busy(name.to_string()));
        };

        // unknown names never reach the regions, unless forced
        let recorded = match self.registry.get(name) {
            Ok(_) => true,
            Err(Error::NotFound(_)) if force => false,
            Err(e) => return Err(e),
        };

        tracing::info!(object = %name, regions = self.regions.len(), force, "Deleting object");

        let transport = &self.transport;
        let outcome = self
            .bounded("delete", name, self.fan_out(|region| async move {
                transport.remove(region, name).await
            }))
            .await?;

        self.log_outcome("delete", name, &outcome);
        outcome.into_result()?;

        if !recorded {
            tracing::info!(object = %name, "Unrecorded object purged from all regions");
            return Ok(());
        }

        if let Err(e) = self.registry.delete(name) {
            tracing::error!(
                object = %name,
                error = %e,
                "Metadata delete failed after all regions removed the object; record is stale"
            );
            return Err(Error::MetadataCommit {
                name: name.to_string(),
                reason: e.to_string(),
            });
        }

        tracing::info!(object = %name, "Object deleted from all regions");
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<ObjectRecord> {
        self.registry.get(name)
    }

    pub fn list(&self) -> Result<Vec<ObjectRecord>> {
        self.registry.list_all()
    }

    async fn fan_out<'a, T, F, Fut>(&'a self, op: F) -> FanoutOutcome<T>
    where
        F: Fn(&'a Region) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let legs = match self.fanout {
            FanoutMode::Sequential => {
                let mut legs = Vec::with_capacity(self.regions.len());
                let mut aborted = false;
                for region in self.regions.iter() {
                    let leg = if aborted {
                        Leg::Skipped
                    } else {
                        match op(region).await {
                            Ok(value) => Leg::Done(value),
                            Err(e) => {
                                aborted = true;
                                Leg::Failed(e)
                            }
                        }
                    };
                    legs.push((region.name.clone(), leg));
                }
                legs
            }
            FanoutMode::Parallel => {
                let results =
                    futures_util::future::join_all(self.regions.iter().map(&op)).await;
                self.regions
                    .iter()
                    .zip(results)
                    .map(|(region, res)| {
                        let leg = match res {
                            Ok(value) => Leg::Done(value),
                            Err(e) => Leg::Failed(e),
                        };
                        (region.name.clone(), leg)
                    })
                    .collect()
            }
        };

        FanoutOutcome { legs }
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        name: &str,
        fut: impl Future<Output = FanoutOutcome<T>>,
    ) -> Result<FanoutOutcome<T>> {
        tokio::time::timeout(self.request_timeout, fut)
            .await
            .map_err(|_| {
                let timeout_ms = self.request_timeout.as_millis() as u64;
                tracing::warn!(object = %name, timeout_ms, "{} fan-out timed out", operation);
                Error::Timeout(format!(
                    "{} of {} exceeded {:?}",
                    operation, name, self.request_timeout
                ))
            })
    }

    fn log_outcome<T>(&self, operation: &str, name: &str, outcome: &FanoutOutcome<T>) {
        for (region, leg) in outcome.legs() {
            match leg {
                Leg::Done(_) => {
                    tracing::debug!(object = %name, region = %region, "{} succeeded", operation)
                }
                Leg::Failed(e) => {
                    tracing::warn!(object = %name, region = %region, error = %e, "{} failed", operation)
                }
                Leg::Skipped => {
                    tracing::debug!(object = %name, region = %region, "{} skipped", operation)
                }
            }
        }
    }
}
