//! Coordinator implementation
//!
//! The coordinator is responsible for:
//! - Replicating uploads to every region (fail-fast, metadata committed last)
//! - Deleting from every region before dropping the record
//! - Routing reads to the region nearest the client
//! - Keeping the object registry (name → per-region URLs)

pub mod http;
pub mod node_client;
pub mod registry;
pub mod replication;
pub mod routing;
pub mod server;

pub use node_client::{HttpNodeClient, RegionTransport};
pub use registry::{MemoryRegistry, ObjectRecord, RegistryStore, RocksRegistry};
pub use replication::{FanoutOutcome, Leg, ReplicationCoordinator, ReplicationOutcome};
pub use routing::{NearestEntry, NearestListing, NearestLocation, RoutingResolver};
pub use server::Coordinator;
