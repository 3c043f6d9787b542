//! # geocdn
//!
//! A content-replication coordinator:
//! - Uploads are replicated synchronously to a fixed set of regional storage
//!   nodes; the object is recorded only once every region has it
//! - Reads are routed to the region geographically nearest the client
//! - Deletes reach every region before the record is dropped
//!
//! ## Architecture
//!
//! ```text
//!            ┌──────────────────────────────────────┐
//!  client ──▶│             Coordinator              │──▶ geolocation service
//!            │  ReplicationCoordinator  (writes)    │
//!            │  RoutingResolver         (reads)     │
//!            │  RegistryStore           (RocksDB)   │
//!            └───────────┬──────────────────────────┘
//!                        │ HTTP (multipart / delete)
//!      ┌─────────────────┼──────────────────┐
//!      │                 │                  │
//! ┌────▼──────┐    ┌─────▼─────┐    ┌───────▼───┐
//! │  London   │    │ New York  │    │ Singapore │
//! └───────────┘    └───────────┘    └───────────┘
//! ```
//!
//! ## Usage
//!
//! ### Start the coordinator
//! ```bash
//! geocdn-coord serve --bind 0.0.0.0:5000 --db ./geocdn-data
//! ```
//!
//! ### Use the CLI
//! ```bash
//! geocdn upload ./photo.jpg
//! geocdn get photo.jpg
//! geocdn list
//! geocdn delete photo.jpg
//! ```

pub mod common;
pub mod coordinator;
pub mod geo;

// Re-export commonly used types
pub use common::{Config, Error, Result};
pub use coordinator::Coordinator;

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
