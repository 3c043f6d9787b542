//! Error types for geocdn

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Request Errors ===
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    /// Another upload or delete of the same name is still running.
    #[error("Operation already in progress for {0}")]
    Busy(String),

    // === Upstream Errors ===
    #[error("Region {region} failed: {reason}")]
    Region { region: String, reason: String },

    #[error("Could not determine client location: {0}")]
    GeoLookup(String),

    #[error("No URL for selected region {0}")]
    NoRegionUrl(String),

    #[error("HTTP error: {0}")]
    Http(String),

    // === Metadata Errors ===
    /// Registry write failed after every region already acknowledged.
    #[error("Metadata commit failed for {name}: {reason}")]
    MetadataCommit { name: String, reason: String },

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    #[error("Metadata corrupted: {0}")]
    MetadataCorrupted(String),

    // === Config Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === Generic ===
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Operation timeout: {0}")]
    Timeout(String),
}

impl Error {
    /// Builds a regional failure for `region`.
    pub fn region(region: impl Into<String>, reason: impl ToString) -> Self {
        Error::Region {
            region: region.into(),
            reason: reason.to_string(),
        }
    }

    /// Did the registry diverge from the storage nodes?
    pub fn is_metadata_divergence(&self) -> bool {
        matches!(self, Error::MetadataCommit { .. })
    }

    /// Convert to HTTP status code
    pub fn to_http_status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::AlreadyExists(_) | Error::Busy(_) => StatusCode::CONFLICT,
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::InvalidConfig(e.to_string())
    }
}
