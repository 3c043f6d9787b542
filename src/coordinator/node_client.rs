//! Storage node client
//!
//! Storage nodes expose two calls:
//! - `POST /upload`: multipart form with a `file` field, 200 on success
//! - `DELETE /delete?filename=X`: 200 on success

use crate::common::{Error, Region, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use std::time::Duration;

/// Transport used by the coordinator to reach one region's storage node.
#[async_trait]
pub trait RegionTransport: Send + Sync {
    /// Store `content` under `name`. Errors are `Error::Region`.
    async fn store(&self, region: &Region, name: &str, content: Bytes) -> Result<()>;

    /// Delete `name`. Errors are `Error::Region`.
    async fn remove(&self, region: &Region, name: &str) -> Result<()>;
}

/// HTTP client for storage nodes
pub struct HttpNodeClient {
    client: reqwest::Client,
}

impl HttpNodeClient {
    /// `timeout` bounds each individual call to a storage node.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RegionTransport for HttpNodeClient {
    async fn store(&self, region: &Region, name: &str, content: Bytes) -> Result<()> {
        // a fresh form per destination; `content` is shared, never drained
        let len = content.len() as u64;
        let part = Part::stream_with_length(content, len)
            .file_name(name.to_string())
            .mime_str("application/octet-stream")
            .map_err(|e| Error::region(&region.name, format!("building form: {}", e)))?;
        let form = Form::new().part("file", part);

        let resp = self
            .client
            .post(region.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::region(&region.name, format!("upload request: {}", e)))?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(Error::region(
                &region.name,
                format!("upload returned {}", status),
            ));
        }
        Ok(())
    }

    async fn remove(&self, region: &Region, name: &str) -> Result<()> {
        let resp = self
            .client
            .delete(region.delete_url())
            .query(&[("filename", name)])
            .send()
            .await
            .map_err(|e| Error::region(&region.name, format!("delete request: {}", e)))?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(Error::region(
                &region.name,
                format!("delete returned {}", status),
            ));
        }
        Ok(())
    }
}
