//! HTTP API for the coordinator
//!
//! | Method | Path | |
//! |---|---|---|
//! | POST | `/upload` | multipart field `file` → replicate to every region |
//! | GET | `/files?filename=X` | nearest copy of one object |
//! | GET | `/files/all` | every object, nearest region only |
//! | GET, DELETE | `/delete?filename=X[&force=true]` | delete from every region; `force` also removes unrecorded blobs |
//! | GET | `/health` | liveness and region list |
//!
//! Failures answer a status code and a short plain-text message.

use crate::common::tracing_middleware::request_tracing_middleware;
use crate::common::{Error, RegionSet};
use crate::coordinator::replication::ReplicationCoordinator;
use crate::coordinator::routing::{client_address, RoutingResolver};
use axum::{
    extract::{ConnectInfo, DefaultBodyLimit, Multipart, Query, State},
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

/// Multipart field carrying the uploaded file
pub const UPLOAD_FIELD: &str = "file";

/// Shared coordinator state for HTTP handlers.
#[derive(Clone)]
pub struct CoordState {
    pub replication: Arc<ReplicationCoordinator>,
    pub routing: Arc<RoutingResolver>,
    pub regions: Arc<RegionSet>,
}

#[derive(Debug, Deserialize)]
pub struct FilenameQuery {
    filename: Option<String>,
    #[serde(default)]
    force: bool,
}

impl FilenameQuery {
    fn required(self) -> Result<String, Error> {
        self.filename
            .filter(|f| !f.is_empty())
            .ok_or_else(|| Error::InvalidInput("Filename is required".into()))
    }
}

/// Body of `GET /files`
#[derive(Debug, Serialize, Deserialize)]
pub struct FileLocation {
    pub filename: String,
    pub region: String,
    pub url: String,
}

fn error_response(err: Error) -> Response {
    let status = err.to_http_status();
    if err.is_metadata_divergence() {
        tracing::error!(error = %err, "Registry diverged from storage nodes");
    } else if status.is_server_error() {
        tracing::warn!(error = %err, "Request failed");
    } else {
        tracing::debug!(error = %err, "Request rejected");
    }
    (status, err.to_string()).into_response()
}

fn resolve_client(headers: &HeaderMap, peer: Option<ConnectInfo<SocketAddr>>) -> Result<String, Error> {
    client_address(headers, peer.map(|ConnectInfo(addr)| addr))
        .ok_or_else(|| Error::GeoLookup("client address unavailable".into()))
}

/// Receives a multipart upload and replicates it to every region.
async fn upload(State(state): State<CoordState>, mut multipart: Multipart) -> Response {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return (e.status(), format!("Invalid file upload: {}", e)).into_response(),
        };

        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                return error_response(Error::InvalidInput(
                    "Invalid file upload: missing filename".into(),
                ))
            }
        };

        let content = match field.bytes().await {
            Ok(content) => content,
            Err(e) => return (e.status(), format!("Invalid file upload: {}", e)).into_response(),
        };

        return match state.replication.replicate(&filename, content).await {
            Ok(_) => (
                StatusCode::OK,
                "File uploaded and replicated successfully\n",
            )
                .into_response(),
            Err(e) => error_response(e),
        };
    }

    error_response(Error::InvalidInput(format!(
        "Invalid file upload: missing '{}' field",
        UPLOAD_FIELD
    )))
}

/// Returns the URL of the copy nearest to the caller.
async fn get_file(
    State(state): State<CoordState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Query(query): Query<FilenameQuery>,
) -> Response {
    let result = async {
        let filename = query.required()?;
        let record = state.replication.lookup(&filename)?;
        let client = resolve_client(&headers, peer)?;
        let nearest = state.routing.resolve_nearest(&client, &record.locations).await?;
        tracing::info!(object = %filename, client = %client, region = %nearest.region, "Routed read");
        Ok::<_, Error>(FileLocation {
            filename,
            region: nearest.region,
            url: nearest.url,
        })
    }
    .await;

    match result {
        Ok(location) => Json(location).into_response(),
        Err(e) => error_response(e),
    }
}

/// Lists every object with the URL of the caller's nearest region.
async fn list_files(
    State(state): State<CoordState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Response {
    let result = async {
        let records = state.replication.list()?;
        let client = resolve_client(&headers, peer)?;
        let listing = state.routing.list_for_nearest(&client, &records).await?;
        tracing::info!(
            client = %client,
            region = %listing.region,
            objects = listing.entries.len(),
            "Listed objects for nearest region"
        );
        Ok::<_, Error>(listing.entries)
    }
    .await;

    match result {
        Ok(entries) => Json(entries).into_response(),
        Err(e) => error_response(e),
    }
}

/// Deletes an object from every region, then from the registry.
async fn delete_file(State(state): State<CoordState>, Query(query): Query<FilenameQuery>) -> Response {
    let force = query.force;
    let filename = match query.required() {
        Ok(filename) => filename,
        Err(e) => return error_response(e),
    };

    let result = if force {
        state.replication.purge(&filename).await
    } else {
        state.replication.delete(&filename).await
    };
    match result {
        Ok(()) => (StatusCode::OK, "File deleted successfully\n").into_response(),
        Err(e) => error_response(e),
    }
}

/// Health check endpoint.
async fn health(State(state): State<CoordState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "regions": state.regions.names(),
    }))
}

/// Creates the HTTP router with all public endpoints.
pub fn create_router(state: CoordState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/upload", axum::routing::post(upload))
        .route("/files", get(get_file))
        .route("/files/all", get(list_files))
        .route("/delete", get(delete_file).delete(delete_file))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(middleware::from_fn(request_tracing_middleware))
        .with_state(state)
}
