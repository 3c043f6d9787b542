//! Shared fixtures: fake storage nodes, a fake geolocation service and a
//! coordinator wired to them, all on ephemeral ports.

#![allow(dead_code)]

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use geocdn::common::{Config, RegionConfig, RegistryBackend};
use geocdn::Coordinator;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Client addresses the fake geolocation service knows about
pub const SINGAPORE_CLIENT: &str = "203.0.113.10";
pub const LONDON_CLIENT: &str = "198.51.100.20";
pub const NEW_YORK_CLIENT: &str = "192.0.2.30";

pub async fn spawn(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    addr
}

/// In-memory storage node speaking the upload/delete contract
#[derive(Clone, Default)]
pub struct FakeNode {
    pub blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    pub failing: Arc<AtomicBool>,
    /// Delay before answering an upload, in milliseconds
    pub upload_delay_ms: Arc<AtomicU64>,
}

#[derive(Deserialize)]
struct DeleteQuery {
    filename: String,
}

impl FakeNode {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_upload_delay(&self, delay: Duration) {
        self.upload_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn has(&self, name: &str) -> bool {
        self.blobs.lock().unwrap().contains_key(name)
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/upload", post(node_upload))
            .route("/files/:name", get(node_fetch))
            .route("/delete", delete(node_delete))
            .with_state(self.clone())
    }
}

async fn node_upload(State(node): State<FakeNode>, mut multipart: Multipart) -> StatusCode {
    let delay = node.upload_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    if node.failing.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }
        let Some(name) = field.file_name().map(str::to_string) else {
            return StatusCode::BAD_REQUEST;
        };
        let Ok(bytes) = field.bytes().await else {
            return StatusCode::BAD_REQUEST;
        };
        node.blobs.lock().unwrap().insert(name, bytes.to_vec());
        return StatusCode::OK;
    }
    StatusCode::BAD_REQUEST
}

async fn node_fetch(State(node): State<FakeNode>, Path(name): Path<String>) -> impl IntoResponse {
    match node.blobs.lock().unwrap().get(&name) {
        Some(bytes) => (StatusCode::OK, bytes.clone()),
        None => (StatusCode::NOT_FOUND, Vec::new()),
    }
}

async fn node_delete(State(node): State<FakeNode>, Query(q): Query<DeleteQuery>) -> StatusCode {
    if node.failing.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    node.blobs.lock().unwrap().remove(&q.filename);
    StatusCode::OK
}

/// ip-api compatible geolocation service
#[derive(Clone)]
pub struct FakeGeo {
    known: Arc<HashMap<String, (f64, f64)>>,
    pub down: Arc<AtomicBool>,
    /// Answer 200 with a body that is not JSON
    pub garbled: Arc<AtomicBool>,
}

impl FakeGeo {
    pub fn new() -> Self {
        let known = HashMap::from([
            (SINGAPORE_CLIENT.to_string(), (1.3, 103.8)),
            (LONDON_CLIENT.to_string(), (51.5, -0.1)),
            (NEW_YORK_CLIENT.to_string(), (40.7, -74.0)),
        ]);
        Self {
            known: Arc::new(known),
            down: Arc::new(AtomicBool::new(false)),
            garbled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/json/:addr", get(geo_lookup))
            .with_state(self.clone())
    }
}

async fn geo_lookup(State(geo): State<FakeGeo>, Path(addr): Path<String>) -> Response {
    if geo.down.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({}))).into_response();
    }
    if geo.garbled.load(Ordering::SeqCst) {
        return (StatusCode::OK, "not json").into_response();
    }
    match geo.known.get(&addr) {
        Some((lat, lon)) => Json(json!({ "status": "success", "query": addr, "lat": lat, "lon": lon }))
            .into_response(),
        None => Json(json!({ "status": "fail", "message": "private range", "query": addr }))
            .into_response(),
    }
}

/// Three fake regions, a fake geolocation service and a coordinator
pub struct Cluster {
    pub coordinator: String,
    pub nodes: HashMap<&'static str, FakeNode>,
    pub geo: FakeGeo,
    pub http: reqwest::Client,
}

impl Cluster {
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    pub async fn start_with(tweak: impl FnOnce(&mut Config)) -> Self {
        let reference = [
            ("Singapore", 1.3521, 103.8198),
            ("New York", 40.7128, -74.0060),
            ("London", 51.5074, -0.1278),
        ];

        let mut nodes = HashMap::new();
        let mut regions = Vec::new();
        for (name, lat, lon) in reference {
            let node = FakeNode::default();
            let addr = spawn(node.router()).await;
            regions.push(RegionConfig::new(name, &format!("http://{}", addr), lat, lon));
            nodes.insert(name, node);
        }

        let geo = FakeGeo::new();
        let geo_addr = spawn(geo.router()).await;

        let mut config = Config {
            registry: RegistryBackend::Memory,
            regions,
            geo_endpoint: format!("http://{}", geo_addr),
            region_timeout_ms: 5_000,
            geo_timeout_ms: 5_000,
            ..Default::default()
        };
        tweak(&mut config);

        let router = Coordinator::new(config).build_router().unwrap();
        let addr = spawn(router).await;

        Self {
            coordinator: format!("http://{}", addr),
            nodes,
            geo,
            http: reqwest::Client::new(),
        }
    }

    pub fn node(&self, region: &str) -> &FakeNode {
        &self.nodes[region]
    }

    pub async fn upload(&self, name: &str, content: &[u8]) -> reqwest::Response {
        let part = reqwest::multipart::Part::bytes(content.to_vec()).file_name(name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        self.http
            .post(format!("{}/upload", self.coordinator))
            .multipart(form)
            .send()
            .await
            .unwrap()
    }

    pub async fn get_file(&self, name: &str, client: &str) -> reqwest::Response {
        self.http
            .get(format!("{}/files", self.coordinator))
            .query(&[("filename", name)])
            .header("X-Forwarded-For", client)
            .send()
            .await
            .unwrap()
    }

    pub async fn list(&self, client: &str) -> reqwest::Response {
        self.http
            .get(format!("{}/files/all", self.coordinator))
            .header("X-Forwarded-For", client)
            .send()
            .await
            .unwrap()
    }

    pub async fn purge(&self, name: &str) -> reqwest::Response {
        self.http
            .delete(format!("{}/delete", self.coordinator))
            .query(&[("filename", name), ("force", "true")])
            .send()
            .await
            .unwrap()
    }

    pub async fn delete(&self, name: &str) -> reqwest::Response {
        self.http
            .delete(format!("{}/delete", self.coordinator))
            .query(&[("filename", name)])
            .send()
            .await
            .unwrap()
    }
}
