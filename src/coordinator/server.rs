//! Coordinator server

use crate::common::{Config, RegionSet, RegistryBackend, Result};
use crate::coordinator::http::{create_router, CoordState};
use crate::coordinator::node_client::HttpNodeClient;
use crate::coordinator::registry::{MemoryRegistry, RegistryStore, RocksRegistry};
use crate::coordinator::replication::ReplicationCoordinator;
use crate::coordinator::routing::RoutingResolver;
use crate::geo::IpApiLocator;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;

pub struct Coordinator {
    config: Config,
}

impl Coordinator {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Wire registry, storage-node client, locator and router together.
    pub fn build_router(&self) -> Result<Router> {
        let config = &self.config;
        config.validate()?;

        let regions = Arc::new(RegionSet::new(&config.regions)?);

        let registry: Arc<dyn RegistryStore> = match config.registry {
            RegistryBackend::Rocksdb => Arc::new(RocksRegistry::open(&config.db_path)?),
            RegistryBackend::Memory => {
                tracing::warn!("Using in-memory registry; records are lost on restart");
                Arc::new(MemoryRegistry::new())
            }
        };

        let transport = Arc::new(HttpNodeClient::new(config.region_timeout())?);
        let locator = Arc::new(IpApiLocator::new(
            config.geo_endpoint.clone(),
            config.geo_timeout(),
        )?);

        let replication = ReplicationCoordinator::new(regions.clone(), transport, registry)
            .with_fanout(config.fanout)
            .with_duplicate_policy(config.on_duplicate)
            .with_request_timeout(config.request_timeout());
        let routing = RoutingResolver::new(regions.clone(), locator);

        let state = CoordState {
            replication: Arc::new(replication),
            routing: Arc::new(routing),
            regions,
        };
        Ok(create_router(state, config.max_upload_bytes))
    }

    pub async fn serve(self) -> Result<()> {
        tracing::info!("Starting coordinator");
        tracing::info!("  HTTP API: {}", self.config.bind_addr);
        tracing::info!("  Registry: {:?}", self.config.registry);
        if self.config.registry == RegistryBackend::Rocksdb {
            tracing::info!("  DB path: {}", self.config.db_path.display());
        }
        tracing::info!("  Geolocation: {}", self.config.geo_endpoint);
        tracing::info!("  Fan-out: {:?}", self.config.fanout);
        for region in &self.config.regions {
            tracing::info!(
                "  Region {}: {} ({}, {})",
                region.name,
                region.base_address,
                region.lat,
                region.lon
            );
        }

        let router = self.build_router()?;

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!("✓ Coordinator ready");

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        tracing::info!("Coordinator stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
