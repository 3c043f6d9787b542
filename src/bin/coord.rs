//! Coordinator binary

use clap::{Parser, Subcommand, ValueEnum};
use geocdn::common::{Config, DuplicatePolicy, FanoutMode, RegistryBackend};
use geocdn::Coordinator;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "geocdn-coord")]
#[command(about = "geocdn replication coordinator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start coordinator server
    Serve {
        /// Bind address for HTTP
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Registry database directory
        #[arg(long)]
        db: Option<PathBuf>,

        /// Keep the registry in memory (records are lost on restart)
        #[arg(long)]
        memory_registry: bool,

        /// Geolocation service base URL
        #[arg(long)]
        geo_endpoint: Option<String>,

        /// Fan-out mode for uploads and deletes
        #[arg(long, value_enum)]
        fanout: Option<FanoutArg>,

        /// Policy for uploads of an existing name
        #[arg(long, value_enum)]
        on_duplicate: Option<DuplicateArg>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FanoutArg {
    Sequential,
    Parallel,
}

#[derive(Clone, Copy, ValueEnum)]
enum DuplicateArg {
    Reject,
    Overwrite,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            db,
            memory_registry,
            geo_endpoint,
            fanout,
            on_duplicate,
        } => {
            // file and environment first, CLI flags win
            let mut config = Config::load()?;
            if let Some(bind) = bind {
                config.bind_addr = bind;
            }
            if let Some(db) = db {
                config.db_path = db;
            }
            if memory_registry {
                config.registry = RegistryBackend::Memory;
            }
            if let Some(endpoint) = geo_endpoint {
                config.geo_endpoint = endpoint;
            }
            if let Some(fanout) = fanout {
                config.fanout = match fanout {
                    FanoutArg::Sequential => FanoutMode::Sequential,
                    FanoutArg::Parallel => FanoutMode::Parallel,
                };
            }
            if let Some(policy) = on_duplicate {
                config.on_duplicate = match policy {
                    DuplicateArg::Reject => DuplicatePolicy::Reject,
                    DuplicateArg::Overwrite => DuplicatePolicy::Overwrite,
                };
            }

            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| config.log_level.clone().into()),
                )
                .with(tracing_subscriber::fmt::layer())
                .init();

            Coordinator::new(config).serve().await?;
        }
    }

    Ok(())
}
