//! CLI for a running coordinator

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use geocdn::coordinator::http::{FileLocation, UPLOAD_FIELD};
use geocdn::coordinator::NearestEntry;
use reqwest::multipart::{Form, Part};

#[derive(Parser)]
#[command(name = "geocdn")]
#[command(about = "geocdn replication coordinator CLI")]
#[command(version)]
struct Cli {
    /// Coordinator URL
    #[arg(long, default_value = "http://localhost:5000")]
    coordinator: String,

    /// Client address to route for (sent as X-Forwarded-For)
    #[arg(long)]
    client_ip: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file to every region
    Upload {
        /// File path
        path: std::path::PathBuf,

        /// Object name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Show the nearest URL of an object
    Get {
        /// Object name
        name: String,
    },

    /// List every object with its nearest URL
    List,

    /// Delete an object from every region
    Delete {
        /// Object name
        name: String,

        /// Also remove copies that have no record (left by a failed upload)
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let base = cli.coordinator.trim_end_matches('/').to_string();
    let client = reqwest::Client::new();

    let with_client_ip = |req: reqwest::RequestBuilder| match &cli.client_ip {
        Some(ip) => req.header("X-Forwarded-For", ip.as_str()),
        None => req,
    };

    match cli.command {
        Commands::Upload { path, name } => {
            let name = match name {
                Some(name) => name,
                None => path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(str::to_string)
                    .context("cannot derive object name from path; pass --name")?,
            };
            let content = tokio::fs::read(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let size = content.len() as u64;

            let form = Form::new().part(UPLOAD_FIELD, Part::bytes(content).file_name(name.clone()));
            let resp = with_client_ip(client.post(format!("{}/upload", base)))
                .multipart(form)
                .send()
                .await?;
            let status = resp.status();
            let body = resp.text().await?;
            if !status.is_success() {
                bail!("upload failed ({}): {}", status, body.trim());
            }
            println!(
                "Uploaded {} ({})",
                name,
                geocdn::common::format_bytes(size)
            );
        }

        Commands::Get { name } => {
            let resp = with_client_ip(client.get(format!("{}/files", base)))
                .query(&[("filename", name.as_str())])
                .send()
                .await?;
            let status = resp.status();
            if !status.is_success() {
                bail!("get failed ({}): {}", status, resp.text().await?.trim());
            }
            let location: FileLocation = resp.json().await?;
            println!("{}", location.url);
            println!("  region: {}", location.region);
        }

        Commands::List => {
            let resp = with_client_ip(client.get(format!("{}/files/all", base)))
                .send()
                .await?;
            let status = resp.status();
            if !status.is_success() {
                bail!("list failed ({}): {}", status, resp.text().await?.trim());
            }
            let entries: Vec<NearestEntry> = resp.json().await?;
            for entry in &entries {
                println!("{}\t{}", entry.filename, entry.url);
            }
            println!("{} object(s)", entries.len());
        }

        Commands::Delete { name, force } => {
            let mut req = with_client_ip(client.delete(format!("{}/delete", base)))
                .query(&[("filename", name.as_str())]);
            if force {
                req = req.query(&[("force", "true")]);
            }
            let resp = req.send().await?;
            let status = resp.status();
            if !status.is_success() {
                bail!("delete failed ({}): {}", status, resp.text().await?.trim());
            }
            println!("Deleted {}", name);
        }
    }

    Ok(())
}
