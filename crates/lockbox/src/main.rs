//! Lockbox server binary.
//!
//! Usage:
//!   lockbox --port 8080 --public-url https://lockbox.example --db lockbox.db

use std::path::PathBuf;

use clap::Parser;
use lockbox::{run_server, ServerConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lockbox")]
#[command(about = "Lockbox vault and channel server")]
#[command(version)]
struct Args {
    /// Host to bind to
    #[arg(short = 'H', long, env = "LOCKBOX_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "LOCKBOX_PORT", default_value = "8080")]
    port: u16,

    /// Scheme and authority clients sign against
    #[arg(long, env = "LOCKBOX_PUBLIC_URL")]
    public_url: Option<String>,

    /// SQLite database file (in-memory if omitted)
    #[arg(long, env = "LOCKBOX_DB")]
    db: Option<PathBuf>,

    /// Log filter, used when RUST_LOG is unset
    #[arg(long, env = "LOCKBOX_LOG", default_value = "info")]
    log: String,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        let public_url = self
            .public_url
            .unwrap_or_else(|| format!("http://{}:{}", self.host, self.port));
        ServerConfig {
            host: self.host,
            port: self.port,
            public_url,
            database: self.db,
            ..ServerConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("shutting down");
                signal.cancel();
            }
            Err(e) => tracing::error!(error = %e, "failed to listen for shutdown signal"),
        }
    });

    run_server(args.into_config(), shutdown).await
}
