use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use movielens_pipeline::config::{Config, DEFAULT_CONFIG_PATH};
use movielens_pipeline::server::{self, AppContext};

#[derive(Parser)]
#[command(name = "movie-api")]
#[command(about = "Query API over the processed MovieLens tables")]
#[command(version = "0.1.0")]
struct Cli {
    /// Port to run the server on (defaults to the configured port)
    #[arg(short, long)]
    port: Option<u16>,

    /// Path to the TOML config file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Expose Prometheus metrics on /metrics
    #[arg(long)]
    metrics: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // Console logging only
    tracing_subscriber::fmt::init();

    let config = Config::load_from(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;
    let port = cli.port.unwrap_or(config.server.port);

    println!("🚀 Starting movie API on port {}...", port);

    if cli.metrics {
        movielens_pipeline::observability::init().unwrap_or_else(|e| {
            eprintln!("Warning: Failed to initialize metrics: {}", e);
        });
    }

    let ctx = Arc::new(AppContext::load(&config));
    info!(movies = ctx.movies.len(), analytics = ctx.analytics.len(), "Tables loaded");

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    server::start_server(ctx, addr).await?;
    Ok(())
}
