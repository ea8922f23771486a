use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use movielens_pipeline::config::{Config, DEFAULT_CONFIG_PATH};
use movielens_pipeline::pipeline::artifacts::read_cleaned_movies;
use movielens_pipeline::pipeline::processing::genre_counts;
use movielens_pipeline::server::{self, AppContext};
use movielens_pipeline::upload::{upload_directory, AzureBlobStore};
use movielens_pipeline::{logging, observability, storage, Pipeline};

#[derive(Parser)]
#[command(name = "movielens_pipeline")]
#[command(about = "MovieLens ingestion, normalization and analytics pipeline")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the data directory (raw/, processed/ and gold/ live beneath it)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize raw movies into the processed files
    Ingest,
    /// Aggregate ratings into the gold analytics table
    Analytics,
    /// Run ingest then analytics
    Run,
    /// Load processed files and raw side tables into SQLite
    Load,
    /// Serve the query API
    Serve {
        /// Port to listen on (defaults to the configured port)
        #[arg(short, long)]
        port: Option<u16>,
        /// Install the Prometheus recorder and expose /metrics
        #[arg(long)]
        metrics: bool,
    },
    /// Mirror the data directory into blob storage
    Upload {
        /// Blob name prefix
        #[arg(long)]
        prefix: Option<String>,
    },
    /// Print the most frequent genres
    Genres {
        /// How many genres to show
        #[arg(long, default_value = "10")]
        top: usize,
    },
}

fn ingest(config: &Config) -> Result<()> {
    println!("🔄 Running ingestion...");
    let result = Pipeline::run_ingestion(config).context("ingestion failed")?;
    println!("\n📊 Ingestion Results (run {}):", result.run_id);
    println!("   Movies: {}", result.movies_loaded);
    println!("   Unique genres: {}", result.unique_genres);
    for output in &result.outputs {
        println!("   Output file: {} ({} bytes, sha256 {})", output.path, output.bytes, output.sha256);
    }
    Ok(())
}

fn analytics(config: &Config) -> Result<()> {
    println!("📈 Building analytics...");
    let result = Pipeline::run_analytics(config).context("analytics failed")?;
    println!("\n📊 Analytics Results (run {}):", result.run_id);
    println!("   Ratings: {}", result.ratings_loaded);
    println!("   Rated movies: {}", result.rated_movies);
    println!("   Gold rows: {}", result.gold_rows);
    for output in &result.outputs {
        println!("   Output file: {} ({} bytes, sha256 {})", output.path, output.bytes, output.sha256);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::load_from(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;
    if let Some(dir) = cli.data_dir {
        config = config.with_data_dir(dir);
    }

    let _guard = logging::init_logging(&config.paths.log_dir);
    info!(data_dir = %config.paths.data_dir.display(), "Configuration loaded");

    match cli.command {
        Commands::Ingest => ingest(&config)?,
        Commands::Analytics => analytics(&config)?,
        Commands::Run => {
            println!("🚀 Running full pipeline (ingest + analytics)...");
            println!("\n📥 Step 1: Ingestion");
            ingest(&config)?;
            println!("\n📈 Step 2: Analytics");
            analytics(&config)?;
            println!("✅ Full pipeline completed successfully!");
        }
        Commands::Load => {
            println!("🗄️  Loading into {}...", config.database.path.display());
            let summary = storage::run_load(&config).context("relational load failed")?;
            println!("✅ Loaded {} genres, {} movies ({} genre links), {} links, {} ratings, {} tags",
                summary.genres, summary.movies, summary.movie_genres, summary.links, summary.ratings, summary.tags);
        }
        Commands::Serve { port, metrics } => {
            if metrics {
                observability::init().unwrap_or_else(|e| {
                    eprintln!("Warning: Failed to initialize metrics: {}", e);
                });
            }
            let port = port.unwrap_or(config.server.port);
            let addr: SocketAddr = format!("{}:{}", config.server.host, port)
                .parse()
                .with_context(|| format!("invalid listen address {}:{}", config.server.host, port))?;

            let ctx = Arc::new(AppContext::load(&config));
            if let Err(e) = server::start_server(ctx, addr).await {
                error!("Server error: {}", e);
                return Err(e.into());
            }
        }
        Commands::Upload { prefix } => {
            let prefix = prefix.unwrap_or_else(|| config.upload.prefix.clone());
            let store = AzureBlobStore::from_env().context("blob storage is not configured")?;
            println!("☁️  Uploading {}...", config.paths.data_dir.display());
            let summary = upload_directory(&store, &config.paths.data_dir, &prefix)
                .await
                .context("upload failed")?;
            println!("✅ Uploaded {} files ({} bytes)", summary.files, summary.bytes);
        }
        Commands::Genres { top } => {
            let movies = read_cleaned_movies(&config.movies_cleaned())
                .context("cleaned movies not found; run `ingest` first")?;
            println!("🎭 Top {} genres across {} movies:", top, movies.len());
            for (genre, count) in genre_counts(&movies).into_iter().take(top) {
                println!("   {:<20} {}", genre, count);
            }
        }
    }

    Ok(())
}
