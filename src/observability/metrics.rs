//! Metric names and the Prometheus recorder
//!
//! Pipeline stages record through the `metrics` facade. Without an installed
//! recorder those calls are no-ops, so batch commands only pay for metrics
//! when the HTTP service asks for them.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::fmt;
use std::sync::OnceLock;
use tracing::info;

/// Every metric the pipeline records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Ingestion
    RawMoviesLoaded,
    MoviesNormalized,
    UniqueGenres,
    IngestionDuration,

    // Analytics
    RatingsLoaded,
    GoldRows,
    AnalyticsDuration,

    // Relational loader
    RowsLoaded,

    // Uploader
    BlobsUploaded,
    BlobBytesUploaded,

    // HTTP
    HttpRequests,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::RawMoviesLoaded => "movielens_raw_movies_loaded_total",
            MetricName::MoviesNormalized => "movielens_movies_normalized_total",
            MetricName::UniqueGenres => "movielens_unique_genres",
            MetricName::IngestionDuration => "movielens_ingestion_duration_seconds",
            MetricName::RatingsLoaded => "movielens_ratings_loaded_total",
            MetricName::GoldRows => "movielens_gold_rows",
            MetricName::AnalyticsDuration => "movielens_analytics_duration_seconds",
            MetricName::RowsLoaded => "movielens_store_rows_loaded_total",
            MetricName::BlobsUploaded => "movielens_blobs_uploaded_total",
            MetricName::BlobBytesUploaded => "movielens_blob_bytes_uploaded_total",
            MetricName::HttpRequests => "movielens_http_requests_total",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Calling it twice is harmless.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
    METRICS_HANDLE.set(handle).ok();
    info!("Metrics system initialized");
    Ok(())
}

/// Current metrics in Prometheus text format, if the recorder is installed.
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(|handle| handle.render())
}
