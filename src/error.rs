use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// The input source does not exist. Loaders that tolerate this return an empty result.
    #[error("Source not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Schema error in {source_name}: missing required columns {missing:?}")]
    Schema {
        source_name: String,
        missing: Vec<String>,
    },

    #[error("Parse error at row {row}: field '{field}' value '{value}': {reason}")]
    Parse {
        row: usize,
        field: String,
        value: String,
        reason: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Upload error: {message}")]
    Upload { message: String },
}

impl PipelineError {
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        PipelineError::NotFound { path: path.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PipelineError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
