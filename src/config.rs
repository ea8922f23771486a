use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::constants::*;
use crate::error::{PipelineError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub analytics: AnalyticsConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root of the data tree; `raw/`, `processed/` and `gold/` live beneath it
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            log_dir: PathBuf::from("logs"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Movies need strictly more ratings than this
    pub min_ratings: u64,
    pub top_rated_min_average: f64,
    pub top_rated_min_ratings: u64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            min_ratings: DEFAULT_MIN_RATINGS,
            top_rated_min_average: DEFAULT_TOP_RATED_MIN_AVERAGE,
            top_rated_min_ratings: DEFAULT_TOP_RATED_MIN_RATINGS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub default_top_n: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            default_top_n: DEFAULT_TOP_N,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/movielens.db"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Blob name prefix; empty mirrors the tree at the container root
    pub prefix: String,
}

impl Config {
    /// Load `config.toml` from the working directory, falling back to defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_PATH))
    }

    /// Load from an explicit path. A missing file yields the defaults; a
    /// malformed one is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                PipelineError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
            })?;
            toml::from_str::<Config>(&content)?
        } else {
            info!("No config file at {}, using defaults", path.display());
            Config::default()
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply `MOVIELENS_*` environment overrides on top of file values.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(dir) = std::env::var("MOVIELENS_DATA_DIR") {
            self.paths.data_dir = PathBuf::from(dir);
        }
        if let Ok(db) = std::env::var("MOVIELENS_DB_PATH") {
            self.database.path = PathBuf::from(db);
        }
        if let Ok(port) = std::env::var("MOVIELENS_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| PipelineError::Config(format!("MOVIELENS_PORT is not a valid port: {port}")))?;
        }
        Ok(())
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.paths.data_dir = data_dir.into();
        self
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.paths.data_dir.join("raw")
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.paths.data_dir.join("processed")
    }

    pub fn gold_dir(&self) -> PathBuf {
        self.paths.data_dir.join("gold")
    }

    pub fn movies_raw(&self) -> PathBuf {
        self.raw_dir().join(MOVIES_RAW_FILE)
    }

    pub fn ratings_raw(&self) -> PathBuf {
        self.raw_dir().join(RATINGS_RAW_FILE)
    }

    pub fn links_raw(&self) -> PathBuf {
        self.raw_dir().join(LINKS_RAW_FILE)
    }

    pub fn tags_raw(&self) -> PathBuf {
        self.raw_dir().join(TAGS_RAW_FILE)
    }

    pub fn movies_cleaned(&self) -> PathBuf {
        self.processed_dir().join(MOVIES_CLEANED_FILE)
    }

    pub fn unique_genres(&self) -> PathBuf {
        self.processed_dir().join(UNIQUE_GENRES_FILE)
    }

    pub fn movie_id_title_year(&self) -> PathBuf {
        self.processed_dir().join(MOVIE_ID_TITLE_YEAR_FILE)
    }

    pub fn movie_analytics(&self) -> PathBuf {
        self.gold_dir().join(MOVIE_ANALYTICS_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_dataset_conventions() {
        let config = Config::default();
        assert_eq!(config.analytics.min_ratings, 10);
        assert_eq!(config.server.port, 5001);
        assert_eq!(config.movies_raw(), PathBuf::from("data/raw/movies.csv"));
        assert_eq!(config.movie_analytics(), PathBuf::from("data/gold/movie_analytics.csv"));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[analytics]\nmin_ratings = 25\n\n[server]\ndefault_top_n = 3\n").unwrap();

        let config: Config = toml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(config.analytics.min_ratings, 25);
        assert_eq!(config.analytics.top_rated_min_ratings, 50);
        assert_eq!(config.server.default_top_n, 3);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[analytics\nmin_ratings = ").unwrap();
        assert!(matches!(Config::load_from(&path), Err(PipelineError::Toml(_))));
    }

    #[test]
    fn data_dir_override_moves_every_path() {
        let config = Config::default().with_data_dir("/tmp/ml");
        assert_eq!(config.unique_genres(), PathBuf::from("/tmp/ml/processed/unique_genres.txt"));
        assert_eq!(config.tags_raw(), PathBuf::from("/tmp/ml/raw/tags.csv"));
    }
}
