pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod observability;
pub mod pipeline;
pub mod query;
pub mod server;
pub mod storage;
pub mod types;
pub mod upload;

pub use config::Config;
pub use error::{PipelineError, Result};
pub use pipeline::Pipeline;
