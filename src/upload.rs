//! Mirror the local data tree into blob storage.
//!
//! Credentials come from the environment (a `.env` file is honored):
//! - AZURE_STORAGE_ACCOUNT_NAME (storage account)
//! - AZURE_STORAGE_SAS (shared access signature, with or without the leading `?`)
//! - DATA_CONTAINER (target container)

use std::fs;
use std::path::Path;

use async_trait::async_trait;
use metrics::counter;
use serde::Serialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{PipelineError, Result};
use crate::observability::MetricName;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Create or overwrite the blob `name` with `bytes`.
    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct AzureBlobStore {
    client: reqwest::Client,
    account: String,
    container: String,
    sas: String,
}

impl AzureBlobStore {
    pub fn new(account: impl Into<String>, container: impl Into<String>, sas: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            account: account.into(),
            container: container.into(),
            sas: sas.into().trim_start_matches('?').to_string(),
        }
    }

    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        let var = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| PipelineError::Config(format!("{name} must be set to upload")))
        };
        Ok(Self::new(
            var("AZURE_STORAGE_ACCOUNT_NAME")?,
            var("DATA_CONTAINER")?,
            var("AZURE_STORAGE_SAS")?,
        ))
    }

    /// `https://{account}.blob.core.windows.net/{container}/{blob}?{sas}`
    pub fn blob_url(&self, name: &str) -> Result<reqwest::Url> {
        let base = format!("https://{}.blob.core.windows.net/", self.account);
        let mut url = reqwest::Url::parse(&base)
            .map_err(|e| PipelineError::Config(format!("invalid storage account '{}': {e}", self.account)))?;
        url.path_segments_mut()
            .map_err(|_| PipelineError::Config(format!("cannot build blob url from {base}")))?
            .pop_if_empty()
            .push(&self.container)
            .extend(name.split('/'));
        url.set_query(Some(&self.sas));
        Ok(url)
    }
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<()> {
        let url = self.blob_url(name)?;
        let resp = self
            .client
            .put(url)
            .header("x-ms-blob-type", "BlockBlob")
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Upload {
                message: format!("{name}: {status} - {body}"),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct UploadSummary {
    pub files: usize,
    pub bytes: u64,
    pub blobs: Vec<String>,
}

/// Blob name for a file at `relative` (already `/`-separated) under `prefix`.
pub fn blob_name(prefix: &str, relative: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        relative.to_string()
    } else {
        format!("{prefix}/{relative}")
    }
}

/// Upload every file under `dir`, recursively, in path order.
///
/// Stops at the first failed upload. A missing directory is `NotFound`.
pub async fn upload_directory(store: &dyn BlobStore, dir: &Path, prefix: &str) -> Result<UploadSummary> {
    if !dir.is_dir() {
        return Err(PipelineError::not_found(dir));
    }

    let mut summary = UploadSummary::default();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| PipelineError::Upload {
            message: format!("walking {}: {e}", dir.display()),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| PipelineError::Upload { message: e.to_string() })?
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let name = blob_name(prefix, &relative);

        let bytes = fs::read(entry.path())?;
        let size = bytes.len() as u64;
        debug!("Uploading {} ({} bytes)", name, size);
        store.put(&name, bytes).await?;

        counter!(MetricName::BlobsUploaded.as_str()).increment(1);
        counter!(MetricName::BlobBytesUploaded.as_str()).increment(size);
        summary.files += 1;
        summary.bytes += size;
        summary.blobs.push(name);
    }

    info!("Uploaded {} files ({} bytes) from {}", summary.files, summary.bytes, dir.display());
    Ok(summary)
}
