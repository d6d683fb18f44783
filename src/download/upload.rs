//! Remote upload for files too large for inline delivery.
//!
//! Gofile flow per attempt: ask the directory endpoint for a server (or pick
//! a random `storeN` on any failure), then POST the file as multipart. A
//! body whose `status` is not `"ok"` counts as a failed attempt. Attempts are
//! spaced with exponential backoff and no delay follows the final one.

use crate::core::config::UploadConfig;
use crate::core::retry::{retry, RetryConfig, RetryError, RetryResult, Retryable};
use crate::download::messages;
use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio_util::io::ReaderStream;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("upload failed after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

impl UploadError {
    pub fn user_message(&self) -> &'static str {
        messages::UPLOAD_ERROR
    }
}

/// Failure of a single upload attempt
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("provider returned status '{0}'")]
    Rejected(String),
}

// Every failure is retried; the attempt budget bounds the loop.
impl Retryable for AttemptError {
    fn is_retryable(&self) -> bool {
        true
    }
}

#[async_trait]
pub trait RemoteUploader: Send + Sync {
    /// Uploads the file and returns a shareable link.
    async fn upload(&self, file_path: &Path) -> Result<String, UploadError>;
}

#[derive(Debug, Deserialize)]
struct DirectoryResponse {
    #[serde(default)]
    data: Option<DirectoryData>,
}

#[derive(Debug, Deserialize)]
struct DirectoryData {
    #[serde(default)]
    server: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    data: Option<UploadData>,
}

#[derive(Debug, Deserialize)]
struct UploadData {
    #[serde(default, rename = "downloadPage")]
    download_page: Option<String>,
}

/// Gofile upload client
#[derive(Debug, Clone)]
pub struct GofileClient {
    client: reqwest::Client,
    config: UploadConfig,
}

impl GofileClient {
    pub fn new(config: UploadConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Backoff schedule: `base * 2^i` after failed attempt `i`
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new()
            .max_attempts(self.config.max_attempts)
            .initial_delay(self.config.base_delay)
            .backoff_multiplier(2.0)
            .max_delay(Duration::MAX)
            .no_jitter()
    }

    /// Server recommended by the directory, else a random pool member.
    pub async fn select_server(&self) -> String {
        match self.lookup_server().await {
            Ok(server) => {
                log::info!("[UPLOAD] Using Gofile server: {}", server);
                server
            }
            Err(e) => {
                let server = self.fallback_server();
                log::warn!("[UPLOAD] Could not get Gofile server ({}), using fallback {}", e, server);
                server
            }
        }
    }

    async fn lookup_server(&self) -> Result<String, AttemptError> {
        let response: DirectoryResponse = self
            .client
            .get(&self.config.directory_url)
            .timeout(self.config.directory_timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .data
            .and_then(|d| d.server)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AttemptError::Rejected("no server in directory response".into()))
    }

    fn fallback_server(&self) -> String {
        let pool = &self.config.server_pool;
        if pool.is_empty() {
            return "store1".to_string();
        }
        let index = rand::rng().random_range(0..pool.len());
        pool[index].clone()
    }

    async fn attempt(&self, file_path: &Path) -> Result<String, AttemptError> {
        let server = self.select_server().await;
        let upload_url = self.config.upload_url(&server);

        let size = fs_err::tokio::metadata(file_path).await?.len();
        let file = fs_err::tokio::File::open(file_path).await?;
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());

        log::info!("[UPLOAD] Uploading '{}' ({} bytes) to {}", file_name, size, upload_url);

        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let part = reqwest::multipart::Part::stream_with_length(body, size).file_name(file_name);
        let form = reqwest::multipart::Form::new().part("file", part);

        let response: UploadResponse = self
            .client
            .post(&upload_url)
            .multipart(form)
            .timeout(self.config.timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if response.status != "ok" {
            return Err(AttemptError::Rejected(response.status));
        }

        response
            .data
            .and_then(|d| d.download_page)
            .ok_or_else(|| AttemptError::Rejected("ok without downloadPage".into()))
    }

    /// Runs every attempt and reports the attempt count and the backoff
    /// delays slept between them.
    pub async fn upload_with_report(&self, file_path: &Path) -> RetryResult<String, AttemptError> {
        retry(&self.retry_config(), || self.attempt(file_path)).await
    }
}

#[async_trait]
impl RemoteUploader for GofileClient {
    async fn upload(&self, file_path: &Path) -> Result<String, UploadError> {
        let outcome = self.upload_with_report(file_path).await;

        match outcome.result {
            Ok(link) => {
                log::info!("[UPLOAD] ✅ Gofile upload successful after {} attempt(s)", outcome.attempts);
                Ok(link)
            }
            Err(RetryError::MaxRetriesExhausted { last_error, .. }) => {
                log::error!(
                    "[UPLOAD] All {} Gofile attempts failed for {}: {}",
                    outcome.attempts,
                    file_path.display(),
                    last_error
                );
                Err(UploadError::Exhausted {
                    attempts: outcome.attempts,
                    last_error: last_error.to_string(),
                })
            }
        }
    }
}
