//! Chooses between inline transfer and remote upload and performs it.

use crate::core::utils::bytes_to_mb;
use crate::download::extractor::{MediaArtifact, MediaKind};
use crate::download::messages;
use crate::download::status::{Indicator, OutboundArtifact, StatusSurface};
use crate::download::upload::{RemoteUploader, UploadError};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryRoute {
    Inline,
    RemoteUpload,
}

/// Inline up to and including `max_inline_mb`, remote above it.
pub fn route(size_bytes: u64, max_inline_mb: f64) -> DeliveryRoute {
    if bytes_to_mb(size_bytes) > max_inline_mb {
        DeliveryRoute::RemoteUpload
    } else {
        DeliveryRoute::Inline
    }
}

#[derive(Debug, Error)]
pub enum DeliveryFailure {
    #[error("inline transfer failed: {0}")]
    Transfer(String),
    #[error(transparent)]
    Upload(#[from] UploadError),
}

impl DeliveryFailure {
    pub fn user_message(&self) -> &'static str {
        match self {
            DeliveryFailure::Transfer(_) => messages::DELIVERY_ERROR,
            DeliveryFailure::Upload(e) => e.user_message(),
        }
    }
}

#[derive(Debug)]
pub enum DeliveryOutcome {
    DeliveredInline,
    DeliveredViaRemoteUpload(String),
    DeliveryFailed(DeliveryFailure),
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        !matches!(self, DeliveryOutcome::DeliveryFailed(_))
    }
}

/// How one artifact should be presented
#[derive(Debug, Clone)]
pub struct DeliveryJob {
    pub source_url: String,
    pub media_kind: MediaKind,
    pub caption: String,
    /// Indicator text while the inline transfer runs
    pub sending_text: String,
    /// Batch items append the link to their caption instead of a standalone notice
    pub batch_item: bool,
    /// Indicator text on failure; defaults to the failure's user message
    pub failure_text: Option<String>,
}

#[derive(Clone)]
pub struct DeliveryRouter {
    uploader: Arc<dyn RemoteUploader>,
    max_inline_transfer_mb: f64,
}

impl DeliveryRouter {
    pub fn new(uploader: Arc<dyn RemoteUploader>, max_inline_transfer_mb: f64) -> Self {
        Self {
            uploader,
            max_inline_transfer_mb,
        }
    }

    /// Delivers the artifact. The indicator is retired on success and
    /// replaced by the failure text otherwise.
    pub async fn deliver(
        &self,
        surface: &dyn StatusSurface,
        indicator: Indicator<'_>,
        artifact: &MediaArtifact,
        job: &DeliveryJob,
    ) -> DeliveryOutcome {
        let outcome = match route(artifact.size_bytes, self.max_inline_transfer_mb) {
            DeliveryRoute::Inline => {
                indicator.update(&job.sending_text).await;
                self.deliver_inline(surface, artifact, job).await
            }
            DeliveryRoute::RemoteUpload => {
                indicator
                    .update(&messages::large_file_uploading(bytes_to_mb(artifact.size_bytes)))
                    .await;
                self.deliver_remote(surface, artifact, job).await
            }
        };

        match &outcome {
            DeliveryOutcome::DeliveryFailed(failure) => {
                log::error!(
                    "[DELIVERY] failed for {} ({}): {}",
                    job.source_url,
                    artifact.file_path.display(),
                    failure
                );
                let text = job
                    .failure_text
                    .clone()
                    .unwrap_or_else(|| messages::plain(failure.user_message()));
                indicator.update(&text).await;
            }
            _ => indicator.retire().await,
        }

        outcome
    }

    async fn deliver_inline(
        &self,
        surface: &dyn StatusSurface,
        artifact: &MediaArtifact,
        job: &DeliveryJob,
    ) -> DeliveryOutcome {
        let outbound = match job.media_kind {
            MediaKind::Video => OutboundArtifact::Video {
                path: artifact.file_path.clone(),
                thumbnail: artifact.thumbnail_path.clone(),
            },
            MediaKind::Audio => OutboundArtifact::Audio {
                path: artifact.file_path.clone(),
                title: artifact.title.clone(),
                performer: artifact.author.clone(),
            },
        };

        match surface.send_artifact(&outbound, &job.caption).await {
            Ok(()) => {
                log::info!("[DELIVERY] sent {} inline", artifact.file_path.display());
                DeliveryOutcome::DeliveredInline
            }
            Err(e) => DeliveryOutcome::DeliveryFailed(DeliveryFailure::Transfer(e.to_string())),
        }
    }

    async fn deliver_remote(
        &self,
        surface: &dyn StatusSurface,
        artifact: &MediaArtifact,
        job: &DeliveryJob,
    ) -> DeliveryOutcome {
        let link = match self.uploader.upload(&artifact.file_path).await {
            Ok(link) => link,
            Err(e) => return DeliveryOutcome::DeliveryFailed(e.into()),
        };

        let text = if job.batch_item {
            messages::with_download_link(&job.caption, &link)
        } else {
            messages::uploaded_remote(&link)
        };

        match surface.send_artifact(&OutboundArtifact::Text, &text).await {
            Ok(()) => DeliveryOutcome::DeliveredViaRemoteUpload(link),
            Err(e) => DeliveryOutcome::DeliveryFailed(DeliveryFailure::Transfer(e.to_string())),
        }
    }
}
