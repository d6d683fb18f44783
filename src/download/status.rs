//! Outbound surface the pipeline talks to: status indicators and deliveries.
//!
//! All text handed to a [`StatusSurface`] is already MarkdownV2-formatted.

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Opaque reference to a status indicator (a chat message id on Telegram)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusHandle(pub i64);

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<teloxide::RequestError> for SurfaceError {
    fn from(e: teloxide::RequestError) -> Self {
        SurfaceError::Transport(e.to_string())
    }
}

impl From<std::io::Error> for SurfaceError {
    fn from(e: std::io::Error) -> Self {
        SurfaceError::Transport(e.to_string())
    }
}

/// What gets sent to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundArtifact {
    Video {
        path: PathBuf,
        thumbnail: Option<PathBuf>,
    },
    Audio {
        path: PathBuf,
        title: String,
        performer: String,
    },
    /// Caption only
    Text,
}

#[async_trait]
pub trait StatusSurface: Send + Sync {
    async fn create_indicator(&self, text: &str) -> Result<StatusHandle, SurfaceError>;

    async fn update_indicator(&self, handle: StatusHandle, text: &str) -> Result<(), SurfaceError>;

    async fn retire_indicator(&self, handle: StatusHandle) -> Result<(), SurfaceError>;

    async fn send_artifact(&self, artifact: &OutboundArtifact, caption: &str) -> Result<(), SurfaceError>;
}

/// An advisory status indicator. Every operation swallows surface errors.
pub struct Indicator<'a> {
    surface: &'a dyn StatusSurface,
    handle: Option<StatusHandle>,
}

impl<'a> Indicator<'a> {
    /// Creates a new indicator with `text`.
    pub async fn open(surface: &'a dyn StatusSurface, text: &str) -> Self {
        let handle = match surface.create_indicator(text).await {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::debug!("Status indicator not created: {}", e);
                None
            }
        };
        Self { surface, handle }
    }

    pub async fn update(&self, text: &str) {
        if let Some(handle) = self.handle {
            if let Err(e) = self.surface.update_indicator(handle, text).await {
                log::debug!("Status indicator not updated: {}", e);
            }
        }
    }

    pub async fn retire(self) {
        if let Some(handle) = self.handle {
            if let Err(e) = self.surface.retire_indicator(handle).await {
                log::debug!("Status indicator not retired: {}", e);
            }
        }
    }
}

/// Sends a plain notice, ignoring failures.
pub async fn notify(surface: &dyn StatusSurface, text: &str) {
    if let Err(e) = surface.send_artifact(&OutboundArtifact::Text, text).await {
        log::warn!("Failed to send notice: {}", e);
    }
}
