//! Common test utilities
//!
//! Shared across all integration tests: a scripted extractor, a status
//! surface that records every call, and an uploader that never touches the
//! network.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use mediarelay::core::config::{BatchConfig, Config};
use mediarelay::download::error::ExtractionFailure;
use mediarelay::download::extractor::{
    ExtractOptions, ExtractionProgress, Extractor, ManifestEntry, ManifestKind, MediaKind, PlaylistManifest,
    ProgressSink, RawExtraction,
};
use mediarelay::download::status::{OutboundArtifact, StatusHandle, StatusSurface, SurfaceError};
use mediarelay::download::upload::{RemoteUploader, UploadError};
use mediarelay::download::Relay;

pub const MB: u64 = 1024 * 1024;

// ============================================================================
// Extractor
// ============================================================================

/// What the mock does for one URL
#[derive(Debug, Clone)]
pub enum MockBehavior {
    Succeed { size: u64, title: String },
    Fail(String),
    Panic,
}

impl MockBehavior {
    pub fn ok(size: u64) -> Self {
        MockBehavior::Succeed {
            size,
            title: "Test Video".to_string(),
        }
    }
}

/// Extractor driven by a per-URL script. Unknown URLs succeed with a 1 MB
/// file.
#[derive(Default)]
pub struct MockExtractor {
    behaviors: Mutex<HashMap<String, MockBehavior>>,
    manifests: Mutex<HashMap<String, PlaylistManifest>>,
    calls: Mutex<Vec<String>>,
    workspaces: Mutex<Vec<PathBuf>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, url: &str, behavior: MockBehavior) -> Self {
        self.behaviors.lock().unwrap().insert(url.to_string(), behavior);
        self
    }

    pub fn with_manifest(self, url: &str, manifest: PlaylistManifest) -> Self {
        self.manifests.lock().unwrap().insert(url.to_string(), manifest);
        self
    }

    /// URLs passed to `extract`, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Workspace directories handed to `extract`
    pub fn workspaces(&self) -> Vec<PathBuf> {
        self.workspaces.lock().unwrap().clone()
    }
}

#[async_trait]
impl Extractor for MockExtractor {
    async fn extract(
        &self,
        url: &str,
        options: &ExtractOptions,
        workspace: &Path,
        progress: &mut dyn ProgressSink,
    ) -> Result<RawExtraction, ExtractionFailure> {
        self.calls.lock().unwrap().push(url.to_string());
        self.workspaces.lock().unwrap().push(workspace.to_path_buf());

        let behavior = self
            .behaviors
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| MockBehavior::ok(MB));

        match behavior {
            MockBehavior::Succeed { size, title } => {
                progress.on_progress(&ExtractionProgress {
                    percent: "100.0%".into(),
                    speed: "1.00MiB/s".into(),
                    eta: "00:00".into(),
                });
                let ext = match options.media_kind {
                    MediaKind::Video => "mp4",
                    MediaKind::Audio => "mp3",
                };
                let path = workspace.join(format!("abc123.{}", ext));
                let file = std::fs::File::create(&path).unwrap();
                file.set_len(size).unwrap();
                Ok(RawExtraction {
                    reported_path: Some(path),
                    title: Some(title),
                    uploader: Some("Test Channel".into()),
                    uploader_id: None,
                    thumbnail: None,
                })
            }
            MockBehavior::Fail(detail) => Err(ExtractionFailure::Unavailable(detail)),
            MockBehavior::Panic => panic!("extractor blew up on {}", url),
        }
    }

    async fn probe(&self, url: &str, _options: &ExtractOptions) -> Result<PlaylistManifest, ExtractionFailure> {
        Ok(self.manifests.lock().unwrap().get(url).cloned().unwrap_or(PlaylistManifest {
            kind: ManifestKind::Single,
            title: Some("Single".into()),
            entries: vec![],
        }))
    }
}

/// Playlist manifest with `n` entries `https://www.youtube.com/watch?v=item{i}` (1-based)
pub fn playlist(n: usize) -> PlaylistManifest {
    PlaylistManifest {
        kind: ManifestKind::Playlist,
        title: Some("Test Mix".into()),
        entries: (1..=n)
            .map(|i| ManifestEntry {
                url: Some(item_url(i)),
                webpage_url: None,
                title: Some(format!("Item {}", i)),
            })
            .collect(),
    }
}

pub fn item_url(i: usize) -> String {
    format!("https://www.youtube.com/watch?v=item{}", i)
}

// ============================================================================
// Status surface
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    Created(i64, String),
    Updated(i64, String),
    Retired(i64),
    Sent(OutboundArtifact, String),
}

/// Records every call; sends can be made to fail.
#[derive(Default)]
pub struct RecordingStatus {
    events: Mutex<Vec<StatusEvent>>,
    next_id: AtomicI64,
    fail_sends: AtomicBool,
}

impl RecordingStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_sends() -> Self {
        let status = Self::default();
        status.fail_sends.store(true, Ordering::SeqCst);
        status
    }

    pub fn events(&self) -> Vec<StatusEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Every artifact sent, with its caption
    pub fn sent(&self) -> Vec<(OutboundArtifact, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                StatusEvent::Sent(artifact, caption) => Some((artifact, caption)),
                _ => None,
            })
            .collect()
    }

    /// All texts shown to the user, in order
    pub fn texts(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                StatusEvent::Created(_, text) | StatusEvent::Updated(_, text) | StatusEvent::Sent(_, text) => {
                    Some(text)
                }
                StatusEvent::Retired(_) => None,
            })
            .collect()
    }

    pub fn retired_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, StatusEvent::Retired(_)))
            .count()
    }
}

#[async_trait]
impl StatusSurface for RecordingStatus {
    async fn create_indicator(&self, text: &str) -> Result<StatusHandle, SurfaceError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.events.lock().unwrap().push(StatusEvent::Created(id, text.to_string()));
        Ok(StatusHandle(id))
    }

    async fn update_indicator(&self, handle: StatusHandle, text: &str) -> Result<(), SurfaceError> {
        self.events
            .lock()
            .unwrap()
            .push(StatusEvent::Updated(handle.0, text.to_string()));
        Ok(())
    }

    async fn retire_indicator(&self, handle: StatusHandle) -> Result<(), SurfaceError> {
        self.events.lock().unwrap().push(StatusEvent::Retired(handle.0));
        Ok(())
    }

    async fn send_artifact(&self, artifact: &OutboundArtifact, caption: &str) -> Result<(), SurfaceError> {
        if self.fail_sends.load(Ordering::SeqCst) && !matches!(artifact, OutboundArtifact::Text) {
            return Err(SurfaceError::Transport("Bad Request: file is too big".into()));
        }
        self.events
            .lock()
            .unwrap()
            .push(StatusEvent::Sent(artifact.clone(), caption.to_string()));
        Ok(())
    }
}

// ============================================================================
// Uploader
// ============================================================================

/// Uploader returning a fixed link, or failing when `link` is `None`.
pub struct FakeUploader {
    link: Option<String>,
    uploads: Mutex<Vec<(PathBuf, u64)>>,
}

impl FakeUploader {
    pub fn ok(link: &str) -> Self {
        Self {
            link: Some(link.to_string()),
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            link: None,
            uploads: Mutex::new(Vec::new()),
        }
    }

    /// Uploaded paths with the size each file had at upload time
    pub fn uploads(&self) -> Vec<(PathBuf, u64)> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteUploader for FakeUploader {
    async fn upload(&self, file_path: &Path) -> Result<String, UploadError> {
        let size = std::fs::metadata(file_path).map(|m| m.len()).unwrap_or(0);
        self.uploads.lock().unwrap().push((file_path.to_path_buf(), size));
        match &self.link {
            Some(link) => Ok(link.clone()),
            None => Err(UploadError::Exhausted {
                attempts: 5,
                last_error: "connection reset".into(),
            }),
        }
    }
}

// ============================================================================
// Wiring
// ============================================================================

/// Config rooted at `temp_root` with no pause between playlist items
pub fn test_config(temp_root: &Path) -> Config {
    Config {
        temp_root: temp_root.to_path_buf(),
        batch: BatchConfig {
            max_playlist_size: 50,
            item_delay: Duration::ZERO,
        },
        status_update_interval: Duration::ZERO,
        ..Config::default()
    }
}

pub fn relay(config: Config, extractor: Arc<MockExtractor>, uploader: Arc<FakeUploader>) -> Relay {
    Relay::new(Arc::new(config), extractor, uploader)
}

/// Number of entries left under the temp root
pub fn leftover_entries(temp_root: &Path) -> usize {
    std::fs::read_dir(temp_root).map(|d| d.count()).unwrap_or(0)
}
