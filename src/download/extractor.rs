//! Extraction abstraction and the adapter that turns raw extractor output
//! into a deliverable [`MediaArtifact`].
//!
//! The `Extractor` trait is the seam to the external tool (yt-dlp in
//! production, a mock in tests). [`ArtifactExtractor`] owns everything the
//! tool does not guarantee: locating the produced file, metadata defaults,
//! renaming, measuring the size and throttling progress reports.

use crate::core::utils::sanitize_filename;
use crate::download::error::ExtractionFailure;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

pub const DEFAULT_TITLE: &str = "No Title";
pub const DEFAULT_AUTHOR: &str = "Unknown";

/// Extensions recognized when scanning a workspace for the produced file
pub const MEDIA_EXTENSIONS: &[&str] = &["mp4", "mkv", "webm", "avi", "mov", "mp3", "m4a", "opus", "ogg"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
}

/// Options passed to the extractor for one fetch
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractOptions {
    pub media_kind: MediaKind,
    /// Container/codec of the final file (`mp4` for video, `mp3` for audio)
    pub output_container: String,
    /// Opaque cookies file, passed through unmodified
    pub cookies_path: Option<PathBuf>,
    /// Only list playlist entries, download nothing
    pub flatten_playlist: bool,
}

impl ExtractOptions {
    pub fn video(cookies_path: Option<PathBuf>) -> Self {
        Self {
            media_kind: MediaKind::Video,
            output_container: "mp4".to_string(),
            cookies_path,
            flatten_playlist: false,
        }
    }

    pub fn audio(cookies_path: Option<PathBuf>) -> Self {
        Self {
            media_kind: MediaKind::Audio,
            output_container: "mp3".to_string(),
            cookies_path,
            flatten_playlist: false,
        }
    }

    #[must_use]
    pub fn flattened(mut self) -> Self {
        self.flatten_playlist = true;
        self
    }
}

/// One progress report from the extractor, as display strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionProgress {
    pub percent: String,
    pub speed: String,
    pub eta: String,
}

impl ExtractionProgress {
    pub fn summary(&self) -> String {
        format!("Downloading: {} at {} (ETA: {})", self.percent, self.speed, self.eta)
    }
}

/// Receives progress reports during an extraction.
pub trait ProgressSink: Send {
    fn on_progress(&mut self, progress: &ExtractionProgress);
}

impl ProgressSink for mpsc::UnboundedSender<ExtractionProgress> {
    fn on_progress(&mut self, progress: &ExtractionProgress) {
        // Receiver gone means nobody is watching any more
        let _ = self.send(progress.clone());
    }
}

/// Sink that drops every report
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&mut self, _progress: &ExtractionProgress) {}
}

/// What the extraction tool reported, before normalization
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawExtraction {
    pub reported_path: Option<PathBuf>,
    pub title: Option<String>,
    pub uploader: Option<String>,
    pub uploader_id: Option<String>,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    Playlist,
    Single,
}

/// One entry of a flat playlist listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestEntry {
    pub url: Option<String>,
    pub webpage_url: Option<String>,
    pub title: Option<String>,
}

impl ManifestEntry {
    /// `url`, falling back to `webpage_url`
    pub fn source_url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .filter(|u| !u.is_empty())
            .or_else(|| self.webpage_url.as_deref().filter(|u| !u.is_empty()))
    }
}

/// Lightweight listing returned by a flat probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistManifest {
    pub kind: ManifestKind,
    pub title: Option<String>,
    pub entries: Vec<ManifestEntry>,
}

impl PlaylistManifest {
    pub fn is_playlist(&self) -> bool {
        self.kind == ManifestKind::Playlist
    }
}

/// External media extraction capability.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Fetches the media at `url` into `workspace`.
    async fn extract(
        &self,
        url: &str,
        options: &ExtractOptions,
        workspace: &Path,
        progress: &mut dyn ProgressSink,
    ) -> Result<RawExtraction, ExtractionFailure>;

    /// Lists what `url` refers to without downloading content.
    async fn probe(&self, url: &str, options: &ExtractOptions) -> Result<PlaylistManifest, ExtractionFailure>;
}

/// Normalized, deliverable extraction output
#[derive(Debug, Clone, PartialEq)]
pub struct MediaArtifact {
    pub file_path: PathBuf,
    pub title: String,
    pub author: String,
    /// Measured on disk after extraction
    pub size_bytes: u64,
    pub thumbnail_url: Option<String>,
    pub thumbnail_path: Option<PathBuf>,
}

/// Rate limiter for progress reports; one per extraction.
#[derive(Debug)]
pub struct ProgressThrottle {
    min_interval: Duration,
    last_emit: Option<Instant>,
}

impl ProgressThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_emit: None,
        }
    }

    /// Returns true when a report at `now` should be forwarded.
    pub fn should_emit(&mut self, now: Instant) -> bool {
        match self.last_emit {
            Some(last) if now.saturating_duration_since(last) < self.min_interval => false,
            _ => {
                self.last_emit = Some(now);
                true
            }
        }
    }
}

struct ThrottledSink<'a> {
    inner: &'a mut dyn ProgressSink,
    throttle: ProgressThrottle,
}

impl ProgressSink for ThrottledSink<'_> {
    fn on_progress(&mut self, progress: &ExtractionProgress) {
        if self.throttle.should_emit(Instant::now()) {
            log::info!("{}", progress.summary());
            self.inner.on_progress(progress);
        }
    }
}

/// Wraps an [`Extractor`] and normalizes its output.
#[derive(Clone)]
pub struct ArtifactExtractor {
    extractor: Arc<dyn Extractor>,
    status_update_interval: Duration,
}

impl ArtifactExtractor {
    pub fn new(extractor: Arc<dyn Extractor>, status_update_interval: Duration) -> Self {
        Self {
            extractor,
            status_update_interval,
        }
    }

    /// Runs the extractor and returns an artifact whose file exists.
    pub async fn extract(
        &self,
        url: &str,
        options: &ExtractOptions,
        workspace: &Path,
        progress: &mut dyn ProgressSink,
    ) -> Result<MediaArtifact, ExtractionFailure> {
        let mut sink = ThrottledSink {
            inner: progress,
            throttle: ProgressThrottle::new(self.status_update_interval),
        };
        let raw = self.extractor.extract(url, options, workspace, &mut sink).await?;

        let located = locate_media_file(raw.reported_path.as_deref(), workspace)
            .await
            .ok_or_else(|| ExtractionFailure::FileNotFound(workspace.display().to_string()))?;

        let title = non_blank(raw.title).unwrap_or_else(|| DEFAULT_TITLE.to_string());
        let author = non_blank(raw.uploader)
            .or_else(|| non_blank(raw.uploader_id))
            .unwrap_or_else(|| DEFAULT_AUTHOR.to_string());

        let file_path = rename_to_title(&located, &title).await;
        let size_bytes = fs_err::tokio::metadata(&file_path)
            .await
            .map_err(|e| ExtractionFailure::FileNotFound(e.to_string()))?
            .len();

        log::info!(
            "Extracted '{}' by {} ({} bytes) from {}",
            title,
            author,
            size_bytes,
            url
        );

        Ok(MediaArtifact {
            file_path,
            title,
            author,
            size_bytes,
            thumbnail_url: non_blank(raw.thumbnail),
            thumbnail_path: None,
        })
    }

    /// Flat playlist probe, passed straight through.
    pub async fn probe(&self, url: &str, options: &ExtractOptions) -> Result<PlaylistManifest, ExtractionFailure> {
        self.extractor.probe(url, &options.clone().flattened()).await
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Reported path if it exists, else the first media file in sorted order.
pub async fn locate_media_file(reported: Option<&Path>, workspace: &Path) -> Option<PathBuf> {
    if let Some(path) = reported {
        if fs_err::tokio::metadata(path).await.is_ok_and(|m| m.is_file()) {
            return Some(path.to_path_buf());
        }
        log::warn!(
            "Reported file {} does not exist, scanning {}",
            path.display(),
            workspace.display()
        );
    }

    let mut dir = fs_err::tokio::read_dir(workspace).await.ok()?;
    let mut candidates = Vec::new();
    while let Ok(Some(entry)) = dir.next_entry().await {
        let path = entry.path();
        let is_media = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| MEDIA_EXTENSIONS.contains(&ext.to_lowercase().as_str()));
        if is_media && path.is_file() {
            candidates.push(path);
        }
    }
    candidates.sort();
    candidates.into_iter().next()
}

/// Renames to `sanitize(title).ext` in the same directory; keeps the old path on failure.
async fn rename_to_title(path: &Path, title: &str) -> PathBuf {
    let Some(parent) = path.parent() else {
        return path.to_path_buf();
    };
    let file_name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}.{}", sanitize_filename(title), ext),
        None => sanitize_filename(title),
    };
    let target = parent.join(file_name);
    if target == path {
        return target;
    }

    match fs_err::tokio::rename(path, &target).await {
        Ok(()) => target,
        Err(e) => {
            log::warn!("Keeping original file name: {}", e);
            path.to_path_buf()
        }
    }
}
