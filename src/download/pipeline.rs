//! Single-item pipeline: workspace → extraction → thumbnail → delivery.
//!
//! [`Relay`] owns every pipeline component and exposes the two job entry
//! points, [`Relay::run_single_job`] and [`Relay::run_batch_job`] (the
//! latter lives in `playlist.rs`), plus [`Relay::handle_link`] which
//! classifies a chat link and dispatches it.

use crate::core::config::Config;
use crate::download::delivery::{DeliveryJob, DeliveryOutcome, DeliveryRouter};
use crate::download::error::ExtractionFailure;
use crate::download::extractor::{
    ArtifactExtractor, ExtractOptions, ExtractionProgress, Extractor, MediaKind, PlaylistManifest,
};
use crate::download::messages;
use crate::download::playlist::BatchSummary;
use crate::download::source::SourceKind;
use crate::download::status::{Indicator, StatusSurface};
use crate::download::thumbnail::ThumbnailProcessor;
use crate::download::upload::{GofileClient, RemoteUploader};
use crate::download::workspace::{WorkspaceError, WorkspaceManager};
use crate::download::ytdlp::YtDlpExtractor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// What the user asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum JobIntent {
    SingleVideo,
    SingleAudio,
    PlaylistVideo,
    PlaylistAudio,
}

impl JobIntent {
    pub fn media_kind(self) -> MediaKind {
        match self {
            JobIntent::SingleVideo | JobIntent::PlaylistVideo => MediaKind::Video,
            JobIntent::SingleAudio | JobIntent::PlaylistAudio => MediaKind::Audio,
        }
    }

    pub fn is_batch(self) -> bool {
        matches!(self, JobIntent::PlaylistVideo | JobIntent::PlaylistAudio)
    }

    /// Intent used for each item of a batch
    pub fn item_intent(self) -> JobIntent {
        match self.media_kind() {
            MediaKind::Video => JobIntent::SingleVideo,
            MediaKind::Audio => JobIntent::SingleAudio,
        }
    }

    pub fn extract_options(self, credentials: Option<PathBuf>) -> ExtractOptions {
        match self.media_kind() {
            MediaKind::Video => ExtractOptions::video(credentials),
            MediaKind::Audio => ExtractOptions::audio(credentials),
        }
    }
}

/// Why a job produced no delivery attempt
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error(transparent)]
    Extraction(#[from] ExtractionFailure),
    #[error("job panicked: {0}")]
    Panicked(String),
}

impl JobError {
    pub fn user_message(&self) -> &'static str {
        match self {
            JobError::Workspace(e) => e.user_message(),
            JobError::Extraction(e) => e.user_message(),
            JobError::Panicked(_) => messages::GENERIC_ERROR,
        }
    }

    /// Stage label for logs
    pub fn stage(&self) -> &'static str {
        match self {
            JobError::Workspace(_) => "workspace",
            JobError::Extraction(_) => "extraction",
            JobError::Panicked(_) => "panic",
        }
    }
}

/// Where an item sits, which drives its texts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ItemContext {
    Single,
    BatchItem { index: usize, total: usize },
}

/// Result of handling one chat link
#[derive(Debug)]
pub enum LinkOutcome {
    Ignored,
    Single(Result<DeliveryOutcome, JobError>),
    Batch(Result<BatchSummary, JobError>),
}

/// The download-and-deliver pipeline with all its components.
#[derive(Clone)]
pub struct Relay {
    pub(crate) config: Arc<Config>,
    pub(crate) extractor: ArtifactExtractor,
    pub(crate) thumbnails: ThumbnailProcessor,
    pub(crate) router: DeliveryRouter,
    pub(crate) workspaces: WorkspaceManager,
}

impl Relay {
    pub fn new(config: Arc<Config>, extractor: Arc<dyn Extractor>, uploader: Arc<dyn RemoteUploader>) -> Self {
        Self {
            extractor: ArtifactExtractor::new(extractor, config.status_update_interval),
            thumbnails: ThumbnailProcessor::new(config.thumbnail.clone()),
            router: DeliveryRouter::new(uploader, config.max_inline_transfer_mb),
            workspaces: WorkspaceManager::new(config.temp_root.clone()),
            config,
        }
    }

    /// Production wiring: yt-dlp extractor and Gofile uploader.
    pub fn from_config(config: Arc<Config>) -> Self {
        let extractor = Arc::new(YtDlpExtractor::from_config(&config));
        let uploader = Arc::new(GofileClient::new(config.upload.clone()));
        Self::new(config, extractor, uploader)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.workspaces
    }

    /// Lists the entries behind `url` without downloading anything.
    pub async fn probe(&self, url: &str) -> Result<PlaylistManifest, ExtractionFailure> {
        let options = JobIntent::SingleVideo.extract_options(self.config.credentials_path.clone());
        self.extractor.probe(url, &options).await
    }

    /// Fetches and delivers one item.
    ///
    /// Failures are reported to the user through `status` before being
    /// returned.
    pub async fn run_single_job(
        &self,
        status: &dyn StatusSurface,
        url: &str,
        intent: JobIntent,
        credentials: Option<&Path>,
    ) -> Result<DeliveryOutcome, JobError> {
        let indicator = Indicator::open(status, &messages::processing_link()).await;
        self.single_with_indicator(status, indicator, url, intent.item_intent(), credentials)
            .await
    }

    pub(crate) async fn single_with_indicator(
        &self,
        status: &dyn StatusSurface,
        indicator: Indicator<'_>,
        url: &str,
        intent: JobIntent,
        credentials: Option<&Path>,
    ) -> Result<DeliveryOutcome, JobError> {
        log::info!("[JOB] {} {}", intent, url);
        self.process_item(status, indicator, url, intent, credentials, ItemContext::Single)
            .await
    }

    /// Runs one item through the whole pipeline. The workspace is released
    /// on every exit path, including panics.
    pub(crate) async fn process_item(
        &self,
        status: &dyn StatusSurface,
        indicator: Indicator<'_>,
        url: &str,
        intent: JobIntent,
        credentials: Option<&Path>,
        context: ItemContext,
    ) -> Result<DeliveryOutcome, JobError> {
        let workspace = match self.workspaces.acquire().await {
            Ok(ws) => ws,
            Err(e) => {
                log::error!("[JOB] workspace allocation failed for {}: {}", url, e);
                indicator.update(&messages::plain(e.user_message())).await;
                return Err(e.into());
            }
        };

        indicator.update(&messages::starting_download()).await;
        let options = intent.extract_options(credentials.map(Path::to_path_buf));

        let extraction = {
            let (mut progress_tx, mut progress_rx) = mpsc::unbounded_channel::<ExtractionProgress>();
            let fut = self
                .extractor
                .extract(url, &options, workspace.path(), &mut progress_tx);
            tokio::pin!(fut);

            loop {
                tokio::select! {
                    result = &mut fut => break result,
                    Some(progress) = progress_rx.recv() => {
                        indicator.update(&messages::download_progress(&progress.summary())).await;
                    }
                }
            }
        };

        let mut artifact = match extraction {
            Ok(artifact) => artifact,
            Err(e) => {
                log::error!(
                    "[JOB] extraction failed for {} ({}): {}",
                    url,
                    e.subcategory(),
                    e
                );
                let text = match context {
                    ItemContext::Single => messages::plain(e.user_message()),
                    ItemContext::BatchItem { index, total } => messages::batch_item_failed(index, total),
                };
                indicator.update(&text).await;
                workspace.release();
                return Err(e.into());
            }
        };

        if intent.media_kind() == MediaKind::Video {
            if let Some(thumbnail_url) = artifact.thumbnail_url.clone() {
                indicator.update(&messages::processing_thumbnail()).await;
                artifact.thumbnail_path = self.thumbnails.process(&thumbnail_url, workspace.path()).await;
            }
        }

        let job = delivery_job(url, intent.media_kind(), context, &artifact.title, &artifact.author);
        let outcome = self.router.deliver(status, indicator, &artifact, &job).await;

        workspace.release();
        Ok(outcome)
    }

    /// Classifies a chat link and runs the matching job.
    pub async fn handle_link(&self, status: &dyn StatusSurface, url: &str) -> LinkOutcome {
        let kind = SourceKind::classify(url);
        if !kind.is_supported() {
            log::info!("Ignoring unsupported link: {}", url);
            return LinkOutcome::Ignored;
        }

        let indicator = Indicator::open(status, &messages::processing_link()).await;
        let credentials = self.config.credentials_path.as_deref();

        match kind {
            SourceKind::Audio => LinkOutcome::Single(
                self.single_with_indicator(status, indicator, url, JobIntent::SingleAudio, credentials)
                    .await,
            ),
            SourceKind::SocialPost => LinkOutcome::Single(
                self.single_with_indicator(status, indicator, url, JobIntent::SingleVideo, credentials)
                    .await,
            ),
            SourceKind::Video => {
                let options = JobIntent::SingleVideo.extract_options(credentials.map(Path::to_path_buf));
                match self.extractor.probe(url, &options).await {
                    Ok(manifest) if manifest.is_playlist() => LinkOutcome::Batch(
                        self.batch_with_manifest(status, indicator, url, JobIntent::PlaylistVideo, manifest)
                            .await,
                    ),
                    Ok(_) => LinkOutcome::Single(
                        self.single_with_indicator(status, indicator, url, JobIntent::SingleVideo, credentials)
                            .await,
                    ),
                    Err(e) => {
                        log::error!("[JOB] probe failed for {} ({}): {}", url, e.subcategory(), e);
                        indicator.update(&messages::plain(e.user_message())).await;
                        LinkOutcome::Single(Err(e.into()))
                    }
                }
            }
            SourceKind::Unrecognized => LinkOutcome::Ignored,
        }
    }
}

fn delivery_job(url: &str, kind: MediaKind, context: ItemContext, title: &str, author: &str) -> DeliveryJob {
    match context {
        ItemContext::Single => DeliveryJob {
            source_url: url.to_string(),
            media_kind: kind,
            caption: match kind {
                MediaKind::Video => messages::video_caption(title, author, url),
                MediaKind::Audio => messages::audio_caption(title, author),
            },
            sending_text: messages::download_complete_sending(kind),
            batch_item: false,
            failure_text: None,
        },
        ItemContext::BatchItem { index, total } => DeliveryJob {
            source_url: url.to_string(),
            media_kind: kind,
            caption: messages::batch_item_caption(index, total, title, author),
            sending_text: messages::batch_item_sending(index, total),
            batch_item: true,
            failure_text: Some(messages::batch_item_error(index, total)),
        },
    }
}
