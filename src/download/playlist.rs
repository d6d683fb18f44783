//! Playlist batches.
//!
//! A flat probe lists the entries, the size is checked against the
//! configured maximum, and every entry then runs through the single-item
//! pipeline in manifest order. One item's failure (or panic) is counted and
//! never aborts the batch.

use crate::download::delivery::DeliveryOutcome;
use crate::download::extractor::{ManifestKind, PlaylistManifest, DEFAULT_TITLE};
use crate::download::messages;
use crate::download::pipeline::{ItemContext, JobError, JobIntent, Relay};
use crate::download::status::{notify, Indicator, StatusSurface};
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::Path;

/// Lifecycle of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum BatchState {
    Created,
    SizeChecked,
    Rejected,
    Processing,
    Summarized,
}

/// Single entry in a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    /// `url` or `webpage_url` from the manifest
    pub url: Option<String>,
    pub title: String,
}

/// Final counters of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub total: usize,
    pub state: BatchState,
}

/// Ordered, bounded list of items plus their counters.
#[derive(Debug, Clone)]
pub struct PlaylistBatch {
    pub title: String,
    items: Vec<BatchItem>,
    found: usize,
    state: BatchState,
    succeeded: usize,
    failed: usize,
}

impl PlaylistBatch {
    pub fn from_manifest(manifest: &PlaylistManifest, source_url: &str) -> Self {
        let items: Vec<BatchItem> = match manifest.kind {
            ManifestKind::Playlist => manifest
                .entries
                .iter()
                .map(|entry| BatchItem {
                    url: entry.source_url().map(str::to_string),
                    title: entry.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string()),
                })
                .collect(),
            // A single video probed as a batch is a one-item batch
            ManifestKind::Single => vec![BatchItem {
                url: Some(source_url.to_string()),
                title: manifest.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            }],
        };

        Self {
            title: manifest.title.clone().unwrap_or_else(|| "Playlist".to_string()),
            found: items.len(),
            items,
            state: BatchState::Created,
            succeeded: 0,
            failed: 0,
        }
    }

    /// Rejects oversized batches; otherwise truncates to `max_items` and
    /// moves to `Processing`. Returns whether processing may start.
    pub fn check_size(&mut self, max_items: usize) -> bool {
        self.state = BatchState::SizeChecked;
        if self.found > max_items {
            self.state = BatchState::Rejected;
            return false;
        }
        self.items.truncate(max_items);
        self.state = BatchState::Processing;
        true
    }

    pub fn items(&self) -> &[BatchItem] {
        &self.items
    }

    /// Number of entries in the manifest
    pub fn found(&self) -> usize {
        self.found
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    fn record(&mut self, succeeded: bool) {
        if succeeded {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    fn finish(&mut self) {
        self.state = BatchState::Summarized;
    }

    pub fn summary(&self) -> BatchSummary {
        let total = if self.state == BatchState::Rejected {
            self.found
        } else {
            self.items.len()
        };
        BatchSummary {
            succeeded: self.succeeded,
            failed: self.failed,
            total,
            state: self.state,
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

impl Relay {
    /// Probes `url` and processes its entries as a batch.
    pub async fn run_batch_job(
        &self,
        status: &dyn StatusSurface,
        url: &str,
        intent: JobIntent,
    ) -> Result<BatchSummary, JobError> {
        let indicator = Indicator::open(status, &messages::processing_link()).await;
        let options = intent.extract_options(self.config.credentials_path.clone());

        let manifest = match self.extractor.probe(url, &options).await {
            Ok(manifest) => manifest,
            Err(e) => {
                log::error!("[BATCH] probe failed for {} ({}): {}", url, e.subcategory(), e);
                indicator.update(&messages::plain(e.user_message())).await;
                return Err(e.into());
            }
        };

        self.batch_with_manifest(status, indicator, url, intent, manifest).await
    }

    pub(crate) async fn batch_with_manifest(
        &self,
        status: &dyn StatusSurface,
        indicator: Indicator<'_>,
        url: &str,
        intent: JobIntent,
        manifest: PlaylistManifest,
    ) -> Result<BatchSummary, JobError> {
        let max_items = self.config.batch.max_playlist_size;
        let mut batch = PlaylistBatch::from_manifest(&manifest, url);

        if !batch.check_size(max_items) {
            log::warn!(
                "[BATCH] rejected {}: {} entries exceed the maximum of {}",
                url,
                batch.found(),
                max_items
            );
            indicator
                .update(&messages::playlist_too_large(max_items, batch.found()))
                .await;
            return Ok(batch.summary());
        }

        let total = batch.items().len();
        log::info!("[BATCH] '{}' with {} items from {}", batch.title, total, url);
        indicator.update(&messages::playlist_detected(&batch.title, total)).await;

        let credentials = self.config.credentials_path.as_deref();
        let item_intent = intent.item_intent();
        let items = batch.items().to_vec();

        for (position, item) in items.iter().enumerate() {
            let index = position + 1;
            let succeeded = self
                .run_batch_item(status, item, index, total, item_intent, credentials)
                .await;
            batch.record(succeeded);

            if item.url.is_some() && !self.config.batch.item_delay.is_zero() {
                tokio::time::sleep(self.config.batch.item_delay).await;
            }
        }

        batch.finish();
        let summary = batch.summary();
        log::info!(
            "[BATCH] done {}: {}/{} succeeded, {} failed",
            url,
            summary.succeeded,
            summary.total,
            summary.failed
        );
        notify(
            status,
            &messages::batch_summary(summary.succeeded, summary.failed, summary.total),
        )
        .await;

        Ok(summary)
    }

    /// Runs one entry; returns whether it was delivered. Never panics.
    async fn run_batch_item(
        &self,
        status: &dyn StatusSurface,
        item: &BatchItem,
        index: usize,
        total: usize,
        intent: JobIntent,
        credentials: Option<&Path>,
    ) -> bool {
        let Some(item_url) = item.url.as_deref() else {
            log::warn!("[BATCH] item {}/{} has no URL, skipping", index, total);
            return false;
        };

        let indicator = Indicator::open(status, &messages::batch_item_downloading(index, total, &item.title)).await;
        let context = ItemContext::BatchItem { index, total };
        let result = AssertUnwindSafe(self.process_item(status, indicator, item_url, intent, credentials, context))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(JobError::Panicked(panic_message(payload.as_ref()))));

        match result {
            Ok(DeliveryOutcome::DeliveryFailed(_)) => false,
            Ok(_) => true,
            Err(JobError::Panicked(message)) => {
                log::error!("[BATCH] item {}/{} ({}) panicked: {}", index, total, item_url, message);
                notify(status, &messages::batch_item_error(index, total)).await;
                false
            }
            Err(e) => {
                log::warn!("[BATCH] item {}/{} failed at {}: {}", index, total, e.stage(), e);
                false
            }
        }
    }
}
