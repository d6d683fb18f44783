//! Integration tests for the single-item pipeline
//!
//! Run with: cargo test --test pipeline_test

mod common;

use std::sync::Arc;

use common::*;
use mediarelay::download::delivery::{DeliveryFailure, DeliveryOutcome};
use mediarelay::download::messages;
use mediarelay::download::status::OutboundArtifact;
use mediarelay::download::{JobError, JobIntent};

const URL: &str = "https://www.youtube.com/watch?v=abc123";

#[tokio::test]
async fn test_small_video_is_sent_inline_and_workspace_released() {
    let temp = tempfile::tempdir().unwrap();
    let extractor = Arc::new(MockExtractor::new().with(URL, MockBehavior::ok(5 * MB)));
    let uploader = Arc::new(FakeUploader::ok("https://gofile.io/d/unused"));
    let relay = relay(test_config(temp.path()), extractor.clone(), uploader.clone());
    let status = RecordingStatus::new();

    let outcome = relay
        .run_single_job(&status, URL, JobIntent::SingleVideo, None)
        .await
        .unwrap();

    assert!(matches!(outcome, DeliveryOutcome::DeliveredInline));
    assert!(uploader.uploads().is_empty());

    let sent = status.sent();
    assert_eq!(sent.len(), 1);
    match &sent[0] {
        (OutboundArtifact::Video { path, thumbnail }, caption) => {
            assert_eq!(path.file_name().unwrap(), "Test Video.mp4");
            assert!(thumbnail.is_none());
            assert_eq!(caption, &messages::video_caption("Test Video", "Test Channel", URL));
        }
        other => panic!("unexpected artifact: {:?}", other),
    }

    // Indicator retired after the inline transfer
    assert_eq!(status.retired_count(), 1);
    assert_eq!(relay.workspaces().outstanding(), 0);
    for ws in extractor.workspaces() {
        assert!(!ws.exists(), "workspace {} left behind", ws.display());
    }
    assert_eq!(leftover_entries(temp.path()), 0);
}

#[tokio::test]
async fn test_audio_job_sends_audio_with_metadata() {
    let temp = tempfile::tempdir().unwrap();
    let extractor = Arc::new(MockExtractor::new());
    let relay = relay(
        test_config(temp.path()),
        extractor,
        Arc::new(FakeUploader::ok("https://gofile.io/d/x")),
    );
    let status = RecordingStatus::new();

    let outcome = relay
        .run_single_job(&status, "https://music.youtube.com/watch?v=song", JobIntent::SingleAudio, None)
        .await
        .unwrap();
    assert!(outcome.is_delivered());

    let sent = status.sent();
    assert_eq!(
        sent[0],
        (
            OutboundArtifact::Audio {
                path: sent_path(&sent[0].0),
                title: "Test Video".into(),
                performer: "Test Channel".into(),
            },
            messages::audio_caption("Test Video", "Test Channel"),
        )
    );
    assert!(sent_path(&sent[0].0).to_string_lossy().ends_with(".mp3"));
}

fn sent_path(artifact: &OutboundArtifact) -> std::path::PathBuf {
    match artifact {
        OutboundArtifact::Video { path, .. } | OutboundArtifact::Audio { path, .. } => path.clone(),
        OutboundArtifact::Text => panic!("text has no path"),
    }
}

#[tokio::test]
async fn test_size_exactly_at_ceiling_goes_inline() {
    let temp = tempfile::tempdir().unwrap();
    let extractor = Arc::new(MockExtractor::new().with(URL, MockBehavior::ok(49 * MB)));
    let uploader = Arc::new(FakeUploader::ok("https://gofile.io/d/unused"));
    let relay = relay(test_config(temp.path()), extractor, uploader.clone());
    let status = RecordingStatus::new();

    let outcome = relay
        .run_single_job(&status, URL, JobIntent::SingleVideo, None)
        .await
        .unwrap();

    assert!(matches!(outcome, DeliveryOutcome::DeliveredInline));
    assert!(uploader.uploads().is_empty());
}

#[tokio::test]
async fn test_size_above_ceiling_is_uploaded() {
    let temp = tempfile::tempdir().unwrap();
    let size = (49.01 * MB as f64) as u64;
    let extractor = Arc::new(MockExtractor::new().with(URL, MockBehavior::ok(size)));
    let uploader = Arc::new(FakeUploader::ok("https://gofile.io/d/Ab12"));
    let relay = relay(test_config(temp.path()), extractor, uploader.clone());
    let status = RecordingStatus::new();

    let outcome = relay
        .run_single_job(&status, URL, JobIntent::SingleVideo, None)
        .await
        .unwrap();

    match outcome {
        DeliveryOutcome::DeliveredViaRemoteUpload(link) => assert_eq!(link, "https://gofile.io/d/Ab12"),
        other => panic!("expected remote upload, got {:?}", other),
    }

    // The file still existed with its full size when it was uploaded
    let uploads = uploader.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].1, size);

    assert!(status
        .texts()
        .contains(&messages::large_file_uploading(size as f64 / MB as f64)));
    assert_eq!(
        status.sent(),
        vec![(OutboundArtifact::Text, messages::uploaded_remote("https://gofile.io/d/Ab12"))]
    );
    assert_eq!(relay.workspaces().outstanding(), 0);
}

#[tokio::test]
async fn test_upload_failure_reports_uniform_message() {
    let temp = tempfile::tempdir().unwrap();
    let extractor = Arc::new(MockExtractor::new().with(URL, MockBehavior::ok(60 * MB)));
    let relay = relay(test_config(temp.path()), extractor, Arc::new(FakeUploader::failing()));
    let status = RecordingStatus::new();

    let outcome = relay
        .run_single_job(&status, URL, JobIntent::SingleVideo, None)
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        DeliveryOutcome::DeliveryFailed(DeliveryFailure::Upload(_))
    ));
    let last = status.texts().pop().unwrap();
    assert_eq!(last, messages::plain(messages::UPLOAD_ERROR));
    assert!(!last.contains("connection reset"));
    assert_eq!(status.retired_count(), 0);
    assert_eq!(relay.workspaces().outstanding(), 0);
}

#[tokio::test]
async fn test_inline_transfer_failure_is_reported() {
    let temp = tempfile::tempdir().unwrap();
    let extractor = Arc::new(MockExtractor::new());
    let relay = relay(
        test_config(temp.path()),
        extractor,
        Arc::new(FakeUploader::ok("https://gofile.io/d/x")),
    );
    let status = RecordingStatus::failing_sends();

    let outcome = relay
        .run_single_job(&status, URL, JobIntent::SingleVideo, None)
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        DeliveryOutcome::DeliveryFailed(DeliveryFailure::Transfer(_))
    ));
    let texts = status.texts();
    assert_eq!(texts.last().unwrap(), &messages::plain(messages::DELIVERY_ERROR));
    assert!(texts.iter().all(|t| !t.contains("too big")));
    assert_eq!(relay.workspaces().outstanding(), 0);
}

#[tokio::test]
async fn test_extraction_failure_releases_workspace() {
    let temp = tempfile::tempdir().unwrap();
    let extractor = Arc::new(MockExtractor::new().with(URL, MockBehavior::Fail("ERROR: Private video".into())));
    let relay = relay(
        test_config(temp.path()),
        extractor.clone(),
        Arc::new(FakeUploader::ok("https://gofile.io/d/x")),
    );
    let status = RecordingStatus::new();

    let result = relay.run_single_job(&status, URL, JobIntent::SingleVideo, None).await;

    assert!(matches!(result, Err(JobError::Extraction(_))));
    assert!(status.sent().is_empty());
    let last = status.texts().pop().unwrap();
    assert!(last.contains("Failed to download the content"));
    assert!(!last.contains("Private video"));

    assert_eq!(relay.workspaces().acquired_count(), 1);
    assert_eq!(relay.workspaces().released_count(), 1);
    assert!(!extractor.workspaces()[0].exists());
}

#[tokio::test]
async fn test_workspace_released_when_extractor_panics() {
    let temp = tempfile::tempdir().unwrap();
    let extractor = Arc::new(MockExtractor::new().with(URL, MockBehavior::Panic));
    let relay = Arc::new(relay(
        test_config(temp.path()),
        extractor.clone(),
        Arc::new(FakeUploader::ok("https://gofile.io/d/x")),
    ));
    let status = Arc::new(RecordingStatus::new());

    let job = {
        let relay = Arc::clone(&relay);
        let status = Arc::clone(&status);
        tokio::spawn(async move {
            relay
                .run_single_job(status.as_ref(), URL, JobIntent::SingleVideo, None)
                .await
                .map(|_| ())
        })
    };

    let err = job.await.unwrap_err();
    assert!(err.is_panic());
    assert_eq!(relay.workspaces().outstanding(), 0);
    assert!(!extractor.workspaces()[0].exists());
    assert_eq!(leftover_entries(temp.path()), 0);
}

#[tokio::test]
async fn test_workspace_allocation_failure() {
    let temp = tempfile::tempdir().unwrap();
    let not_a_dir = temp.path().join("file");
    std::fs::write(&not_a_dir, b"x").unwrap();

    let extractor = Arc::new(MockExtractor::new());
    let relay = relay(
        test_config(&not_a_dir),
        extractor.clone(),
        Arc::new(FakeUploader::ok("https://gofile.io/d/x")),
    );
    let status = RecordingStatus::new();

    let result = relay.run_single_job(&status, URL, JobIntent::SingleVideo, None).await;

    assert!(matches!(result, Err(JobError::Workspace(_))));
    assert!(extractor.calls().is_empty());
    assert_eq!(
        status.texts().pop().unwrap(),
        messages::plain(messages::GENERIC_ERROR)
    );
}

#[tokio::test]
async fn test_status_sequence_for_inline_video() {
    let temp = tempfile::tempdir().unwrap();
    let relay = relay(
        test_config(temp.path()),
        Arc::new(MockExtractor::new()),
        Arc::new(FakeUploader::ok("https://gofile.io/d/x")),
    );
    let status = RecordingStatus::new();

    relay
        .run_single_job(&status, URL, JobIntent::SingleVideo, None)
        .await
        .unwrap();

    let events = status.events();
    assert_eq!(events[0], StatusEvent::Created(1, messages::processing_link()));
    assert_eq!(events[1], StatusEvent::Updated(1, messages::starting_download()));
    assert!(events.contains(&StatusEvent::Updated(
        1,
        messages::download_complete_sending(mediarelay::download::extractor::MediaKind::Video)
    )));
    assert_eq!(events.last().unwrap(), &StatusEvent::Retired(1));
}
