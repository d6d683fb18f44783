//! Production [`Extractor`] backed by the yt-dlp binary.

use crate::core::config::Config;
use crate::core::error::AppError;
use crate::core::process::run_with_timeout;
use crate::download::error::ExtractionFailure;
use crate::download::extractor::{
    ExtractOptions, ExtractionProgress, Extractor, ManifestEntry, ManifestKind, MediaKind, PlaylistManifest,
    ProgressSink, RawExtraction,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

/// Info dict printed after the final file is in place
#[derive(Debug, Deserialize)]
struct YtdlpInfoJson {
    #[serde(default)]
    filepath: Option<String>,
    #[serde(default, rename = "_filename")]
    filename: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default)]
    uploader_id: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
}

/// JSON structure from yt-dlp --flat-playlist -J
#[derive(Debug, Deserialize)]
struct YtdlpPlaylistJson {
    #[serde(default, rename = "_type")]
    kind: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    entries: Vec<YtdlpEntryJson>,
}

#[derive(Debug, Deserialize)]
struct YtdlpEntryJson {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    webpage_url: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

pub struct YtDlpExtractor {
    bin: String,
    probe_timeout: Duration,
}

impl YtDlpExtractor {
    pub fn new(bin: impl Into<String>, probe_timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            probe_timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.ytdl_bin.clone(), config.probe_timeout)
    }
}

/// Arguments for a full download into `workspace`
pub fn build_download_args(url: &str, options: &ExtractOptions, workspace: &Path) -> Vec<String> {
    let template = workspace.join("%(id)s.%(ext)s");
    let mut args: Vec<String> = vec![
        "--no-playlist".into(),
        "--newline".into(),
        "--progress".into(),
        "--no-warnings".into(),
        "-o".into(),
        template.to_string_lossy().into_owned(),
        "--print".into(),
        "after_move:%()j".into(),
    ];

    match options.media_kind {
        MediaKind::Video => {
            args.extend([
                "-f".to_string(),
                "bestvideo+bestaudio/best".to_string(),
                "--merge-output-format".to_string(),
                options.output_container.clone(),
            ]);
        }
        MediaKind::Audio => {
            args.extend([
                "--extract-audio".to_string(),
                "--audio-format".to_string(),
                options.output_container.clone(),
                "--audio-quality".to_string(),
                "0".to_string(),
            ]);
        }
    }

    add_cookies_args(&mut args, options.cookies_path.as_deref());
    args.push(url.to_string());
    args
}

/// Arguments for a flat probe
pub fn build_probe_args(url: &str, options: &ExtractOptions) -> Vec<String> {
    let mut args: Vec<String> = vec!["--flat-playlist".into(), "-J".into(), "--no-warnings".into()];
    add_cookies_args(&mut args, options.cookies_path.as_deref());
    args.push(url.to_string());
    args
}

fn add_cookies_args(args: &mut Vec<String>, cookies: Option<&Path>) {
    if let Some(path) = cookies {
        args.push("--cookies".into());
        args.push(path.to_string_lossy().into_owned());
    }
}

/// Parses a default yt-dlp progress line such as
/// `[download]  42.0% of ~ 10.00MiB at  1.50MiB/s ETA 00:05`.
pub fn parse_progress_line(line: &str) -> Option<ExtractionProgress> {
    if !line.contains("[download]") || !line.contains('%') {
        return None;
    }

    let parts: Vec<&str> = line.split_whitespace().collect();
    let percent = parts.iter().find(|p| p.ends_with('%'))?.to_string();
    let value_after = |key: &str| {
        parts
            .iter()
            .position(|p| *p == key)
            .and_then(|i| parts.get(i + 1))
            .map(|s| s.to_string())
            .unwrap_or_else(|| "N/A".to_string())
    };

    Some(ExtractionProgress {
        percent,
        speed: value_after("at"),
        eta: value_after("ETA"),
    })
}

fn parse_info_line(line: &str) -> Option<RawExtraction> {
    let trimmed = line.trim();
    if !trimmed.starts_with('{') {
        return None;
    }
    let info: YtdlpInfoJson = serde_json::from_str(trimmed).ok()?;
    Some(RawExtraction {
        reported_path: info.filepath.or(info.filename).map(PathBuf::from),
        title: info.title,
        uploader: info.uploader,
        uploader_id: info.uploader_id,
        thumbnail: info.thumbnail,
    })
}

/// Parses `--flat-playlist -J` output.
pub fn parse_manifest(json: &str) -> Result<PlaylistManifest, ExtractionFailure> {
    let parsed: YtdlpPlaylistJson =
        serde_json::from_str(json).map_err(|e| ExtractionFailure::Malformed(e.to_string()))?;

    let kind = match parsed.kind.as_deref() {
        Some("playlist") => ManifestKind::Playlist,
        _ => ManifestKind::Single,
    };

    Ok(PlaylistManifest {
        kind,
        title: parsed.title,
        entries: parsed
            .entries
            .into_iter()
            .map(|e| ManifestEntry {
                url: e.url,
                webpage_url: e.webpage_url,
                title: e.title,
            })
            .collect(),
    })
}

/// Reads lines from one stream, forwarding progress and keeping the rest.
async fn pump_lines<R>(reader: R, progress_tx: mpsc::UnboundedSender<ExtractionProgress>) -> Vec<String>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut kept = Vec::new();
    while let Ok(Some(line)) = lines.next_line().await {
        match parse_progress_line(&line) {
            Some(progress) => {
                let _ = progress_tx.send(progress);
            }
            None => kept.push(line),
        }
    }
    kept
}

fn spawn_failure(bin: &str, e: std::io::Error) -> ExtractionFailure {
    if e.kind() == std::io::ErrorKind::NotFound {
        ExtractionFailure::ToolNotFound(bin.to_string())
    } else {
        ExtractionFailure::Process(format!("failed to start {}: {}", bin, e))
    }
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    async fn extract(
        &self,
        url: &str,
        options: &ExtractOptions,
        workspace: &Path,
        progress: &mut dyn ProgressSink,
    ) -> Result<RawExtraction, ExtractionFailure> {
        let args = build_download_args(url, options, workspace);
        log::info!("[YTDLP] {} {} ({})", self.bin, url, options.media_kind);

        let mut child = Command::new(&self.bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_failure(&self.bin, e))?;

        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExtractionFailure::Process("stdout not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ExtractionFailure::Process("stderr not captured".into()))?;
        let stdout_task = tokio::spawn(pump_lines(stdout, progress_tx.clone()));
        let stderr_task = tokio::spawn(pump_lines(stderr, progress_tx));

        // Closes once both readers hit EOF
        while let Some(report) = progress_rx.recv().await {
            progress.on_progress(&report);
        }

        let stdout_lines = stdout_task.await.unwrap_or_default();
        let stderr_lines = stderr_task.await.unwrap_or_default();
        let status = child
            .wait()
            .await
            .map_err(|e| ExtractionFailure::Process(e.to_string()))?;

        if !status.success() {
            let stderr_text = stderr_lines.join("\n");
            log::error!("[YTDLP] {} failed for {}: {}", self.bin, url, stderr_text);
            return Err(ExtractionFailure::from_stderr(&stderr_text));
        }

        stdout_lines
            .iter()
            .rev()
            .find_map(|l| parse_info_line(l))
            .ok_or_else(|| ExtractionFailure::Malformed("no info JSON printed".into()))
    }

    async fn probe(&self, url: &str, options: &ExtractOptions) -> Result<PlaylistManifest, ExtractionFailure> {
        log::info!("Probing playlist structure of: {}", url);

        let mut cmd = Command::new(&self.bin);
        cmd.args(build_probe_args(url, options))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = run_with_timeout(&mut cmd, self.probe_timeout)
            .await
            .map_err(|e| match e {
                AppError::Io(io) => spawn_failure(&self.bin, io),
                AppError::Process(msg) => ExtractionFailure::Timeout(msg),
                other => ExtractionFailure::Process(other.to_string()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionFailure::from_stderr(&stderr));
        }

        parse_manifest(&String::from_utf8_lossy(&output.stdout))
    }
}
