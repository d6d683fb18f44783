use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use clap::{Parser, Subcommand};

use crate::download::status::{OutboundArtifact, StatusHandle, StatusSurface, SurfaceError};

#[derive(Parser)]
#[command(name = "mediarelay")]
#[command(author, version, about = "Telegram relay for YouTube, YouTube Music and Instagram media", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot (long polling)
    Run,

    /// Classify a link and print its flat playlist manifest
    Probe {
        /// Link to inspect
        url: String,
    },

    /// Run the single-item pipeline locally and save the result
    Fetch {
        /// Link to fetch
        url: String,

        /// Extract MP3 audio instead of video
        #[arg(long)]
        audio: bool,

        /// Directory the delivered file is copied to
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Drops MarkdownV2 escapes for terminal output
pub fn strip_markdown_escapes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Status surface that prints to stdout and copies delivered files into
/// `output_dir`.
pub struct ConsoleStatus {
    output_dir: PathBuf,
    next_handle: AtomicI64,
}

impl ConsoleStatus {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            next_handle: AtomicI64::new(1),
        }
    }

    async fn save(&self, path: &Path) -> Result<PathBuf, SurfaceError> {
        let name = path
            .file_name()
            .ok_or_else(|| SurfaceError::Transport(format!("no file name in {}", path.display())))?;
        fs_err::tokio::create_dir_all(&self.output_dir).await?;
        let target = self.output_dir.join(name);
        fs_err::tokio::copy(path, &target).await?;
        Ok(target)
    }
}

#[async_trait]
impl StatusSurface for ConsoleStatus {
    async fn create_indicator(&self, text: &str) -> Result<StatusHandle, SurfaceError> {
        let handle = StatusHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        println!("[{}] {}", handle.0, strip_markdown_escapes(text));
        Ok(handle)
    }

    async fn update_indicator(&self, handle: StatusHandle, text: &str) -> Result<(), SurfaceError> {
        println!("[{}] {}", handle.0, strip_markdown_escapes(text));
        Ok(())
    }

    async fn retire_indicator(&self, _handle: StatusHandle) -> Result<(), SurfaceError> {
        Ok(())
    }

    async fn send_artifact(&self, artifact: &OutboundArtifact, caption: &str) -> Result<(), SurfaceError> {
        match artifact {
            OutboundArtifact::Video { path, .. } | OutboundArtifact::Audio { path, .. } => {
                let saved = self.save(path).await?;
                println!("{}\nSaved to {}", strip_markdown_escapes(caption), saved.display());
            }
            OutboundArtifact::Text => println!("{}", strip_markdown_escapes(caption)),
        }
        Ok(())
    }
}
