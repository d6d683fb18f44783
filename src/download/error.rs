use thiserror::Error;

/// User-facing text for any extraction failure
pub const UNAVAILABLE_MESSAGE: &str =
    "⚠️ Failed to download the content. The link may be private, invalid, or temporarily unavailable.";

/// Why an extraction produced no artifact.
///
/// All variants collapse to [`UNAVAILABLE_MESSAGE`] for the user; the
/// variant and its detail are kept for logs.
#[derive(Debug, Error)]
pub enum ExtractionFailure {
    /// The extractor binary could not be started
    #[error("extractor not found: {0}")]
    ToolNotFound(String),
    /// Non-zero exit or unexpected process failure
    #[error("extractor failed: {0}")]
    Process(String),
    /// Content is private, removed, geo-blocked or needs sign-in
    #[error("content unavailable: {0}")]
    Unavailable(String),
    /// Connection problems on the extractor side
    #[error("network error: {0}")]
    Network(String),
    /// The extractor reported success but no media file exists
    #[error("no media file produced: {0}")]
    FileNotFound(String),
    /// Extractor output could not be parsed
    #[error("malformed extractor output: {0}")]
    Malformed(String),
    #[error("extractor timed out: {0}")]
    Timeout(String),
}

impl ExtractionFailure {
    /// Returns subcategory for log labels
    pub fn subcategory(&self) -> &'static str {
        match self {
            ExtractionFailure::ToolNotFound(_) => "tool_not_found",
            ExtractionFailure::Process(_) => "process",
            ExtractionFailure::Unavailable(_) => "unavailable",
            ExtractionFailure::Network(_) => "network",
            ExtractionFailure::FileNotFound(_) => "file_not_found",
            ExtractionFailure::Malformed(_) => "malformed",
            ExtractionFailure::Timeout(_) => "timeout",
        }
    }

    /// Uniform user-safe text; never contains extractor output
    pub fn user_message(&self) -> &'static str {
        UNAVAILABLE_MESSAGE
    }

    /// Classifies a failed yt-dlp run from its stderr.
    pub fn from_stderr(stderr: &str) -> Self {
        let lower = stderr.to_lowercase();
        let detail = last_error_line(stderr);

        if lower.contains("private video")
            || lower.contains("video unavailable")
            || lower.contains("this video is not available")
            || lower.contains("video is private")
            || lower.contains("video has been removed")
            || lower.contains("this video does not exist")
            || lower.contains("sign in to confirm")
            || lower.contains("login required")
            || lower.contains("http error 403")
            || lower.contains("http error 404")
            || lower.contains("unsupported url")
        {
            return ExtractionFailure::Unavailable(detail);
        }

        if lower.contains("timed out")
            || lower.contains("timeout")
            || lower.contains("connection")
            || lower.contains("network")
            || lower.contains("socket")
            || lower.contains("dns")
            || lower.contains("failed to connect")
        {
            return ExtractionFailure::Network(detail);
        }

        ExtractionFailure::Process(detail)
    }
}

/// Picks the most informative line of yt-dlp stderr for logs.
fn last_error_line(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .find(|l| l.contains("ERROR"))
        .or_else(|| stderr.lines().rev().find(|l| !l.trim().is_empty()))
        .unwrap_or("no stderr output")
        .trim()
        .to_string()
}
