use thiserror::Error;

/// Centralized application-level error type.
///
/// Pipeline stages carry their own typed failures (`ExtractionFailure`,
/// `UploadError`, ...); this enum covers everything around them: IO, HTTP,
/// configuration and the chat transport.
///
/// # Example
///
/// ```no_run
/// use mediarelay::core::error::AppError;
///
/// fn handle_error(err: AppError) {
///     eprintln!("Error: {}", err);
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// HTTP/Fetch errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// External process failures (spawn, timeout)
    #[error("Process error: {0}")]
    Process(String),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;
