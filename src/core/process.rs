//! Process execution utilities with timeout support
//!
//! Hung yt-dlp probes must not block a chat forever, so short-lived tool
//! invocations go through [`run_with_timeout`].

use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

use crate::core::error::AppError;

/// Run an async Command with a timeout.
///
/// The child is killed when the timeout elapses.
pub async fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<Output, AppError> {
    cmd.kill_on_drop(true);
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(AppError::Io(e)),
        Err(_) => Err(AppError::Process(format!(
            "Process timed out after {}s",
            timeout.as_secs()
        ))),
    }
}
