//! Logging initialization and startup diagnostics

use anyhow::Result;
use simplelog::{ColorChoice, CombinedLogger, LevelFilter, TermLogger, TerminalMode, WriteLogger};
use std::fs::File;

use crate::core::config::Config;

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            simplelog::Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Info, simplelog::Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// State of the optional cookies file passed through to the extractor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialsStatus {
    NotConfigured,
    Found(std::path::PathBuf),
    Missing(std::path::PathBuf),
}

/// Inspects the configured credentials path without reading its contents
pub fn credentials_status(config: &Config) -> CredentialsStatus {
    match &config.credentials_path {
        None => CredentialsStatus::NotConfigured,
        Some(path) if path.exists() => {
            CredentialsStatus::Found(path.canonicalize().unwrap_or_else(|_| path.clone()))
        }
        Some(path) => CredentialsStatus::Missing(path.clone()),
    }
}

/// Logs the cookies configuration at application startup
pub fn log_credentials_configuration(config: &Config) {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("🍪 Cookies Configuration Check");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    match credentials_status(config) {
        CredentialsStatus::Found(path) => {
            log::info!("✅ YTDL_COOKIES_FILE: {}", path.display());
            log::info!("   File exists and will be passed to {}", config.ytdl_bin);
        }
        CredentialsStatus::Missing(path) => {
            log::error!("❌ YTDL_COOKIES_FILE: {} (FILE NOT FOUND!)", path.display());
            log::error!("   Current directory: {:?}", std::env::current_dir());
            log::error!("   Age-restricted and private content will fail to download");
        }
        CredentialsStatus::NotConfigured => {
            log::warn!("⚠️  YTDL_COOKIES_FILE: not set");
            log::warn!("   Public content only; set YTDL_COOKIES_FILE to pass site cookies through");
        }
    }

    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}
