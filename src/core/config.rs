//! Process-wide configuration.
//!
//! Everything is read once at startup into an immutable [`Config`] that is
//! handed to each component constructor. Pipeline code never touches the
//! environment directly.

use secrecy::SecretString;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Default yt-dlp binary name
pub const DEFAULT_YTDL_BIN: &str = "yt-dlp";

/// Default log file path
pub const DEFAULT_LOG_FILE: &str = "mediarelay.log";

/// Playlists with more entries than this are rejected outright
pub const DEFAULT_MAX_PLAYLIST_SIZE: usize = 50;

/// Largest file (in MB) sent through Telegram directly.
/// The Bot API caps uploads at 50 MB; one MB of headroom for the multipart envelope.
pub const DEFAULT_MAX_INLINE_TRANSFER_MB: f64 = 49.0;

/// Minimum seconds between forwarded download progress updates
pub const DEFAULT_STATUS_UPDATE_INTERVAL_SECS: f64 = 3.0;

/// Pause between playlist items to stay under Telegram's flood limits
pub const DEFAULT_PLAYLIST_ITEM_DELAY_SECS: u64 = 2;

/// Timeout for the flat-playlist probe
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 120;

/// Bot API client configuration
pub mod network {
    use std::time::Duration;

    /// Request timeout for the Bot API client. Inline transfers of up to
    /// 49 MB go through the same client.
    pub const TIMEOUT_SECS: u64 = 300;

    pub fn timeout() -> Duration {
        Duration::from_secs(TIMEOUT_SECS)
    }
}

/// Thumbnail configuration
pub mod thumbnail {
    /// Edge of the square thumbnail sent with videos
    pub const SIZE: u32 = 320;

    /// Timeout for fetching the source image
    pub const TIMEOUT_SECS: u64 = 20;
}

/// Remote upload (Gofile) configuration
pub mod upload {
    /// Directory endpoint that recommends an upload server
    pub const DIRECTORY_URL: &str = "https://api.gofile.io/getServer";

    /// Upload endpoint; `{server}` is replaced with the selected server name
    pub const URL_TEMPLATE: &str = "https://{server}.gofile.io/uploadFile";

    /// Total upload attempts (first try included)
    pub const MAX_ATTEMPTS: u32 = 5;

    /// Base for the exponential backoff between attempts (seconds)
    pub const BASE_DELAY_SECS: u64 = 5;

    /// Per-attempt upload timeout (seconds). Files may be several hundred MB.
    pub const TIMEOUT_SECS: u64 = 300;

    /// Timeout for the directory lookup (seconds)
    pub const DIRECTORY_TIMEOUT_SECS: u64 = 20;

    /// Number of `storeN` fallback servers
    pub const FALLBACK_POOL_SIZE: u32 = 9;

    /// Builds the fallback server pool (`store1`..`store9`)
    pub fn fallback_pool() -> Vec<String> {
        (1..=FALLBACK_POOL_SIZE).map(|n| format!("store{}", n)).collect()
    }
}

/// Thumbnail processor settings
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailConfig {
    pub size: u32,
    pub timeout: Duration,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            size: thumbnail::SIZE,
            timeout: Duration::from_secs(thumbnail::TIMEOUT_SECS),
        }
    }
}

/// Playlist batch settings
#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
    /// Playlists with more entries are rejected
    pub max_playlist_size: usize,
    /// Pause after each item that reached the transport
    pub item_delay: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_playlist_size: DEFAULT_MAX_PLAYLIST_SIZE,
            item_delay: Duration::from_secs(DEFAULT_PLAYLIST_ITEM_DELAY_SECS),
        }
    }
}

/// Remote upload client settings
#[derive(Debug, Clone, PartialEq)]
pub struct UploadConfig {
    pub directory_url: String,
    pub url_template: String,
    pub server_pool: Vec<String>,
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub timeout: Duration,
    pub directory_timeout: Duration,
}

impl UploadConfig {
    /// Upload endpoint for a given server name
    pub fn upload_url(&self, server: &str) -> String {
        self.url_template.replace("{server}", server)
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            directory_url: upload::DIRECTORY_URL.to_string(),
            url_template: upload::URL_TEMPLATE.to_string(),
            server_pool: upload::fallback_pool(),
            max_attempts: upload::MAX_ATTEMPTS,
            base_delay: Duration::from_secs(upload::BASE_DELAY_SECS),
            timeout: Duration::from_secs(upload::TIMEOUT_SECS),
            directory_timeout: Duration::from_secs(upload::DIRECTORY_TIMEOUT_SECS),
        }
    }
}

/// Immutable process configuration.
#[derive(Debug)]
pub struct Config {
    /// Telegram bot token (BOT_TOKEN or TELOXIDE_TOKEN)
    pub bot_token: SecretString,
    /// Custom Bot API server, if any
    pub bot_api_url: Option<Url>,
    /// yt-dlp binary
    pub ytdl_bin: String,
    /// Cookies file passed through to the extractor
    pub credentials_path: Option<PathBuf>,
    /// Root under which job workspaces are created
    pub temp_root: PathBuf,
    pub log_file_path: String,
    pub max_inline_transfer_mb: f64,
    pub status_update_interval: Duration,
    pub probe_timeout: Duration,
    pub batch: BatchConfig,
    pub thumbnail: ThumbnailConfig,
    pub upload: UploadConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot_token: SecretString::from(String::new()),
            bot_api_url: None,
            ytdl_bin: DEFAULT_YTDL_BIN.to_string(),
            credentials_path: None,
            temp_root: std::env::temp_dir(),
            log_file_path: DEFAULT_LOG_FILE.to_string(),
            max_inline_transfer_mb: DEFAULT_MAX_INLINE_TRANSFER_MB,
            status_update_interval: Duration::from_secs_f64(DEFAULT_STATUS_UPDATE_INTERVAL_SECS),
            probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
            batch: BatchConfig::default(),
            thumbnail: ThumbnailConfig::default(),
            upload: UploadConfig::default(),
        }
    }
}

impl Config {
    /// Reads configuration from the process environment.
    ///
    /// Call `dotenvy::dotenv()` first if a `.env` file should be honored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Log file path from the process environment.
    ///
    /// Read on its own so the logger can be up before [`Config::from_env`]
    /// reports malformed values.
    pub fn log_file_path_from_env() -> String {
        log_file_path_from(&|key: &str| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    ///
    /// Missing keys use defaults; malformed values are logged and replaced
    /// by their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bot_token = non_empty("BOT_TOKEN")
            .or_else(|| non_empty("TELOXIDE_TOKEN"))
            .unwrap_or_default();

        let bot_api_url = non_empty("BOT_API_URL").and_then(|raw| match Url::parse(&raw) {
            Ok(url) => Some(url),
            Err(e) => {
                log::warn!("Ignoring invalid BOT_API_URL '{}': {}", raw, e);
                None
            }
        });

        let credentials_path = non_empty("YTDL_COOKIES_FILE").map(|p| expand_path(&p));
        let temp_root = non_empty("TEMP_FILES_DIR")
            .map(|p| expand_path(&p))
            .unwrap_or(defaults.temp_root);

        let upload = UploadConfig {
            directory_url: non_empty("UPLOAD_DIRECTORY_URL").unwrap_or(defaults.upload.directory_url),
            url_template: non_empty("UPLOAD_URL_TEMPLATE").unwrap_or(defaults.upload.url_template),
            server_pool: defaults.upload.server_pool,
            max_attempts: parse_or(&lookup, "UPLOAD_MAX_ATTEMPTS", defaults.upload.max_attempts).max(1),
            base_delay: secs_or(&lookup, "UPLOAD_BASE_DELAY_SECS", defaults.upload.base_delay),
            timeout: secs_or(&lookup, "UPLOAD_TIMEOUT_SECS", defaults.upload.timeout),
            directory_timeout: secs_or(&lookup, "UPLOAD_DIRECTORY_TIMEOUT_SECS", defaults.upload.directory_timeout),
        };

        let batch = BatchConfig {
            max_playlist_size: parse_or(&lookup, "MAX_PLAYLIST_SIZE", defaults.batch.max_playlist_size),
            item_delay: secs_or(&lookup, "PLAYLIST_ITEM_DELAY_SECS", defaults.batch.item_delay),
        };

        let thumbnail = ThumbnailConfig {
            size: parse_or(&lookup, "THUMBNAIL_SIZE", defaults.thumbnail.size).max(1),
            timeout: secs_or(&lookup, "THUMBNAIL_TIMEOUT_SECS", defaults.thumbnail.timeout),
        };

        Self {
            bot_token: SecretString::from(bot_token),
            bot_api_url,
            ytdl_bin: non_empty("YTDL_BIN").unwrap_or(defaults.ytdl_bin),
            credentials_path,
            temp_root,
            log_file_path: log_file_path_from(&lookup),
            max_inline_transfer_mb: mb_or(&lookup, "MAX_INLINE_TRANSFER_MB", defaults.max_inline_transfer_mb),
            status_update_interval: secs_or(
                &lookup,
                "STATUS_UPDATE_INTERVAL_SECS",
                defaults.status_update_interval,
            ),
            probe_timeout: secs_or(&lookup, "PROBE_TIMEOUT_SECS", defaults.probe_timeout),
            batch,
            thumbnail,
            upload,
        }
    }
}

fn log_file_path_from<F>(lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup("LOG_FILE_PATH")
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_FILE.to_string())
}

fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!("Invalid value '{}' for {}, using default", raw, key);
            default
        }),
    }
}

/// Reads a duration given in (possibly fractional) seconds.
fn secs_or<F>(lookup: &F, key: &str, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    let secs: f64 = parse_or(lookup, key, default.as_secs_f64());
    match Duration::try_from_secs_f64(secs) {
        Ok(duration) => duration,
        Err(e) => {
            log::warn!("Out-of-range value {} for {} ({}), using default", secs, key, e);
            default
        }
    }
}

/// Reads a size ceiling in MB; must be finite and positive.
fn mb_or<F>(lookup: &F, key: &str, default: f64) -> f64
where
    F: Fn(&str) -> Option<String>,
{
    let mb: f64 = parse_or(lookup, key, default);
    if mb.is_finite() && mb > 0.0 {
        mb
    } else {
        log::warn!("Out-of-range value {} for {}, using default", mb, key);
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.batch.max_playlist_size, 50);
        assert_eq!(config.max_inline_transfer_mb, 49.0);
        assert_eq!(config.status_update_interval, Duration::from_secs(3));
        assert_eq!(config.batch.item_delay, Duration::from_secs(2));
        assert_eq!(config.upload.max_attempts, 5);
        assert_eq!(config.upload.base_delay, Duration::from_secs(5));
        assert_eq!(config.thumbnail.size, 320);
        assert!(config.credentials_path.is_none());
        assert_eq!(config.bot_token.expose_secret(), "");
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = Config::from_lookup(lookup_from(&[
            ("TELOXIDE_TOKEN", "123:abc"),
            ("MAX_PLAYLIST_SIZE", "10"),
            ("MAX_INLINE_TRANSFER_MB", "1999"),
            ("STATUS_UPDATE_INTERVAL_SECS", "0.5"),
            ("YTDL_COOKIES_FILE", "/srv/cookies.txt"),
            ("UPLOAD_URL_TEMPLATE", "http://localhost/{server}/upload"),
        ]));
        assert_eq!(config.bot_token.expose_secret(), "123:abc");
        assert_eq!(config.batch.max_playlist_size, 10);
        assert_eq!(config.max_inline_transfer_mb, 1999.0);
        assert_eq!(config.status_update_interval, Duration::from_millis(500));
        assert_eq!(config.credentials_path, Some(PathBuf::from("/srv/cookies.txt")));
        assert_eq!(config.upload.upload_url("store3"), "http://localhost/store3/upload");
    }

    #[test]
    fn test_malformed_values_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("MAX_PLAYLIST_SIZE", "lots"),
            ("PLAYLIST_ITEM_DELAY_SECS", "-4"),
            ("BOT_API_URL", "not a url"),
        ]));
        assert_eq!(config.batch.max_playlist_size, 50);
        assert_eq!(config.batch.item_delay, Duration::from_secs(2));
        assert!(config.bot_api_url.is_none());
    }

    #[test]
    fn test_out_of_range_numbers_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("UPLOAD_TIMEOUT_SECS", "1e20"),
            ("PROBE_TIMEOUT_SECS", "inf"),
            ("MAX_INLINE_TRANSFER_MB", "NaN"),
        ]));
        assert_eq!(config.upload.timeout, Duration::from_secs(300));
        assert_eq!(config.probe_timeout, Duration::from_secs(120));
        assert_eq!(config.max_inline_transfer_mb, 49.0);

        for raw in ["inf", "-1", "0"] {
            let config = Config::from_lookup(lookup_from(&[("MAX_INLINE_TRANSFER_MB", raw)]));
            assert_eq!(config.max_inline_transfer_mb, 49.0, "accepted {:?}", raw);
        }
    }

    #[test]
    fn test_log_file_path_is_readable_before_config() {
        let lookup = lookup_from(&[("LOG_FILE_PATH", " /var/log/relay.log "), ("MAX_PLAYLIST_SIZE", "lots")]);
        assert_eq!(log_file_path_from(&lookup), "/var/log/relay.log");
        assert_eq!(Config::from_lookup(lookup).log_file_path, "/var/log/relay.log");
        assert_eq!(log_file_path_from(&|_: &str| None), DEFAULT_LOG_FILE);
    }

    #[test]
    fn test_bot_token_prefers_bot_token_variable() {
        let config = Config::from_lookup(lookup_from(&[("BOT_TOKEN", "first"), ("TELOXIDE_TOKEN", "second")]));
        assert_eq!(config.bot_token.expose_secret(), "first");
    }

    #[test]
    fn test_fallback_pool() {
        let pool = upload::fallback_pool();
        assert_eq!(pool.len(), 9);
        assert_eq!(pool.first().map(String::as_str), Some("store1"));
        assert_eq!(pool.last().map(String::as_str), Some("store9"));
    }
}
