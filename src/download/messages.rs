//! User-facing texts, rendered as MarkdownV2.

use crate::core::utils::{escape_markdown_v2, escape_markdown_v2_url, truncate_title};
use crate::download::extractor::MediaKind;

/// Titles in per-item batch texts are cut to this many characters
pub const BATCH_TITLE_CHARS: usize = 50;

pub const GENERIC_ERROR: &str = "❌ An unexpected error occurred. Please try again later.";
pub const DELIVERY_ERROR: &str = "❌ Error processing the file. Please try again later.";
pub const UPLOAD_ERROR: &str = "❌ Upload failed. The file is too large to send and could not be uploaded.";

/// Escapes a plain message for the surface
pub fn plain(text: &str) -> String {
    escape_markdown_v2(text)
}

pub fn processing_link() -> String {
    plain("🔗 Processing your link...")
}

pub fn starting_download() -> String {
    plain("📥 Starting download...")
}

pub fn processing_thumbnail() -> String {
    plain("🖼️ Processing thumbnail...")
}

pub fn large_file_uploading(size_mb: f64) -> String {
    plain(&format!("📤 Large file ({:.1}MB) - uploading to Gofile...", size_mb))
}

pub fn download_complete_sending(kind: MediaKind) -> String {
    plain(&format!("✅ Download complete! Sending {}...", kind))
}

pub fn download_progress(summary: &str) -> String {
    plain(&format!("📥 {}", summary))
}

/// `*Title:* t\n*By:* a\n[🔗 Source](url)`
pub fn video_caption(title: &str, author: &str, source_url: &str) -> String {
    format!(
        "*Title:* {}\n*By:* {}\n[🔗 Source]({})",
        escape_markdown_v2(title),
        escape_markdown_v2(author),
        escape_markdown_v2_url(source_url)
    )
}

/// `*Title:* t\n*By:* a`
pub fn audio_caption(title: &str, author: &str) -> String {
    format!(
        "*Title:* {}\n*By:* {}",
        escape_markdown_v2(title),
        escape_markdown_v2(author)
    )
}

/// `*i/n:* title\n*By:* a`
pub fn batch_item_caption(index: usize, total: usize, title: &str, author: &str) -> String {
    format!(
        "*{}/{}:* {}\n*By:* {}",
        index,
        total,
        escape_markdown_v2(&truncate_title(title, BATCH_TITLE_CHARS)),
        escape_markdown_v2(author)
    )
}

/// Single-job remote upload notice
pub fn uploaded_remote(link: &str) -> String {
    plain(&format!("✅ Uploaded to Gofile:\n{}", link))
}

/// Batch caption with a remote download link appended
pub fn with_download_link(caption: &str, link: &str) -> String {
    format!("{}\n🔗 [Download Link]({})", caption, escape_markdown_v2_url(link))
}

pub fn playlist_too_large(max: usize, found: usize) -> String {
    plain(&format!(
        "⚠️ Playlist too large! Maximum {} videos allowed. Found {} videos.",
        max, found
    ))
}

pub fn playlist_detected(title: &str, count: usize) -> String {
    format!(
        "✅ Playlist detected: *{}*\nFound *{}* videos{}",
        escape_markdown_v2(title),
        count,
        plain(". Starting download...")
    )
}

pub fn batch_item_downloading(index: usize, total: usize, title: &str) -> String {
    format!(
        "{}*{}*",
        plain(&format!("📥 Downloading video {}/{}: ", index, total)),
        escape_markdown_v2(&truncate_title(title, BATCH_TITLE_CHARS))
    )
}

pub fn batch_item_sending(index: usize, total: usize) -> String {
    plain(&format!("📤 Sending video {}/{}...", index, total))
}

pub fn batch_item_failed(index: usize, total: usize) -> String {
    plain(&format!("⚠️ Failed to download video {}/{}", index, total))
}

pub fn batch_item_error(index: usize, total: usize) -> String {
    plain(&format!("❌ Error on video {}/{}", index, total))
}

/// Final batch summary; the failed line only appears when nonzero
pub fn batch_summary(succeeded: usize, failed: usize, total: usize) -> String {
    let mut text = format!("✅ Playlist complete!\n📊 Downloaded: {}/{}", succeeded, total);
    if failed > 0 {
        text.push_str(&format!("\n⚠️ Failed: {}", failed));
    }
    plain(&text)
}

pub fn start_text(max_playlist_size: usize) -> String {
    plain(&format!(
        "👋 Hi! Send me a link and I'll fetch the media for you.\n\n\
         Supported:\n\
         • YouTube videos and playlists (up to {} videos)\n\
         • YouTube Music tracks (sent as MP3)\n\
         • Instagram posts and reels\n\n\
         Use /help for details.",
        max_playlist_size
    ))
}

pub fn help_text(max_inline_mb: f64) -> String {
    plain(&format!(
        "ℹ️ How to use:\n\n\
         1. Paste a YouTube, YouTube Music or Instagram link.\n\
         2. Wait while the media is downloaded.\n\
         3. Receive the video or audio right here.\n\n\
         Files larger than {:.0}MB are uploaded to Gofile and you get a download link instead.\n\n\
         ⚠️ Private or age-restricted content may not be available.",
        max_inline_mb
    ))
}
