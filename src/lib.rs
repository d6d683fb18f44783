//! mediarelay - Telegram relay for video, music and social media links
//!
//! A link posted in a chat is fetched with yt-dlp, given a square
//! thumbnail and sent back inline, or uploaded to Gofile when it is too
//! large for the Bot API. Playlists are processed item by item.
//!
//! # Module Structure
//!
//! - `core`: Configuration, errors, logging, retry and small utilities
//! - `download`: Extraction, thumbnails, delivery, upload and playlist batches
//! - `telegram`: Telegram bot integration and handlers
//! - `cli`: Command line interface and the console status surface

#![allow(clippy::too_many_arguments)]

pub mod cli;
pub mod core;
pub mod download;
pub mod telegram;

// Re-export commonly used types for convenience
pub use crate::core::{config, AppError, Config};
pub use crate::download::{JobIntent, LinkOutcome, Relay};
