//! Telegram bot integration and handlers

pub mod bot;
pub mod handlers;
pub mod status;

use std::sync::Arc;

use teloxide::prelude::*;

use crate::download::pipeline::Relay;

// Re-exports for convenience
pub use bot::{create_bot, setup_bot_commands, Command};
pub use handlers::{schema, HandlerDeps, HandlerError};
pub use status::TelegramStatus;

/// Runs the long-polling dispatcher until Ctrl-C.
pub async fn run_bot(bot: Bot, relay: Arc<Relay>) {
    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to register bot commands: {}", e);
    }

    log::info!("Bot is running. Press Ctrl-C to stop.");
    Dispatcher::builder(bot, schema(HandlerDeps::new(relay)))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
    log::info!("Dispatcher shutdown gracefully");
}
