//! Dispatcher tree: commands and link messages.

use std::sync::Arc;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::download::messages;
use crate::download::pipeline::{LinkOutcome, Relay};
use crate::download::source::extract_url;
use crate::telegram::bot::Command;
use crate::telegram::status::TelegramStatus;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub relay: Arc<Relay>,
}

impl HandlerDeps {
    pub fn new(relay: Arc<Relay>) -> Self {
        Self { relay }
    }
}

/// Creates the main dispatcher schema
///
/// Commands are matched first; every other text message is searched for a
/// link.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    dptree::entry()
        .branch(command_handler(deps.clone()))
        .branch(message_handler(deps))
}

fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("Received command {:?} from chat {}", cmd, msg.chat.id);
                let config = deps.relay.config();
                let text = match cmd {
                    Command::Start => messages::start_text(config.batch.max_playlist_size),
                    Command::Help => messages::help_text(config.max_inline_transfer_mb),
                };
                bot.send_message(msg.chat.id, text)
                    .parse_mode(ParseMode::MarkdownV2)
                    .await?;
                Ok(())
            }
        },
    ))
}

fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.text().is_some())
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                handle_text(&bot, &msg, &deps).await;
                Ok(())
            }
        })
}

async fn handle_text(bot: &Bot, msg: &Message, deps: &HandlerDeps) {
    let Some(text) = msg.text() else {
        return;
    };
    let Some(url) = extract_url(text) else {
        log::debug!("No link in message from chat {}", msg.chat.id);
        return;
    };

    let status = TelegramStatus::new(bot.clone(), msg.chat.id).replying_to(msg.id);
    match deps.relay.handle_link(&status, url).await {
        LinkOutcome::Ignored => {}
        LinkOutcome::Single(Ok(outcome)) => {
            log::info!("Job for {} in chat {} finished: {:?}", url, msg.chat.id, outcome);
        }
        LinkOutcome::Single(Err(e)) => {
            log::warn!("Job for {} in chat {} failed at {}: {}", url, msg.chat.id, e.stage(), e);
        }
        LinkOutcome::Batch(Ok(summary)) => {
            log::info!(
                "Batch for {} in chat {} finished ({}): {}/{} delivered",
                url,
                msg.chat.id,
                summary.state,
                summary.succeeded,
                summary.total
            );
        }
        LinkOutcome::Batch(Err(e)) => {
            log::warn!("Batch for {} in chat {} failed at {}: {}", url, msg.chat.id, e.stage(), e);
        }
    }
}
