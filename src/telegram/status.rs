//! Telegram implementation of the pipeline's status surface.
//!
//! Indicators are ordinary chat messages that get edited in place and
//! deleted once the artifact is out.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InputFile, LinkPreviewOptions, MessageId, ParseMode, ReplyParameters};

use crate::download::status::{OutboundArtifact, StatusHandle, StatusSurface, SurfaceError};

/// Status surface bound to one chat
#[derive(Clone)]
pub struct TelegramStatus {
    bot: Bot,
    chat_id: ChatId,
    /// Message that text notices and links reply to
    reply_to: Option<MessageId>,
}

impl TelegramStatus {
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self {
            bot,
            chat_id,
            reply_to: None,
        }
    }

    /// Text notices (download links, summaries) reply to `message_id`.
    #[must_use]
    pub fn replying_to(mut self, message_id: MessageId) -> Self {
        self.reply_to = Some(message_id);
        self
    }
}

/// Download links are sent without a web page preview.
fn no_link_preview() -> LinkPreviewOptions {
    LinkPreviewOptions {
        is_disabled: true,
        url: None,
        prefer_small_media: false,
        prefer_large_media: false,
        show_above_text: false,
    }
}

fn message_id(handle: StatusHandle) -> Result<MessageId, SurfaceError> {
    i32::try_from(handle.0)
        .map(MessageId)
        .map_err(|_| SurfaceError::Transport(format!("invalid message id {}", handle.0)))
}

#[async_trait]
impl StatusSurface for TelegramStatus {
    async fn create_indicator(&self, text: &str) -> Result<StatusHandle, SurfaceError> {
        let msg = self
            .bot
            .send_message(self.chat_id, text)
            .parse_mode(ParseMode::MarkdownV2)
            .await?;
        Ok(StatusHandle(i64::from(msg.id.0)))
    }

    async fn update_indicator(&self, handle: StatusHandle, text: &str) -> Result<(), SurfaceError> {
        self.bot
            .edit_message_text(self.chat_id, message_id(handle)?, text)
            .parse_mode(ParseMode::MarkdownV2)
            .await?;
        Ok(())
    }

    async fn retire_indicator(&self, handle: StatusHandle) -> Result<(), SurfaceError> {
        self.bot.delete_message(self.chat_id, message_id(handle)?).await?;
        Ok(())
    }

    async fn send_artifact(&self, artifact: &OutboundArtifact, caption: &str) -> Result<(), SurfaceError> {
        match artifact {
            OutboundArtifact::Video { path, thumbnail } => {
                let mut request = self
                    .bot
                    .send_video(self.chat_id, InputFile::file(path.clone()))
                    .caption(caption)
                    .parse_mode(ParseMode::MarkdownV2)
                    .supports_streaming(true);
                if let Some(thumb) = thumbnail {
                    request = request.thumbnail(InputFile::file(thumb.clone()));
                }
                request.await?;
            }
            OutboundArtifact::Audio { path, title, performer } => {
                self.bot
                    .send_audio(self.chat_id, InputFile::file(path.clone()))
                    .caption(caption)
                    .parse_mode(ParseMode::MarkdownV2)
                    .title(title.clone())
                    .performer(performer.clone())
                    .await?;
            }
            OutboundArtifact::Text => {
                let mut request = self
                    .bot
                    .send_message(self.chat_id, caption)
                    .parse_mode(ParseMode::MarkdownV2)
                    .link_preview_options(no_link_preview());
                if let Some(reply_to) = self.reply_to {
                    request = request.reply_parameters(ReplyParameters::new(reply_to));
                }
                request.await?;
            }
        }
        Ok(())
    }
}
