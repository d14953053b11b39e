use super::resilient::{send_audio_resilient, send_message_resilient, send_photo_resilient};
use crate::music::{Reply, ReplyChannel};
use anyhow::Result;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::ChatId;
use tracing::debug;

/// Replies into the Telegram chat a command came from.
pub struct TelegramReplyChannel {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramReplyChannel {
    /// Create a channel bound to `chat_id`.
    pub const fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self { bot, chat_id }
    }
}

#[async_trait]
impl ReplyChannel for TelegramReplyChannel {
    async fn send(&self, reply: Reply) -> Result<()> {
        match reply {
            Reply::Text(text) => {
                send_message_resilient(&self.bot, self.chat_id, text).await?;
            }
            Reply::File(path) => {
                debug!(chat_id = %self.chat_id, path = %path.display(), "Uploading audio");
                send_audio_resilient(&self.bot, self.chat_id, &path).await?;
            }
            Reply::ImageUrl(url) => {
                send_photo_resilient(&self.bot, self.chat_id, &url).await?;
            }
        }
        Ok(())
    }
}
