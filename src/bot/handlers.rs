use super::resilient::send_message_resilient;
use super::transport::TelegramReplyChannel;
use crate::music::{views, CommandHandler, Handled, Reply, ReplyChannel, Requester};
use anyhow::Result;
use std::sync::Arc;
use teloxide::requests::Requester as _;
use teloxide::{prelude::*, utils::command::BotCommands};
use tracing::{debug, error, info};

/// Supported commands for the bot
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Show how to ask for a song
    #[command(description = "Show usage.")]
    Help,
    /// Check bot health
    #[command(description = "Check bot health.")]
    Healthcheck,
}

/// Safe extraction of user ID from a message.
/// Returns 0 if the user information is missing.
pub fn get_user_id_safe(msg: &Message) -> i64 {
    msg.from.as_ref().map_or(0, |u| u.id.0.cast_signed())
}

/// Requester info shown in replies
#[must_use]
pub fn requester_from_message(msg: &Message) -> Requester {
    let nickname = msg.from.as_ref().map_or_else(
        || "Unknown".to_string(),
        |u| u.username.clone().unwrap_or_else(|| u.full_name()),
    );
    let is_group = msg.chat.is_group() || msg.chat.is_supergroup();
    Requester::new(nickname, is_group)
}

/// Help handler
///
/// # Errors
///
/// Returns an error if the help text cannot be sent.
pub async fn help(bot: Bot, msg: Message, handler: Arc<CommandHandler>) -> Result<()> {
    send_message_resilient(&bot, msg.chat.id, views::help_text(handler.prefixes())).await?;
    Ok(())
}

/// Healthcheck handler
///
/// # Errors
///
/// Returns an error if the healthcheck response cannot be sent.
pub async fn healthcheck(bot: Bot, msg: Message) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    info!("Healthcheck command received from user {user_id}.");
    bot.send_message(msg.chat.id, "OK").await?;
    Ok(())
}

/// Plain text: maybe a creation command.
///
/// # Errors
///
/// Returns an error if a synchronous reply could not be sent, not even the
/// generic failure notice.
pub async fn handle_text(bot: Bot, msg: Message, handler: Arc<CommandHandler>) -> Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let user_id = get_user_id_safe(&msg);
    let requester = requester_from_message(&msg);
    let channel: Arc<dyn ReplyChannel> = Arc::new(TelegramReplyChannel::new(bot, msg.chat.id));

    match handler.handle(text, requester, channel.clone()).await {
        Ok(Handled::Ignored) => {
            debug!(user_id, "Not a creation command");
            Ok(())
        }
        Ok(Handled::Replied) => Ok(()),
        Err(e) => {
            error!(user_id, error = %e, "Command handling failed");
            channel
                .send(Reply::Text(views::generic_failure()))
                .await
        }
    }
}
