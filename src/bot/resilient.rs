//! Resilient messaging utilities with automatic retry for Telegram API operations.
//!
//! Every send goes through [`crate::utils::retry_telegram_operation`], so a
//! transient network error or a rate limit does not lose a song.

use crate::config::TELEGRAM_MESSAGE_MAX_CHARS;
use crate::utils::{retry_telegram_operation, truncate_graphemes};
use anyhow::Result;
use std::path::Path;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile, Message};
use tracing::debug;

/// Send a text message with automatic retry on network failures.
///
/// Text longer than Telegram allows is cut and marked as truncated.
///
/// # Errors
///
/// Returns an error after all retries are exhausted.
pub async fn send_message_resilient(
    bot: &Bot,
    chat_id: ChatId,
    text: impl Into<String>,
) -> Result<Message> {
    let text = fit_message(text.into());
    retry_telegram_operation(|| async {
        bot.send_message(chat_id, text.clone())
            .await
            .map_err(|e| anyhow::anyhow!("Telegram send error: {e}"))
    })
    .await
}

/// Upload a local audio file with automatic retry.
///
/// # Errors
///
/// Returns an error after all retries are exhausted.
pub async fn send_audio_resilient(bot: &Bot, chat_id: ChatId, path: &Path) -> Result<Message> {
    retry_telegram_operation(|| async {
        bot.send_audio(chat_id, InputFile::file(path.to_path_buf()))
            .await
            .map_err(|e| anyhow::anyhow!("Telegram audio upload error: {e}"))
    })
    .await
}

/// Send an image by URL with automatic retry.
///
/// # Errors
///
/// Returns an error if the URL is invalid or after all retries are exhausted.
pub async fn send_photo_resilient(bot: &Bot, chat_id: ChatId, url: &str) -> Result<Message> {
    let url = reqwest::Url::parse(url)?;
    retry_telegram_operation(|| async {
        bot.send_photo(chat_id, InputFile::url(url.clone()))
            .await
            .map_err(|e| anyhow::anyhow!("Telegram photo send error: {e}"))
    })
    .await
}

fn fit_message(text: String) -> String {
    if text.chars().count() <= TELEGRAM_MESSAGE_MAX_CHARS {
        return text;
    }
    debug!(chars = text.chars().count(), "Truncating long message");
    format!("{}…", truncate_graphemes(&text, TELEGRAM_MESSAGE_MAX_CHARS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_messages_are_untouched() {
        assert_eq!(fit_message("la la".to_string()), "la la");
    }

    #[test]
    fn long_messages_are_cut() {
        let text = "歌".repeat(TELEGRAM_MESSAGE_MAX_CHARS + 10);
        let fitted = fit_message(text);
        assert_eq!(fitted.chars().count(), TELEGRAM_MESSAGE_MAX_CHARS + 1);
        assert!(fitted.ends_with('…'));
    }
}
