//! Transport-agnostic reply channel.
//!
//! The generation worker only knows how to hand a [`Reply`] to a
//! [`ReplyChannel`]; the chat platform decides how to render it.

use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// One outbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Plain text
    Text(String),
    /// Local file sent as an attachment
    File(PathBuf),
    /// Image referenced by URL
    ImageUrl(String),
}

/// Who asked for the song, as shown in replies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    /// Display name of the user who sent the command
    pub nickname: String,
    /// The command came from a group conversation
    pub is_group: bool,
}

impl Requester {
    /// Create requester info
    #[must_use]
    pub fn new(nickname: impl Into<String>, is_group: bool) -> Self {
        Self {
            nickname: nickname.into(),
            is_group,
        }
    }
}

/// Sends replies back to the conversation a command came from.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReplyChannel: Send + Sync {
    /// Deliver one reply
    async fn send(&self, reply: Reply) -> Result<()>;
}
