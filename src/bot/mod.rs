/// Command and message handlers
pub mod handlers;
/// Telegram sends with retry
pub mod resilient;
/// Telegram runtime entrypoint
pub mod runner;
/// `ReplyChannel` over the Telegram Bot API
pub mod transport;

pub use transport::TelegramReplyChannel;
