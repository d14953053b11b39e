#![deny(missing_docs)]
//! Songsmith bot library.
//!
//! Turns chat commands into Suno-API generation jobs and delivers the
//! resulting lyrics, audio, covers and videos back to the chat.

/// Telegram transport adapter.
pub mod bot;
/// Configuration management.
pub mod config;
/// Song creation flow.
pub mod music;
/// Suno-API client.
pub mod suno;
/// Utility functions.
pub mod utils;
