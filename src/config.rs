//! Configuration and settings management
//!
//! Loads settings from config files and environment variables and defines
//! the timing constants used by the generation worker.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application settings loaded from config files and environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub telegram_token: String,

    /// Comma-separated list of Suno-API base URLs (only the first is used)
    #[serde(rename = "suno_api_bases")]
    pub suno_api_bases_str: String,

    /// Comma-separated prefixes that trigger sung music creation
    #[serde(rename = "music_create_prefixes")]
    pub music_prefixes_str: String,
    /// Comma-separated prefixes that trigger instrumental music creation
    #[serde(rename = "instrumental_create_prefixes", default)]
    pub instrumental_prefixes_str: Option<String>,
    /// Comma-separated prefixes that trigger lyrics creation
    #[serde(rename = "lyrics_create_prefixes", default)]
    pub lyrics_prefixes_str: Option<String>,

    /// Directory where downloaded audio is written
    #[serde(default = "default_music_output_dir")]
    pub music_output_dir: PathBuf,

    /// Send the lyrics text before each audio file
    #[serde(default = "default_true")]
    pub send_lyrics: bool,
    /// Send the cover image after each audio file
    #[serde(default = "default_true")]
    pub send_covers: bool,

    /// Model version passed as `mv` to the generation endpoints
    #[serde(default = "default_suno_model")]
    pub suno_model: String,

    /// Extra attempts for a generation submission
    #[serde(default)]
    pub submit_retries: usize,

    /// Name the bot uses for itself in replies
    #[serde(default = "default_bot_name")]
    pub bot_name: String,
}

fn default_music_output_dir() -> PathBuf {
    PathBuf::from("/tmp")
}

const fn default_true() -> bool {
    true
}

fn default_suno_model() -> String {
    "chirp-v3-0".to_string()
}

fn default_bot_name() -> String {
    "Suno".to_string()
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use songsmith_bot::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or a required list is empty.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Not checked into git
            .add_source(File::with_name("config/local").required(false))
            // Eg.. `APP__SEND_COVERS=false ./target/app` would set the `send_covers` key
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Environment::default() maps UPPER_SNAKE_CASE to snake_case
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        let settings: Self = s.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the bot cannot work with.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Message` if no API base or no music prefix is configured.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.suno_api_bases().is_empty() {
            return Err(ConfigError::Message(
                "suno_api_bases must contain at least one URL".to_string(),
            ));
        }
        if self.music_prefixes().is_empty() {
            return Err(ConfigError::Message(
                "music_create_prefixes must contain at least one prefix".to_string(),
            ));
        }
        Ok(())
    }

    /// Configured Suno-API base URLs, without trailing slashes
    #[must_use]
    pub fn suno_api_bases(&self) -> Vec<String> {
        split_list(&self.suno_api_bases_str)
            .into_iter()
            .map(|base| base.trim_end_matches('/').to_string())
            .collect()
    }

    /// Prefixes for sung music, in configured order
    #[must_use]
    pub fn music_prefixes(&self) -> Vec<String> {
        split_list(&self.music_prefixes_str)
    }

    /// Prefixes for instrumental music, in configured order
    #[must_use]
    pub fn instrumental_prefixes(&self) -> Vec<String> {
        self.instrumental_prefixes_str
            .as_deref()
            .map(split_list)
            .unwrap_or_default()
    }

    /// Prefixes for lyrics, in configured order
    #[must_use]
    pub fn lyrics_prefixes(&self) -> Vec<String> {
        self.lyrics_prefixes_str
            .as_deref()
            .map(split_list)
            .unwrap_or_default()
    }
}

/// Splits a comma or semicolon separated list, dropping empty entries.
fn split_list(s: &str) -> Vec<String> {
    s.split([',', ';'])
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(ToString::to_string)
        .collect()
}

// HTTP configuration
/// Connect timeout for every Suno-API request
pub const SUNO_CONNECT_TIMEOUT_SECS: u64 = 5;
/// Total timeout for Suno-API JSON requests
pub const SUNO_REQUEST_TIMEOUT_SECS: u64 = 30;

// Retry configuration
/// Fixed pause between two attempts of the same remote call
pub const RETRY_BACKOFF_SECS: u64 = 5;
/// Extra attempts when fetching a clip or lyrics snapshot
pub const FETCH_RETRIES: usize = 3;
/// Extra attempts when downloading generated media
pub const DOWNLOAD_RETRIES: usize = 3;

// Polling configuration
/// Wait before the first audio fetch of a submission
pub const AUDIO_INITIAL_DELAY_SECS: u64 = 15;
/// Pause between audio fetches
pub const AUDIO_POLL_INTERVAL_SECS: u64 = 5;
/// Give up waiting for audio after this long
pub const AUDIO_TIMEOUT_SECS: u64 = 180;
/// Pause between cover fetches
pub const COVER_POLL_INTERVAL_SECS: u64 = 5;
/// Give up waiting for a cover after this long
pub const COVER_TIMEOUT_SECS: u64 = 60;
/// Pause between video fetches
pub const VIDEO_POLL_INTERVAL_SECS: u64 = 10;
/// Give up waiting for a video after this long
pub const VIDEO_TIMEOUT_SECS: u64 = 180;
/// Pause between lyrics fetches
pub const LYRICS_POLL_INTERVAL_SECS: u64 = 5;
/// Give up waiting for lyrics after this long
pub const LYRICS_TIMEOUT_SECS: u64 = 120;

// Delivery configuration
/// Maximum characters of the prompt kept in an audio file name
pub const AUDIO_FILE_STEM_MAX_CHARS: usize = 20;

// Telegram API retry configuration
/// Max retries for Telegram API calls
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;
/// First backoff between Telegram API retries
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Backoff cap between Telegram API retries
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4000;
/// Telegram message length limit with some headroom
pub const TELEGRAM_MESSAGE_MAX_CHARS: usize = 4000;

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_settings() -> Settings {
        Settings {
            telegram_token: "dummy".to_string(),
            suno_api_bases_str: "http://localhost:3000/".to_string(),
            music_prefixes_str: "唱".to_string(),
            instrumental_prefixes_str: None,
            lyrics_prefixes_str: None,
            music_output_dir: default_music_output_dir(),
            send_lyrics: true,
            send_covers: true,
            suno_model: default_suno_model(),
            submit_retries: 0,
            bot_name: default_bot_name(),
        }
    }

    #[test]
    fn test_list_parsing() {
        let mut settings = sample_settings();

        settings.music_prefixes_str = "唱,来一首; 唱首歌".to_string();
        assert_eq!(settings.music_prefixes(), vec!["唱", "来一首", "唱首歌"]);

        settings.lyrics_prefixes_str = Some(" , 写词,".to_string());
        assert_eq!(settings.lyrics_prefixes(), vec!["写词"]);

        assert!(settings.instrumental_prefixes().is_empty());
    }

    #[test]
    fn test_api_bases_are_normalized() {
        let mut settings = sample_settings();
        settings.suno_api_bases_str = "http://a.test/, http://b.test".to_string();
        assert_eq!(
            settings.suno_api_bases(),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
    }

    #[test]
    fn test_validate_rejects_missing_lists() {
        let mut settings = sample_settings();
        assert!(settings.validate().is_ok());

        settings.music_prefixes_str = " , ".to_string();
        assert!(settings.validate().is_err());

        let mut settings = sample_settings();
        settings.suno_api_bases_str = String::new();
        assert!(settings.validate().is_err());
    }
}
