//! Utility functions: the fixed-backoff retry wrapper used around every remote
//! call and the helpers that turn prompts into safe file names.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff, FixedInterval};
use tokio_retry::Retry;
use tracing::{debug, warn};
use unicode_segmentation::UnicodeSegmentation;

use crate::config::{
    DOWNLOAD_RETRIES, FETCH_RETRIES, RETRY_BACKOFF_SECS, TELEGRAM_API_INITIAL_BACKOFF_MS,
    TELEGRAM_API_MAX_BACKOFF_MS, TELEGRAM_API_MAX_RETRIES,
};

/// Retry budget and backoff for a single kind of remote call.
///
/// A policy with `retries = n` invokes the operation at most `n + 1` times and
/// sleeps `backoff` between each pair of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub retries: usize,
    /// Fixed pause between attempts
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Create a policy with the given budget and backoff
    #[must_use]
    pub const fn new(retries: usize, backoff: Duration) -> Self {
        Self { retries, backoff }
    }

    /// Policy for generation submissions: `retries` extra attempts, default backoff
    #[must_use]
    pub const fn submit(retries: usize) -> Self {
        Self::new(retries, Duration::from_secs(RETRY_BACKOFF_SECS))
    }

    /// Policy for clip and lyrics snapshot fetches
    #[must_use]
    pub const fn fetch() -> Self {
        Self::new(FETCH_RETRIES, Duration::from_secs(RETRY_BACKOFF_SECS))
    }

    /// Policy for media downloads
    #[must_use]
    pub const fn download() -> Self {
        Self::new(DOWNLOAD_RETRIES, Duration::from_secs(RETRY_BACKOFF_SECS))
    }

    /// Run `operation` until it succeeds or the budget is spent.
    ///
    /// Returns the last error once every attempt has failed.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use songsmith_bot::utils::RetryPolicy;
    ///
    /// # async fn example() -> Result<(), std::io::Error> {
    /// let body = RetryPolicy::fetch()
    ///     .run("feed", || async { Ok::<_, std::io::Error>("{}".to_string()) })
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns the error of the final attempt.
    pub async fn run<F, Fut, T, E>(&self, label: &str, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let strategy = FixedInterval::new(self.backoff).take(self.retries);
        let mut attempt = 0usize;

        Retry::spawn(strategy, || {
            attempt += 1;
            let current = attempt;
            let fut = operation();
            async move {
                let result = fut.await;
                if let Err(e) = &result {
                    debug!(call = label, attempt = current, error = %e, "Remote call attempt failed");
                }
                result
            }
        })
        .await
        .map_err(|e| {
            warn!(
                call = label,
                attempts = self.retries + 1,
                error = %e,
                "Remote call failed after all attempts"
            );
            e
        })
    }

    /// Like [`RetryPolicy::run`], but an exhausted budget yields `None`.
    pub async fn run_optional<F, Fut, T, E>(&self, label: &str, operation: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.run(label, operation).await.ok()
    }
}

/// Retry a Telegram API call with exponential backoff and jitter.
///
/// Unlike [`RetryPolicy`], which paces calls to the music service, chat
/// sends back off quickly and spread out under rate limiting.
///
/// # Errors
///
/// Returns the error of the final attempt.
pub async fn retry_telegram_operation<F, Fut, T>(operation: F) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let retry_strategy = ExponentialBackoff::from_millis(TELEGRAM_API_INITIAL_BACKOFF_MS)
        .max_delay(Duration::from_millis(TELEGRAM_API_MAX_BACKOFF_MS))
        .map(jitter)
        .take(TELEGRAM_API_MAX_RETRIES);

    Retry::spawn(retry_strategy, operation).await.map_err(|e| {
        warn!(
            attempts = TELEGRAM_API_MAX_RETRIES + 1,
            error = %e,
            "Telegram API operation failed after all attempts"
        );
        e
    })
}

/// Safely truncates a string to a maximum number of grapheme clusters.
///
/// # Examples
///
/// ```
/// use songsmith_bot::utils::truncate_graphemes;
/// assert_eq!(truncate_graphemes("明天会更好呀", 4), "明天会更");
/// ```
#[must_use]
pub fn truncate_graphemes(s: &str, max: usize) -> String {
    s.graphemes(true).take(max).collect()
}

/// Turns free text into a file-name stem: characters that are unsafe in file
/// names are dropped, whitespace is removed and the result is capped at
/// `max_chars` graphemes.
///
/// # Examples
///
/// ```
/// use songsmith_bot::utils::file_stem_from_text;
/// assert_eq!(file_stem_from_text("a happy / song?", 20), "ahappysong");
/// ```
#[must_use]
pub fn file_stem_from_text(text: &str, max_chars: usize) -> String {
    const FORBIDDEN: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control() && !FORBIDDEN.contains(c))
        .collect();
    let cleaned = cleaned.trim_matches('.');
    truncate_graphemes(cleaned, max_chars)
}
