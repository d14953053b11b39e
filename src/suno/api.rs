//! HTTP transport for the Suno-API server.
//!
//! `SunoApi` is the seam between classification/retry logic and the wire;
//! `HttpSunoApi` is the reqwest implementation.

use super::endpoint::EndpointSelector;
use super::types::{FeedClip, LyricsJob, SubmitResponse};
use super::SunoError;
use crate::config::{SUNO_CONNECT_TIMEOUT_SECS, SUNO_REQUEST_TIMEOUT_SECS};
use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use reqwest::Client as HttpClient;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Generation endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRoute {
    /// `POST /generate/description-mode`
    DescriptionMode,
    /// `POST /generate`
    Custom,
    /// `POST /generate/lyrics/`
    Lyrics,
}

impl SubmitRoute {
    /// Path relative to the base URL
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::DescriptionMode => "/generate/description-mode",
            Self::Custom => "/generate",
            Self::Lyrics => "/generate/lyrics/",
        }
    }
}

/// Raw operations offered by a Suno-API server.
///
/// A single call per method, no retries: callers wrap these in a
/// [`crate::utils::RetryPolicy`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SunoApi: Send + Sync {
    /// Submit a generation job.
    ///
    /// A non-success status whose body still carries a `detail` is returned
    /// as `Ok` so it can be classified.
    async fn submit(&self, route: SubmitRoute, body: Value) -> Result<SubmitResponse, SunoError>;

    /// Fetch the feed entries of one clip
    async fn feed(&self, clip_id: &str) -> Result<Vec<FeedClip>, SunoError>;

    /// Fetch one lyrics job
    async fn lyrics(&self, lyrics_id: &str) -> Result<LyricsJob, SunoError>;

    /// Stream `url` into `dest`, returning the number of bytes written
    async fn download(&self, url: &str, dest: &Path) -> Result<u64, SunoError>;
}

/// reqwest-backed [`SunoApi`]
pub struct HttpSunoApi {
    client: HttpClient,
    download_client: HttpClient,
    endpoint: Arc<dyn EndpointSelector>,
}

impl HttpSunoApi {
    /// Create a client for the given endpoint strategy.
    ///
    /// API calls get a connect and a total timeout; downloads only a connect
    /// timeout because audio files can take a while to stream.
    #[must_use]
    pub fn new(endpoint: Arc<dyn EndpointSelector>) -> Self {
        let connect = Duration::from_secs(SUNO_CONNECT_TIMEOUT_SECS);
        let client = HttpClient::builder()
            .connect_timeout(connect)
            .timeout(Duration::from_secs(SUNO_REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| HttpClient::new());
        let download_client = HttpClient::builder()
            .connect_timeout(connect)
            .build()
            .unwrap_or_else(|_| HttpClient::new());

        Self {
            client,
            download_client,
            endpoint,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.endpoint.base_url())
    }

    async fn get_text(&self, path: &str) -> Result<String, SunoError> {
        let response = self.client.get(self.url(path)).send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(path = %path, status = %status, body = %text, "Suno-API response");

        if !status.is_success() {
            return Err(SunoError::Status {
                status: status.as_u16(),
                body: clean_error_body(&text),
            });
        }
        Ok(text)
    }
}

#[async_trait]
impl SunoApi for HttpSunoApi {
    async fn submit(&self, route: SubmitRoute, body: Value) -> Result<SubmitResponse, SunoError> {
        let response = self
            .client
            .post(self.url(route.path()))
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(route = ?route, status = %status, body = %text, "Suno-API submit response");

        if !status.is_success() {
            if let Ok(parsed) = serde_json::from_str::<SubmitResponse>(&text) {
                if parsed.detail_text().is_some() {
                    warn!(route = ?route, status = %status, "Submission rejected with detail");
                    return Ok(parsed);
                }
            }
            return Err(SunoError::Status {
                status: status.as_u16(),
                body: clean_error_body(&text),
            });
        }

        serde_json::from_str(&text).map_err(|e| SunoError::Json(e.to_string()))
    }

    async fn feed(&self, clip_id: &str) -> Result<Vec<FeedClip>, SunoError> {
        let text = self.get_text(&format!("/feed/{clip_id}")).await?;
        serde_json::from_str(&text).map_err(|e| SunoError::Json(e.to_string()))
    }

    async fn lyrics(&self, lyrics_id: &str) -> Result<LyricsJob, SunoError> {
        let text = self.get_text(&format!("/lyrics/{lyrics_id}")).await?;
        serde_json::from_str(&text).map_err(|e| SunoError::Json(e.to_string()))
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64, SunoError> {
        let response = self.download_client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SunoError::Download(format!("{url} returned {status}")));
        }

        let written = save_stream(response.bytes_stream(), dest).await?;
        debug!(url = %url, path = %dest.display(), bytes = written, "Download complete");
        Ok(written)
    }
}

/// Writes `stream` to `dest`; on any error the partial file is removed.
async fn save_stream<S, B, E>(stream: S, dest: &Path) -> Result<u64, SunoError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    SunoError: From<E>,
{
    let result = write_stream(stream, dest).await;
    if result.is_err() {
        match tokio::fs::remove_file(dest).await {
            Ok(()) => debug!(path = %dest.display(), "Removed partial download"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %dest.display(), error = %e, "Failed to remove partial download"),
        }
    }
    result
}

async fn write_stream<S, B, E>(stream: S, dest: &Path) -> Result<u64, SunoError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    SunoError: From<E>,
{
    let mut stream = std::pin::pin!(stream);
    let mut file = tokio::fs::File::create(dest).await?;
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(chunk.as_ref()).await?;
        written += chunk.as_ref().len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

/// Shortens an error body for logs and error messages.
fn clean_error_body(text: &str) -> String {
    let trimmed = text.trim_start();
    if trimmed.starts_with("<!DOCTYPE") || trimmed.starts_with("<html") || trimmed.starts_with("<HTML")
    {
        return "(server returned HTML error page)".to_string();
    }
    if text.chars().count() > 500 {
        format!("{}... (truncated)", crate::utils::truncate_graphemes(text, 500))
    } else {
        text.to_string()
    }
}
