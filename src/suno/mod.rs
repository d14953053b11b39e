//! Suno-API client
//!
//! Talks to a Suno-API compatible HTTP server: submits generation jobs,
//! fetches their progressive state and downloads the produced media.

/// HTTP transport and the `SunoApi` seam used by the service
pub mod api;
/// Base URL selection
pub mod endpoint;
/// Submission, classification and retried fetches
pub mod service;
/// Wire types and domain snapshots
pub mod types;

pub use api::{HttpSunoApi, SunoApi};
pub use endpoint::{EndpointSelector, FirstEndpoint};
pub use service::GenerationService;
pub use types::{ArtifactSnapshot, GenerationOutcome, JobId};

use thiserror::Error;

/// Errors that can occur while talking to the Suno-API server
#[derive(Debug, Error)]
pub enum SunoError {
    /// Connection, timeout or body read failure
    #[error("Network error: {0}")]
    Network(String),
    /// Non-success HTTP status without a structured `detail`
    #[error("API error: {status} - {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Truncated response body
        body: String,
    },
    /// Response body is not the JSON we expected
    #[error("JSON error: {0}")]
    Json(String),
    /// JSON parsed but required fields are missing
    #[error("Malformed response: {0}")]
    Malformed(String),
    /// Media download returned a non-success status
    #[error("Download failed: {0}")]
    Download(String),
    /// Writing downloaded media to disk failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// No base URL is configured
    #[error("No Suno-API base URL configured")]
    NoEndpoint,
}

impl From<reqwest::Error> for SunoError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Json(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}
