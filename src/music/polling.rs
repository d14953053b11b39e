//! Waiting for asynchronously produced artifacts.
//!
//! Every artifact (audio, cover, video, lyrics) is awaited with the same
//! primitive, [`poll_until`], parameterised by a [`PollSpec`].

use crate::config::{
    AUDIO_INITIAL_DELAY_SECS, AUDIO_POLL_INTERVAL_SECS, AUDIO_TIMEOUT_SECS,
    COVER_POLL_INTERVAL_SECS, COVER_TIMEOUT_SECS, LYRICS_POLL_INTERVAL_SECS,
    LYRICS_TIMEOUT_SECS, VIDEO_POLL_INTERVAL_SECS, VIDEO_TIMEOUT_SECS,
};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Artifacts the remote service produces for a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Rendered audio file
    Audio,
    /// Cover image
    Cover,
    /// Music video
    Video,
    /// Standalone lyrics
    Lyrics,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Audio => "audio",
            Self::Cover => "cover",
            Self::Video => "video",
            Self::Lyrics => "lyrics",
        };
        f.write_str(name)
    }
}

/// Timing of one poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSpec {
    /// Sleep before the first fetch
    pub initial_delay: Duration,
    /// Sleep between fetches
    pub interval: Duration,
    /// Give up once this much time has passed since the call started
    pub timeout: Duration,
}

impl PollSpec {
    /// Default timing for `kind`
    #[must_use]
    pub const fn for_kind(kind: ArtifactKind) -> Self {
        match kind {
            ArtifactKind::Audio => Self {
                initial_delay: Duration::from_secs(AUDIO_INITIAL_DELAY_SECS),
                interval: Duration::from_secs(AUDIO_POLL_INTERVAL_SECS),
                timeout: Duration::from_secs(AUDIO_TIMEOUT_SECS),
            },
            ArtifactKind::Cover => Self {
                initial_delay: Duration::ZERO,
                interval: Duration::from_secs(COVER_POLL_INTERVAL_SECS),
                timeout: Duration::from_secs(COVER_TIMEOUT_SECS),
            },
            ArtifactKind::Video => Self {
                initial_delay: Duration::ZERO,
                interval: Duration::from_secs(VIDEO_POLL_INTERVAL_SECS),
                timeout: Duration::from_secs(VIDEO_TIMEOUT_SECS),
            },
            ArtifactKind::Lyrics => Self {
                initial_delay: Duration::ZERO,
                interval: Duration::from_secs(LYRICS_POLL_INTERVAL_SECS),
                timeout: Duration::from_secs(LYRICS_TIMEOUT_SECS),
            },
        }
    }

    /// Same timing without the initial delay
    #[must_use]
    pub const fn without_initial_delay(self) -> Self {
        Self {
            initial_delay: Duration::ZERO,
            ..self
        }
    }
}

/// Per-kind poll timing used by the delivery pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    /// Audio readiness; the initial delay applies to the first job only
    pub audio: PollSpec,
    /// Cover readiness
    pub cover: PollSpec,
    /// Video readiness
    pub video: PollSpec,
    /// Lyrics completion
    pub lyrics: PollSpec,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            audio: PollSpec::for_kind(ArtifactKind::Audio),
            cover: PollSpec::for_kind(ArtifactKind::Cover),
            video: PollSpec::for_kind(ArtifactKind::Video),
            lyrics: PollSpec::for_kind(ArtifactKind::Lyrics),
        }
    }
}

/// Why waiting for an artifact stopped without a result
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    /// The fetch gave up after its own retries
    #[error("fetching {kind} failed after all retries")]
    FetchFailed {
        /// Awaited artifact
        kind: ArtifactKind,
    },
    /// The artifact was not ready in time
    #[error("{kind} not ready after {}s", .elapsed.as_secs())]
    TimedOut {
        /// Awaited artifact
        kind: ArtifactKind,
        /// Time spent polling
        elapsed: Duration,
    },
}

/// State of one artifact while it is being awaited
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState<T> {
    /// Not ready yet, keep polling
    Pending,
    /// Ready with the snapshot that satisfied the predicate
    Ready(T),
    /// Deadline passed
    TimedOut(Duration),
    /// Fetch exhausted its retries
    Failed,
}

impl<T> PollState<T> {
    /// Next state after one fetch
    fn advance(
        fetched: Option<T>,
        is_ready: impl Fn(&T) -> bool,
        elapsed: Duration,
        timeout: Duration,
    ) -> Self {
        match fetched {
            None => Self::Failed,
            Some(value) if is_ready(&value) => Self::Ready(value),
            Some(_) if elapsed >= timeout => Self::TimedOut(elapsed),
            Some(_) => Self::Pending,
        }
    }
}

/// Fetch until `is_ready` holds, the fetch fails, or `spec.timeout` elapses.
///
/// Elapsed time counts from the start of the call, including the initial
/// delay.
///
/// # Errors
///
/// Returns `PollError::FetchFailed` when `fetch` yields `None`, and
/// `PollError::TimedOut` when the deadline passes first.
pub async fn poll_until<T, F, Fut, P>(
    kind: ArtifactKind,
    spec: PollSpec,
    mut fetch: F,
    is_ready: P,
) -> Result<T, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
    P: Fn(&T) -> bool,
{
    let start = Instant::now();
    if !spec.initial_delay.is_zero() {
        sleep(spec.initial_delay).await;
    }

    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let fetched = fetch().await;
        let elapsed = start.elapsed();

        match PollState::advance(fetched, &is_ready, elapsed, spec.timeout) {
            PollState::Pending => {
                debug!(%kind, attempts, elapsed_secs = elapsed.as_secs(), "Artifact not ready yet");
                sleep(spec.interval).await;
            }
            PollState::Ready(value) => {
                debug!(%kind, attempts, elapsed_secs = elapsed.as_secs(), "Artifact ready");
                return Ok(value);
            }
            PollState::TimedOut(elapsed) => {
                warn!(
                    %kind,
                    attempts,
                    elapsed_secs = elapsed.as_secs(),
                    "Artifact not ready before deadline"
                );
                return Err(PollError::TimedOut { kind, elapsed });
            }
            PollState::Failed => {
                warn!(%kind, attempts, "Artifact fetch exhausted its retries");
                return Err(PollError::FetchFailed { kind });
            }
        }
    }
}
