//! Generation submissions and the retried fetches the worker relies on.

use super::api::{SubmitRoute, SunoApi};
use super::types::{
    ArtifactSnapshot, CustomRequest, DescriptionRequest, GenerationOutcome, JobId,
    LyricsRequest, SubmitResponse,
};
use super::SunoError;
use crate::utils::RetryPolicy;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};

const DETAIL_UNAUTHORIZED: &str = "Unauthorized";
const DETAIL_INSUFFICIENT_CREDITS: &str = "Insufficient credits.";
const DETAIL_TOPIC_TOO_LONG: &str = "Topic too long.";
const DETAIL_TOO_MANY_JOBS: &str = "Too many running jobs.";

/// Retry budgets for each kind of remote call
#[derive(Debug, Clone, Copy)]
pub struct RetryBudgets {
    /// Generation submissions
    pub submit: RetryPolicy,
    /// Snapshot fetches
    pub fetch: RetryPolicy,
    /// Media downloads
    pub download: RetryPolicy,
}

impl Default for RetryBudgets {
    fn default() -> Self {
        Self {
            submit: RetryPolicy::submit(0),
            fetch: RetryPolicy::fetch(),
            download: RetryPolicy::download(),
        }
    }
}

/// Submits generation jobs and fetches their progress.
pub struct GenerationService {
    api: Arc<dyn SunoApi>,
    model: String,
    budgets: RetryBudgets,
}

impl GenerationService {
    /// Create a service over `api`, sending `model` as the `mv` field
    #[must_use]
    pub fn new(api: Arc<dyn SunoApi>, model: impl Into<String>, budgets: RetryBudgets) -> Self {
        Self {
            api,
            model: model.into(),
            budgets,
        }
    }

    /// Let the server write and sing a song from a free-text description
    #[instrument(skip(self))]
    pub async fn submit_description_music(
        &self,
        prompt: &str,
        instrumental: bool,
    ) -> GenerationOutcome {
        let body = DescriptionRequest {
            gpt_description_prompt: prompt,
            make_instrumental: instrumental,
            mv: &self.model,
        };
        self.submit(SubmitRoute::DescriptionMode, &body).await
    }

    /// Generate a song from explicit title, tags and lyrics
    #[instrument(skip(self, lyrics))]
    pub async fn submit_custom_music(
        &self,
        title: Option<&str>,
        tags: Option<&str>,
        lyrics: Option<&str>,
        instrumental: bool,
    ) -> GenerationOutcome {
        let body = CustomRequest {
            title: title.unwrap_or_default(),
            tags: tags.unwrap_or_default(),
            prompt: lyrics.unwrap_or_default(),
            make_instrumental: instrumental,
            mv: &self.model,
            continue_clip_id: None,
            continue_at: None,
        };
        self.submit(SubmitRoute::Custom, &body).await
    }

    /// Generate lyrics only
    #[instrument(skip(self))]
    pub async fn submit_lyrics(&self, prompt: &str) -> GenerationOutcome {
        self.submit(SubmitRoute::Lyrics, &LyricsRequest { prompt })
            .await
    }

    async fn submit<B: Serialize + Sync>(&self, route: SubmitRoute, body: &B) -> GenerationOutcome {
        let body = match serde_json::to_value(body) {
            Ok(v) => v,
            Err(e) => return GenerationOutcome::OtherError(format!("invalid request body: {e}")),
        };

        let response = self
            .budgets
            .submit
            .run_optional("submit", || self.api.submit(route, body.clone()))
            .await;

        let outcome = response.map_or(GenerationOutcome::TransportFailure, classify_response);
        info!(route = ?route, outcome = ?outcome, "Submission classified");
        outcome
    }

    /// Latest state of a music clip, `None` once the fetch budget is spent
    pub async fn fetch_clip(&self, clip_id: &JobId) -> Option<ArtifactSnapshot> {
        self.budgets
            .fetch
            .run_optional("feed", || async move {
                let mut clips = self.api.feed(clip_id.as_str()).await?;
                if clips.is_empty() {
                    return Err(SunoError::Malformed(format!("empty feed for clip {clip_id}")));
                }
                Ok(ArtifactSnapshot::from(clips.swap_remove(0)))
            })
            .await
    }

    /// Latest state of a lyrics job, `None` once the fetch budget is spent
    pub async fn fetch_lyrics(&self, lyrics_id: &JobId) -> Option<ArtifactSnapshot> {
        self.budgets
            .fetch
            .run_optional("lyrics", || async move {
                self.api
                    .lyrics(lyrics_id.as_str())
                    .await
                    .map(ArtifactSnapshot::from)
            })
            .await
    }

    /// Download generated media to `dest`.
    ///
    /// # Errors
    ///
    /// Returns the last `SunoError` once the download budget is spent.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<u64, SunoError> {
        self.budgets
            .download
            .run("download", || self.api.download(url, dest))
            .await
    }
}

/// Maps a submission response to its outcome.
#[must_use]
pub fn classify_response(response: SubmitResponse) -> GenerationOutcome {
    if let Some(detail) = response.detail_text() {
        return match detail.as_str() {
            DETAIL_UNAUTHORIZED => GenerationOutcome::Unauthorized,
            DETAIL_INSUFFICIENT_CREDITS => GenerationOutcome::QuotaExhausted,
            DETAIL_TOPIC_TOO_LONG => GenerationOutcome::PromptRejected(detail),
            DETAIL_TOO_MANY_JOBS => GenerationOutcome::TooManyJobs(detail),
            _ => {
                warn!(detail = %detail, "Unrecognized error detail");
                GenerationOutcome::OtherError(detail)
            }
        };
    }

    let ids: Vec<JobId> = response
        .clips
        .unwrap_or_default()
        .into_iter()
        .map(|clip| JobId::new(clip.id))
        .collect();
    if !ids.is_empty() {
        return GenerationOutcome::Accepted(ids);
    }

    match response.id.filter(|id| !id.is_empty()) {
        Some(id) => GenerationOutcome::Accepted(vec![JobId::new(id)]),
        None => GenerationOutcome::OtherError("no clips in response".to_string()),
    }
}
