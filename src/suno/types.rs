//! Wire types of the Suno-API and the snapshots built from them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Opaque identifier of one in-flight artifact: a clip id for music, a
/// lyrics id for lyrics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Wrap a raw id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Raw id as sent by the server
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Classified result of a generation submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Job accepted; ids in submission order
    Accepted(Vec<JobId>),
    /// Account has no credits left
    QuotaExhausted,
    /// Server rejected the account cookie
    Unauthorized,
    /// Server refused the prompt, detail kept for the user
    PromptRejected(String),
    /// Too many jobs already running on the account
    TooManyJobs(String),
    /// Any other structured error
    OtherError(String),
    /// Network failure or non-success status after all retries
    TransportFailure,
}

/// Body of `POST /generate/description-mode`
#[derive(Debug, Clone, Serialize)]
pub struct DescriptionRequest<'a> {
    /// Free-text description of the song
    pub gpt_description_prompt: &'a str,
    /// Generate without vocals
    pub make_instrumental: bool,
    /// Model version
    pub mv: &'a str,
}

/// Body of `POST /generate`
#[derive(Debug, Clone, Serialize)]
pub struct CustomRequest<'a> {
    /// Song title
    pub title: &'a str,
    /// Style tags
    pub tags: &'a str,
    /// Literal lyrics
    pub prompt: &'a str,
    /// Generate without vocals
    pub make_instrumental: bool,
    /// Model version
    pub mv: &'a str,
    /// Always `null`: continuation is not supported
    pub continue_clip_id: Option<&'a str>,
    /// Always `null`: continuation is not supported
    pub continue_at: Option<f64>,
}

/// Body of `POST /generate/lyrics/`
#[derive(Debug, Clone, Serialize)]
pub struct LyricsRequest<'a> {
    /// Free-text description of the lyrics
    pub prompt: &'a str,
}

/// Reference to a clip inside a submission response
#[derive(Debug, Clone, Deserialize)]
pub struct ClipRef {
    /// Clip id
    pub id: String,
}

/// Any submission response: a job list, a lyrics id or a structured error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitResponse {
    /// Structured error; a string, or a validation list on 422
    #[serde(default)]
    pub detail: Option<Value>,
    /// Created clips (music submissions)
    #[serde(default)]
    pub clips: Option<Vec<ClipRef>>,
    /// Created lyrics job (lyrics submissions)
    #[serde(default)]
    pub id: Option<String>,
}

impl SubmitResponse {
    /// Error detail as text, `None` when absent or empty
    #[must_use]
    pub fn detail_text(&self) -> Option<String> {
        let text = match self.detail.as_ref()? {
            Value::Null => return None,
            Value::String(s) => s.trim().to_string(),
            other => other.to_string(),
        };
        (!text.is_empty()).then_some(text)
    }
}

/// Metadata block of a feed item
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClipMetadata {
    /// Lyrics the clip was sung with
    #[serde(default)]
    pub prompt: Option<String>,
    /// Style tags
    #[serde(default)]
    pub tags: Option<String>,
    /// Description the lyrics were generated from
    #[serde(default)]
    pub gpt_description_prompt: Option<String>,
}

/// One element of `GET /feed/{id}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedClip {
    /// Clip id
    #[serde(default)]
    pub id: Option<String>,
    /// Song title
    #[serde(default)]
    pub title: Option<String>,
    /// Lyrics, tags and prompt
    #[serde(default)]
    pub metadata: Option<ClipMetadata>,
    /// Audio, once rendered
    #[serde(default)]
    pub audio_url: Option<String>,
    /// Cover, once rendered
    #[serde(default)]
    pub image_url: Option<String>,
    /// Video, once rendered
    #[serde(default)]
    pub video_url: Option<String>,
}

/// Body of `GET /lyrics/{id}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LyricsJob {
    /// Lyrics job id
    #[serde(default)]
    pub id: Option<String>,
    /// Generated title
    #[serde(default)]
    pub title: Option<String>,
    /// Generated lyrics
    #[serde(default)]
    pub text: Option<String>,
    /// `complete` when done
    #[serde(default)]
    pub status: Option<String>,
}

/// Lyrics status reported once generation has finished
pub const LYRICS_STATUS_COMPLETE: &str = "complete";

/// Latest known state of one job. Optional fields fill in as the server
/// finishes each stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactSnapshot {
    /// Song or lyrics title
    pub title: String,
    /// Lyrics text
    pub lyrics_text: String,
    /// Style tags
    pub tags: String,
    /// Description prompt the server worked from
    pub description_prompt: String,
    /// Rendered audio
    pub audio_url: Option<String>,
    /// Rendered cover
    pub image_url: Option<String>,
    /// Rendered video
    pub video_url: Option<String>,
    /// Lyrics job status
    pub lyrics_status: Option<String>,
}

impl ArtifactSnapshot {
    /// Audio can be downloaded
    #[must_use]
    pub const fn has_audio(&self) -> bool {
        self.audio_url.is_some()
    }

    /// Cover can be sent
    #[must_use]
    pub const fn has_cover(&self) -> bool {
        self.image_url.is_some()
    }

    /// Video link can be shared
    #[must_use]
    pub const fn has_video(&self) -> bool {
        self.video_url.is_some()
    }

    /// Lyrics job has finished
    #[must_use]
    pub fn lyrics_complete(&self) -> bool {
        self.lyrics_status.as_deref() == Some(LYRICS_STATUS_COMPLETE)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<FeedClip> for ArtifactSnapshot {
    fn from(clip: FeedClip) -> Self {
        let metadata = clip.metadata.unwrap_or_default();
        Self {
            title: clip.title.unwrap_or_default(),
            lyrics_text: metadata.prompt.unwrap_or_default(),
            tags: metadata.tags.unwrap_or_default(),
            description_prompt: metadata.gpt_description_prompt.unwrap_or_default(),
            audio_url: non_empty(clip.audio_url),
            image_url: non_empty(clip.image_url),
            video_url: non_empty(clip.video_url),
            lyrics_status: None,
        }
    }
}

impl From<LyricsJob> for ArtifactSnapshot {
    fn from(job: LyricsJob) -> Self {
        Self {
            title: job.title.unwrap_or_default(),
            lyrics_text: job.text.unwrap_or_default(),
            lyrics_status: non_empty(job.status),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn feed_clip_maps_empty_urls_to_absent() -> Result<(), serde_json::Error> {
        let clip: FeedClip = serde_json::from_value(json!({
            "id": "a1",
            "title": "Sunny",
            "metadata": {"prompt": "la la", "tags": "pop", "gpt_description_prompt": "a happy song"},
            "audio_url": "https://cdn.test/a1.mp3",
            "image_url": "",
            "video_url": null
        }))?;
        let snapshot = ArtifactSnapshot::from(clip);

        assert_eq!(snapshot.title, "Sunny");
        assert_eq!(snapshot.lyrics_text, "la la");
        assert_eq!(snapshot.description_prompt, "a happy song");
        assert!(snapshot.has_audio());
        assert!(!snapshot.has_cover());
        assert!(!snapshot.has_video());
        Ok(())
    }

    #[test]
    fn lyrics_job_completion() -> Result<(), serde_json::Error> {
        let job: LyricsJob = serde_json::from_value(json!({
            "id": "l1", "title": "Rain", "text": "drip drop", "status": "complete"
        }))?;
        let snapshot = ArtifactSnapshot::from(job);
        assert!(snapshot.lyrics_complete());
        assert_eq!(snapshot.lyrics_text, "drip drop");

        let pending = ArtifactSnapshot::from(LyricsJob {
            status: Some("running".to_string()),
            ..LyricsJob::default()
        });
        assert!(!pending.lyrics_complete());
        Ok(())
    }

    #[test]
    fn custom_request_serializes_null_continuation() -> Result<(), serde_json::Error> {
        let body = serde_json::to_value(CustomRequest {
            title: "T",
            tags: "rock",
            prompt: "words",
            make_instrumental: false,
            mv: "chirp-v3-0",
            continue_clip_id: None,
            continue_at: None,
        })?;
        assert_eq!(body["continue_clip_id"], Value::Null);
        assert_eq!(body["continue_at"], Value::Null);
        assert_eq!(body["tags"], "rock");
        Ok(())
    }

    #[test]
    fn detail_text_handles_non_string_details() -> Result<(), serde_json::Error> {
        let resp: SubmitResponse =
            serde_json::from_value(json!({"detail": [{"msg": "field required"}]}))?;
        assert!(resp.detail_text().is_some_and(|d| d.contains("field required")));

        let resp: SubmitResponse = serde_json::from_value(json!({"detail": ""}))?;
        assert_eq!(resp.detail_text(), None);
        Ok(())
    }
}
