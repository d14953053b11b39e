//! Ordered delivery of a job's artifacts to the chat.
//!
//! For music: per clip, lyrics card, audio file and cover; then one summary
//! with the video links of every clip. For lyrics: a single card.

use super::channel::{Reply, ReplyChannel, Requester};
use super::polling::{poll_until, ArtifactKind, PollError, PollSchedule, PollSpec};
use super::views;
use crate::config::AUDIO_FILE_STEM_MAX_CHARS;
use crate::suno::{ArtifactSnapshot, GenerationService, JobId, SunoError};
use crate::utils::file_stem_from_text;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Feature toggles and paths for delivery
#[derive(Debug, Clone)]
pub struct DeliveryOptions {
    /// Where audio files are written
    pub output_dir: PathBuf,
    /// Send the lyrics card before each audio file
    pub send_lyrics: bool,
    /// Send the cover image after each audio file
    pub send_covers: bool,
    /// Name the bot uses for itself
    pub bot_name: String,
    /// Poll timing per artifact
    pub schedule: PollSchedule,
}

/// Something that reached the chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredArtifact {
    /// Job the artifact belongs to
    pub job_id: JobId,
    /// What was sent
    pub kind: ArtifactKind,
    /// Text, path or URL that was sent
    pub payload: String,
}

/// Per-request state of one worker
#[derive(Debug, Clone)]
pub struct DeliverySession {
    /// Who asked
    pub requester: Requester,
    /// Lyrics of the previous card, to skip identical ones; `None` until a
    /// card has been sent
    pub last_sent_lyrics: Option<String>,
    /// Everything sent so far, in order
    pub delivered: Vec<DeliveredArtifact>,
}

impl DeliverySession {
    /// Fresh session for `requester`
    #[must_use]
    pub const fn new(requester: Requester) -> Self {
        Self {
            requester,
            last_sent_lyrics: None,
            delivered: Vec::new(),
        }
    }

    fn record(&mut self, job_id: &JobId, kind: ArtifactKind, payload: impl Into<String>) {
        self.delivered.push(DeliveredArtifact {
            job_id: job_id.clone(),
            kind,
            payload: payload.into(),
        });
    }

    /// Number of delivered artifacts of `kind`
    #[must_use]
    pub fn count(&self, kind: ArtifactKind) -> usize {
        self.delivered.iter().filter(|a| a.kind == kind).count()
    }
}

/// An accepted music submission
#[derive(Debug, Clone)]
pub struct MusicDelivery {
    /// Clip ids in submission order
    pub job_ids: Vec<JobId>,
    /// Prompt shown on the song card
    pub prompt: String,
    /// Text the audio file names are derived from (prompt or custom title)
    pub file_label: String,
    /// When the job was submitted
    pub submitted_at: DateTime<Utc>,
}

/// An accepted lyrics submission
#[derive(Debug, Clone)]
pub struct LyricsDelivery {
    /// Lyrics job id
    pub job_id: JobId,
    /// Prompt shown on the lyrics card
    pub prompt: String,
}

/// A required step failed; the rest of the batch is abandoned
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Audio or lyrics never became available
    #[error("{job_id}: {source}")]
    Artifact {
        /// Affected job
        job_id: JobId,
        /// Why polling stopped
        source: PollError,
    },
    /// The audio file could not be downloaded
    #[error("{job_id}: audio download failed: {source}")]
    Download {
        /// Affected job
        job_id: JobId,
        /// Last download error
        source: SunoError,
    },
    /// The chat refused a required reply
    #[error(transparent)]
    Channel(#[from] anyhow::Error),
}

const JOB_ID_FILE_CHARS: usize = 8;

/// Latest snapshot kept per clip so finished fields are not fetched again
struct ClipProgress {
    job_id: JobId,
    latest: ArtifactSnapshot,
}

/// Drives polling and sends artifacts in order.
pub struct DeliveryPipeline {
    service: Arc<GenerationService>,
    channel: Arc<dyn ReplyChannel>,
    options: Arc<DeliveryOptions>,
}

impl DeliveryPipeline {
    /// Create a pipeline delivering to `channel`
    #[must_use]
    pub fn new(
        service: Arc<GenerationService>,
        channel: Arc<dyn ReplyChannel>,
        options: Arc<DeliveryOptions>,
    ) -> Self {
        Self {
            service,
            channel,
            options,
        }
    }

    /// Deliver every clip of a music submission.
    ///
    /// # Errors
    ///
    /// Returns the first required failure (audio not ready, download or
    /// file send failed); clips after it are not delivered.
    pub async fn deliver_music(
        &self,
        session: &mut DeliverySession,
        job: &MusicDelivery,
    ) -> Result<(), DeliveryError> {
        let mut clips = Vec::with_capacity(job.job_ids.len());

        for (index, job_id) in job.job_ids.iter().enumerate() {
            let audio_spec = if index == 0 {
                self.options.schedule.audio
            } else {
                self.options.schedule.audio.without_initial_delay()
            };
            let latest = self
                .await_clip(job_id, ArtifactKind::Audio, audio_spec, None)
                .await
                .map_err(|source| DeliveryError::Artifact {
                    job_id: job_id.clone(),
                    source,
                })?;

            self.send_lyrics_card(session, job_id, &latest, &job.prompt)
                .await?;
            self.send_audio(session, job, index, job_id, &latest).await?;
            let latest = self.send_cover(session, job_id, latest).await;

            clips.push(ClipProgress {
                job_id: job_id.clone(),
                latest,
            });
        }

        let mut videos = Vec::with_capacity(clips.len());
        for clip in &clips {
            let spec = self.options.schedule.video;
            match self
                .await_clip(&clip.job_id, ArtifactKind::Video, spec, Some(&clip.latest))
                .await
            {
                Ok(snapshot) => {
                    if let Some(url) = &snapshot.video_url {
                        session.record(&clip.job_id, ArtifactKind::Video, url.as_str());
                    }
                    videos.push(snapshot.video_url);
                }
                Err(e) => {
                    warn!(job_id = %clip.job_id, error = %e, "Video unavailable, using placeholder");
                    videos.push(None);
                }
            }
        }

        let summary = views::video_summary(&self.options.bot_name, &session.requester, &videos);
        self.channel.send(Reply::Text(summary)).await?;
        info!(
            jobs = clips.len(),
            delivered = session.delivered.len(),
            "Music delivery finished"
        );
        Ok(())
    }

    /// Wait for a lyrics job and send its card.
    ///
    /// # Errors
    ///
    /// Returns an error if the lyrics never complete or the card cannot be sent.
    pub async fn deliver_lyrics(
        &self,
        session: &mut DeliverySession,
        job: &LyricsDelivery,
    ) -> Result<(), DeliveryError> {
        let service = &self.service;
        let job_id = &job.job_id;
        let snapshot = poll_until(
            ArtifactKind::Lyrics,
            self.options.schedule.lyrics,
            || service.fetch_lyrics(job_id),
            ArtifactSnapshot::lyrics_complete,
        )
        .await
        .map_err(|source| DeliveryError::Artifact {
            job_id: job_id.clone(),
            source,
        })?;

        let card = views::lyrics_card(&snapshot, &session.requester, &job.prompt);
        self.channel.send(Reply::Text(card)).await?;
        session.last_sent_lyrics = Some(snapshot.lyrics_text.clone());
        session.record(job_id, ArtifactKind::Lyrics, snapshot.lyrics_text);
        info!(job_id = %job_id, "Lyrics delivery finished");
        Ok(())
    }

    /// Reuse `known` when it already carries the field, otherwise poll.
    async fn await_clip(
        &self,
        job_id: &JobId,
        kind: ArtifactKind,
        spec: PollSpec,
        known: Option<&ArtifactSnapshot>,
    ) -> Result<ArtifactSnapshot, PollError> {
        let ready: fn(&ArtifactSnapshot) -> bool = match kind {
            ArtifactKind::Audio => ArtifactSnapshot::has_audio,
            ArtifactKind::Cover => ArtifactSnapshot::has_cover,
            ArtifactKind::Video => ArtifactSnapshot::has_video,
            ArtifactKind::Lyrics => ArtifactSnapshot::lyrics_complete,
        };

        if let Some(snapshot) = known.filter(|s| ready(s)) {
            debug!(job_id = %job_id, %kind, "Already observed, not polling again");
            return Ok(snapshot.clone());
        }

        let service = &self.service;
        poll_until(kind, spec, || service.fetch_clip(job_id), ready).await
    }

    async fn send_lyrics_card(
        &self,
        session: &mut DeliverySession,
        job_id: &JobId,
        snapshot: &ArtifactSnapshot,
        prompt: &str,
    ) -> Result<(), DeliveryError> {
        if !self.options.send_lyrics {
            return Ok(());
        }
        if session.last_sent_lyrics.as_deref() == Some(snapshot.lyrics_text.as_str()) {
            debug!(job_id = %job_id, "Lyrics identical to previous clip, skipping");
            return Ok(());
        }

        let prompt = if snapshot.description_prompt.is_empty() {
            prompt
        } else {
            snapshot.description_prompt.as_str()
        };
        let card = views::song_card(snapshot, &session.requester, prompt);
        self.channel.send(Reply::Text(card)).await?;

        session.last_sent_lyrics = Some(snapshot.lyrics_text.clone());
        session.record(job_id, ArtifactKind::Lyrics, snapshot.lyrics_text.as_str());
        Ok(())
    }

    async fn send_audio(
        &self,
        session: &mut DeliverySession,
        job: &MusicDelivery,
        index: usize,
        job_id: &JobId,
        snapshot: &ArtifactSnapshot,
    ) -> Result<(), DeliveryError> {
        let Some(audio_url) = snapshot.audio_url.as_deref() else {
            return Err(DeliveryError::Artifact {
                job_id: job_id.clone(),
                source: PollError::FetchFailed {
                    kind: ArtifactKind::Audio,
                },
            });
        };

        let path = self
            .options
            .output_dir
            .join(audio_file_name(job, index, job_id));
        let bytes = self
            .service
            .download(audio_url, &path)
            .await
            .map_err(|source| DeliveryError::Download {
                job_id: job_id.clone(),
                source,
            })?;
        debug!(job_id = %job_id, path = %path.display(), bytes, "Audio downloaded");

        self.channel.send(Reply::File(path.clone())).await?;
        session.record(job_id, ArtifactKind::Audio, path.display().to_string());
        Ok(())
    }

    /// Optional: a missing cover is logged and skipped.
    async fn send_cover(
        &self,
        session: &mut DeliverySession,
        job_id: &JobId,
        latest: ArtifactSnapshot,
    ) -> ArtifactSnapshot {
        if !self.options.send_covers {
            return latest;
        }

        let spec = self.options.schedule.cover;
        let snapshot = match self
            .await_clip(job_id, ArtifactKind::Cover, spec, Some(&latest))
            .await
        {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "Cover unavailable, skipping");
                return latest;
            }
        };

        if let Some(image_url) = snapshot.image_url.clone() {
            match self.channel.send(Reply::ImageUrl(image_url.clone())).await {
                Ok(()) => session.record(job_id, ArtifactKind::Cover, image_url),
                Err(e) => warn!(job_id = %job_id, error = %e, "Failed to send cover"),
            }
        }
        snapshot
    }
}

/// `{submitted-at millis}_{label stem}_{job id prefix}.mp3`
fn audio_file_name(job: &MusicDelivery, index: usize, job_id: &JobId) -> String {
    let mut stem = file_stem_from_text(&job.file_label, AUDIO_FILE_STEM_MAX_CHARS);
    if stem.is_empty() {
        stem = format!("song{}", index + 1);
    }
    format!(
        "{}_{}_{}.mp3",
        job.submitted_at.timestamp_millis(),
        stem,
        file_stem_from_text(job_id.as_str(), JOB_ID_FILE_CHARS)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::channel::MockReplyChannel;
    use crate::suno::api::MockSunoApi;
    use crate::suno::service::RetryBudgets;
    use crate::config::LYRICS_TIMEOUT_SECS;
    use crate::suno::types::{ClipMetadata, FeedClip};
    use std::sync::Mutex;
    use std::time::Duration;

    fn clip(lyrics: &str, audio: bool, image: bool, video: bool) -> FeedClip {
        let url = |on: bool, ext: &str| on.then(|| format!("https://cdn.test/clip.{ext}"));
        FeedClip {
            title: Some("Sunny".to_string()),
            metadata: Some(ClipMetadata {
                prompt: Some(lyrics.to_string()),
                tags: Some("pop".to_string()),
                gpt_description_prompt: Some("a happy song".to_string()),
            }),
            audio_url: url(audio, "mp3"),
            image_url: url(image, "jpg"),
            video_url: url(video, "mp4"),
            ..FeedClip::default()
        }
    }

    fn options(dir: &std::path::Path) -> Arc<DeliveryOptions> {
        Arc::new(DeliveryOptions {
            output_dir: dir.to_path_buf(),
            send_lyrics: true,
            send_covers: true,
            bot_name: "Suno".to_string(),
            schedule: PollSchedule::default(),
        })
    }

    fn recording_channel(sent: Arc<Mutex<Vec<Reply>>>) -> MockReplyChannel {
        let mut channel = MockReplyChannel::new();
        channel.expect_send().returning(move |reply| {
            sent.lock().expect("lock").push(reply);
            Ok(())
        });
        channel
    }

    fn music_job(ids: &[&str]) -> MusicDelivery {
        MusicDelivery {
            job_ids: ids.iter().map(|id| JobId::from(*id)).collect(),
            prompt: "a happy song".to_string(),
            file_label: "a happy song".to_string(),
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn audio_file_name_is_short_and_unique_per_clip() {
        let job = music_job(&["abcdef0123456789", "zzzz"]);
        let first = audio_file_name(&job, 0, &job.job_ids[0]);
        let second = audio_file_name(&job, 1, &job.job_ids[1]);

        assert!(first.ends_with("_ahappysong_abcdef01.mp3"), "{first}");
        assert!(second.ends_with("_ahappysong_zzzz.mp3"), "{second}");
        assert_ne!(first, second);
    }

    #[tokio::test(start_paused = true)]
    async fn identical_lyrics_are_sent_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut api = MockSunoApi::new();
        api.expect_feed()
            .returning(|_| Ok(vec![clip("same words", true, true, true)]));
        api.expect_download().times(2).returning(|_, _| Ok(3));

        let sent = Arc::new(Mutex::new(Vec::new()));
        let service = Arc::new(GenerationService::new(
            Arc::new(api),
            "chirp-v3-0",
            RetryBudgets::default(),
        ));
        let pipeline = DeliveryPipeline::new(
            service,
            Arc::new(recording_channel(sent.clone())),
            options(dir.path()),
        );
        let mut session = DeliverySession::new(Requester::new("Alice", false));

        pipeline
            .deliver_music(&mut session, &music_job(&["a1", "a2"]))
            .await
            .expect("delivery succeeds");

        let sent = sent.lock().expect("lock").clone();
        let texts: Vec<&String> = sent
            .iter()
            .filter_map(|r| match r {
                Reply::Text(t) => Some(t),
                _ => None,
            })
            .collect();
        // one lyrics card + the summary
        assert_eq!(texts.len(), 2);
        assert_eq!(session.count(ArtifactKind::Lyrics), 1);
        assert_eq!(session.count(ArtifactKind::Audio), 2);
        assert_eq!(session.count(ArtifactKind::Cover), 2);
        assert!(matches!(sent.last(), Some(Reply::Text(t)) if t.contains("视频2: https://cdn.test/clip.mp4")));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_cover_and_video_do_not_block_audio() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut api = MockSunoApi::new();
        api.expect_feed()
            .returning(|id| Ok(vec![clip(id, true, false, false)]));
        api.expect_download().times(2).returning(|_, _| Ok(3));

        let sent = Arc::new(Mutex::new(Vec::new()));
        let service = Arc::new(GenerationService::new(
            Arc::new(api),
            "chirp-v3-0",
            RetryBudgets::default(),
        ));
        let pipeline = DeliveryPipeline::new(
            service,
            Arc::new(recording_channel(sent.clone())),
            options(dir.path()),
        );
        let mut session = DeliverySession::new(Requester::new("Alice", true));

        pipeline
            .deliver_music(&mut session, &music_job(&["a1", "a2"]))
            .await
            .expect("optional artifacts never abort delivery");

        let sent = sent.lock().expect("lock").clone();
        let files = sent.iter().filter(|r| matches!(r, Reply::File(_))).count();
        let images = sent.iter().filter(|r| matches!(r, Reply::ImageUrl(_))).count();
        assert_eq!(files, 2);
        assert_eq!(images, 0);
        // different lyrics per clip: two cards
        assert_eq!(session.count(ArtifactKind::Lyrics), 2);

        let Some(Reply::Text(summary)) = sent.last() else {
            panic!("summary must be last");
        };
        assert!(summary.starts_with("@Alice\n"));
        assert!(summary.contains(&format!("视频1: {}", views::VIDEO_UNAVAILABLE)));
        assert!(summary.contains(&format!("视频2: {}", views::VIDEO_UNAVAILABLE)));
    }

    #[tokio::test(start_paused = true)]
    async fn audio_timeout_aborts_remaining_batch() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut api = MockSunoApi::new();
        api.expect_feed()
            .returning(|_| Ok(vec![clip("words", false, false, false)]));
        api.expect_download().never();

        let sent = Arc::new(Mutex::new(Vec::new()));
        let service = Arc::new(GenerationService::new(
            Arc::new(api),
            "chirp-v3-0",
            RetryBudgets::default(),
        ));
        let pipeline = DeliveryPipeline::new(
            service,
            Arc::new(recording_channel(sent.clone())),
            options(dir.path()),
        );
        let mut session = DeliverySession::new(Requester::new("Alice", false));

        let result = pipeline
            .deliver_music(&mut session, &music_job(&["a1", "a2"]))
            .await;

        let Err(DeliveryError::Artifact { job_id, source }) = result else {
            panic!("expected artifact error, got {result:?}");
        };
        assert_eq!(job_id, JobId::from("a1"));
        assert!(matches!(source, PollError::TimedOut { kind: ArtifactKind::Audio, .. }));
        assert!(sent.lock().expect("lock").is_empty());
    }

    fn pipeline_with(
        api: MockSunoApi,
        sent: Arc<Mutex<Vec<Reply>>>,
        dir: &std::path::Path,
    ) -> DeliveryPipeline {
        let service = Arc::new(GenerationService::new(
            Arc::new(api),
            "chirp-v3-0",
            RetryBudgets::default(),
        ));
        DeliveryPipeline::new(service, Arc::new(recording_channel(sent)), options(dir))
    }

    #[tokio::test(start_paused = true)]
    async fn instrumental_clip_still_gets_song_card() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut api = MockSunoApi::new();
        api.expect_feed()
            .returning(|_| Ok(vec![clip("", true, true, true)]));
        api.expect_download().times(1).returning(|_, _| Ok(3));

        let sent = Arc::new(Mutex::new(Vec::new()));
        let pipeline = pipeline_with(api, sent.clone(), dir.path());
        let mut session = DeliverySession::new(Requester::new("Alice", false));

        pipeline
            .deliver_music(&mut session, &music_job(&["a1"]))
            .await
            .expect("delivery succeeds");

        let sent = sent.lock().expect("lock").clone();
        let Some(Reply::Text(card)) = sent.first() else {
            panic!("song card must come first: {sent:?}");
        };
        assert!(card.contains("Sunny") && card.contains("pop"), "{card}");
        assert_eq!(session.count(ArtifactKind::Lyrics), 1);
        assert_eq!(session.last_sent_lyrics.as_deref(), Some(""));
    }

    #[tokio::test(start_paused = true)]
    async fn download_failure_aborts_batch_before_file_send() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut api = MockSunoApi::new();
        api.expect_feed()
            .returning(|_| Ok(vec![clip("words", true, true, true)]));
        api.expect_download()
            .returning(|url, _| Err(SunoError::Download(format!("{url} returned 502"))));

        let sent = Arc::new(Mutex::new(Vec::new()));
        let pipeline = pipeline_with(api, sent.clone(), dir.path());
        let mut session = DeliverySession::new(Requester::new("Alice", false));

        let result = pipeline
            .deliver_music(&mut session, &music_job(&["a1", "a2"]))
            .await;

        let Err(DeliveryError::Download { job_id, .. }) = result else {
            panic!("expected download error, got {result:?}");
        };
        assert_eq!(job_id, JobId::from("a1"));
        let sent = sent.lock().expect("lock").clone();
        assert!(!sent.iter().any(|r| matches!(r, Reply::File(_))));
        assert!(!sent.iter().any(|r| matches!(r, Reply::Text(t) if t.contains("视频1:"))));
        assert_eq!(session.count(ArtifactKind::Audio), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn ready_clips_are_fetched_once_each() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut api = MockSunoApi::new();
        api.expect_feed()
            .times(2)
            .returning(|_| Ok(vec![clip("words", true, true, true)]));
        api.expect_download().times(2).returning(|_, _| Ok(3));

        let sent = Arc::new(Mutex::new(Vec::new()));
        let pipeline = pipeline_with(api, sent.clone(), dir.path());
        let mut session = DeliverySession::new(Requester::new("Alice", false));

        pipeline
            .deliver_music(&mut session, &music_job(&["a1", "a2"]))
            .await
            .expect("delivery succeeds");

        assert_eq!(session.count(ArtifactKind::Cover), 2);
        assert_eq!(session.count(ArtifactKind::Video), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cover_fetch_failure_is_skipped() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let dir = tempfile::tempdir().expect("tempdir");
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut api = MockSunoApi::new();
        api.expect_feed().returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(vec![clip("words", true, false, false)])
            } else {
                Err(SunoError::Status {
                    status: 502,
                    body: "bad gateway".to_string(),
                })
            }
        });
        api.expect_download().times(1).returning(|_, _| Ok(3));

        let sent = Arc::new(Mutex::new(Vec::new()));
        let pipeline = pipeline_with(api, sent.clone(), dir.path());
        let mut session = DeliverySession::new(Requester::new("Alice", false));

        pipeline
            .deliver_music(&mut session, &music_job(&["a1"]))
            .await
            .expect("a failing cover fetch never aborts delivery");

        assert!(calls.load(Ordering::SeqCst) > 1);
        let sent = sent.lock().expect("lock").clone();
        assert_eq!(sent.iter().filter(|r| matches!(r, Reply::File(_))).count(), 1);
        assert!(!sent.iter().any(|r| matches!(r, Reply::ImageUrl(_))));
        assert_eq!(session.count(ArtifactKind::Cover), 0);
        let Some(Reply::Text(summary)) = sent.last() else {
            panic!("summary must be last");
        };
        assert!(summary.contains(&format!("视频1: {}", views::VIDEO_UNAVAILABLE)));
    }

    #[tokio::test(start_paused = true)]
    async fn lyrics_delivery_times_out() {
        use crate::suno::types::LyricsJob;

        let dir = tempfile::tempdir().expect("tempdir");
        let mut api = MockSunoApi::new();
        api.expect_lyrics().returning(|_| {
            Ok(LyricsJob {
                id: Some("l1".to_string()),
                status: Some("running".to_string()),
                ..LyricsJob::default()
            })
        });

        let sent = Arc::new(Mutex::new(Vec::new()));
        let pipeline = pipeline_with(api, sent.clone(), dir.path());
        let mut session = DeliverySession::new(Requester::new("Bob", false));
        let job = LyricsDelivery {
            job_id: JobId::from("l1"),
            prompt: "rainy night".to_string(),
        };

        let started = tokio::time::Instant::now();
        let result = pipeline.deliver_lyrics(&mut session, &job).await;

        let Err(DeliveryError::Artifact { job_id, source }) = result else {
            panic!("expected artifact error, got {result:?}");
        };
        assert_eq!(job_id, JobId::from("l1"));
        assert!(matches!(source, PollError::TimedOut { kind: ArtifactKind::Lyrics, .. }));
        assert!(started.elapsed() >= Duration::from_secs(LYRICS_TIMEOUT_SECS));
        assert!(sent.lock().expect("lock").is_empty());
        assert!(session.last_sent_lyrics.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn lyrics_delivery_waits_for_completion() {
        use crate::suno::types::LyricsJob;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let dir = tempfile::tempdir().expect("tempdir");
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut api = MockSunoApi::new();
        api.expect_lyrics().returning(move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Ok(LyricsJob {
                id: Some("l1".to_string()),
                title: Some("Rain".to_string()),
                text: Some("drip drop".to_string()),
                status: Some(if n < 2 { "running" } else { "complete" }.to_string()),
            })
        });

        let sent = Arc::new(Mutex::new(Vec::new()));
        let service = Arc::new(GenerationService::new(
            Arc::new(api),
            "chirp-v3-0",
            RetryBudgets::default(),
        ));
        let pipeline = DeliveryPipeline::new(
            service,
            Arc::new(recording_channel(sent.clone())),
            options(dir.path()),
        );
        let mut session = DeliverySession::new(Requester::new("Bob", false));
        let job = LyricsDelivery {
            job_id: JobId::from("l1"),
            prompt: "rainy night".to_string(),
        };

        pipeline
            .deliver_lyrics(&mut session, &job)
            .await
            .expect("lyrics delivered");

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let sent = sent.lock().expect("lock").clone();
        assert_eq!(sent.len(), 1);
        let Reply::Text(card) = &sent[0] else {
            panic!("lyrics card must be text");
        };
        assert!(card.contains("Rain") && card.contains("drip drop") && card.contains("rainy night"));
    }
}
