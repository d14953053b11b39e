//! Entry point for inbound chat text.

use super::channel::{Reply, ReplyChannel, Requester};
use super::delivery::{
    DeliveryOptions, DeliveryPipeline, DeliverySession, LyricsDelivery, MusicDelivery,
};
use super::intent::{CommandPrefixes, CreationIntent, CustomFields, IntentError, IntentMode};
use super::views;
use super::worker::JobDispatcher;
use crate::suno::{GenerationOutcome, GenerationService, JobId};
use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

/// What happened to an inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    /// Not a command, nothing was sent
    Ignored,
    /// At least one reply was sent
    Replied,
}

/// Parses commands, submits jobs and hands accepted ones to a worker.
pub struct CommandHandler {
    prefixes: CommandPrefixes,
    service: Arc<GenerationService>,
    options: Arc<DeliveryOptions>,
    dispatcher: JobDispatcher,
}

impl CommandHandler {
    /// Create a handler
    #[must_use]
    pub fn new(
        prefixes: CommandPrefixes,
        service: Arc<GenerationService>,
        options: Arc<DeliveryOptions>,
        dispatcher: JobDispatcher,
    ) -> Self {
        Self {
            prefixes,
            service,
            options,
            dispatcher,
        }
    }

    /// Configured prefixes, used for help output
    #[must_use]
    pub const fn prefixes(&self) -> &CommandPrefixes {
        &self.prefixes
    }

    /// Dispatcher the workers are started on
    #[must_use]
    pub const fn dispatcher(&self) -> &JobDispatcher {
        &self.dispatcher
    }

    /// Handle one inbound message.
    ///
    /// Returns once the submission is acknowledged; delivery continues on a
    /// background worker.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel fails to send a synchronous reply.
    pub async fn handle(
        &self,
        text: &str,
        requester: Requester,
        channel: Arc<dyn ReplyChannel>,
    ) -> Result<Handled> {
        let intent = match self.prefixes.parse(text) {
            Ok(Some(intent)) => intent,
            Ok(None) => return Ok(Handled::Ignored),
            Err(IntentError::CustomFormat) => {
                info!(requester = %requester.nickname, "Malformed custom prompt, sending help");
                channel
                    .send(Reply::Text(views::help_text(&self.prefixes)))
                    .await?;
                return Ok(Handled::Replied);
            }
        };

        info!(
            requester = %requester.nickname,
            mode = ?intent.mode,
            instrumental = intent.instrumental,
            "Creation request"
        );

        match intent.mode {
            IntentMode::Lyrics => self.create_lyrics(&intent.prompt, requester, channel).await?,
            IntentMode::Description | IntentMode::Instrumental => {
                self.create_from_description(&intent, requester, channel)
                    .await?;
            }
            IntentMode::CustomMusic => self.create_custom(&intent, requester, channel).await?,
        }
        Ok(Handled::Replied)
    }

    async fn create_from_description(
        &self,
        intent: &CreationIntent,
        requester: Requester,
        channel: Arc<dyn ReplyChannel>,
    ) -> Result<()> {
        let outcome = self
            .service
            .submit_description_music(&intent.prompt, intent.instrumental)
            .await;

        match outcome {
            GenerationOutcome::Accepted(ids) => {
                self.start_music(ids, &intent.prompt, &intent.prompt, requester, channel)
                    .await
            }
            GenerationOutcome::QuotaExhausted if intent.mode == IntentMode::Description => {
                self.lyrics_fallback(&intent.prompt, requester, channel).await
            }
            other => channel.send(Reply::Text(outcome_message(&other))).await,
        }
    }

    async fn create_custom(
        &self,
        intent: &CreationIntent,
        requester: Requester,
        channel: Arc<dyn ReplyChannel>,
    ) -> Result<()> {
        let fields = intent.custom.clone().unwrap_or_default();
        let outcome = self
            .service
            .submit_custom_music(
                fields.title.as_deref(),
                fields.tags.as_deref(),
                fields.lyrics.as_deref(),
                intent.instrumental,
            )
            .await;

        match outcome {
            GenerationOutcome::Accepted(ids) => {
                let label = custom_file_label(&fields);
                self.start_music(ids, &intent.prompt, &label, requester, channel)
                    .await
            }
            other => channel.send(Reply::Text(outcome_message(&other))).await,
        }
    }

    async fn create_lyrics(
        &self,
        prompt: &str,
        requester: Requester,
        channel: Arc<dyn ReplyChannel>,
    ) -> Result<()> {
        match self.service.submit_lyrics(prompt).await {
            GenerationOutcome::Accepted(ids) => {
                let ack = views::lyrics_ack(&self.options.bot_name, &requester);
                self.start_lyrics(ids, prompt, ack, requester, channel).await
            }
            other => channel.send(Reply::Text(outcome_message(&other))).await,
        }
    }

    /// Music quota is gone: write lyrics for the same prompt instead.
    async fn lyrics_fallback(
        &self,
        prompt: &str,
        requester: Requester,
        channel: Arc<dyn ReplyChannel>,
    ) -> Result<()> {
        info!(requester = %requester.nickname, "Music quota exhausted, falling back to lyrics");
        match self.service.submit_lyrics(prompt).await {
            GenerationOutcome::Accepted(ids) => {
                let ack = views::quota_fallback(&self.options.bot_name);
                self.start_lyrics(ids, prompt, ack, requester, channel).await
            }
            other => {
                warn!(outcome = ?other, "Lyrics fallback was not accepted");
                channel.send(Reply::Text(views::quota_exhausted())).await
            }
        }
    }

    async fn start_music(
        &self,
        ids: Vec<JobId>,
        prompt: &str,
        file_label: &str,
        requester: Requester,
        channel: Arc<dyn ReplyChannel>,
    ) -> Result<()> {
        channel
            .send(Reply::Text(views::music_ack(&self.options.bot_name, &requester)))
            .await?;

        let job = MusicDelivery {
            job_ids: ids,
            prompt: prompt.to_string(),
            file_label: file_label.to_string(),
            submitted_at: Utc::now(),
        };
        let label = job_label(&job.job_ids);
        let pipeline = DeliveryPipeline::new(
            self.service.clone(),
            channel.clone(),
            self.options.clone(),
        );
        let mut session = DeliverySession::new(requester);

        self.dispatcher.dispatch(&label, channel, async move {
            pipeline.deliver_music(&mut session, &job).await
        });
        Ok(())
    }

    async fn start_lyrics(
        &self,
        ids: Vec<JobId>,
        prompt: &str,
        ack: String,
        requester: Requester,
        channel: Arc<dyn ReplyChannel>,
    ) -> Result<()> {
        let Some(job_id) = ids.into_iter().next() else {
            return channel.send(Reply::Text(views::generic_failure())).await;
        };
        channel.send(Reply::Text(ack)).await?;

        let job = LyricsDelivery {
            job_id,
            prompt: prompt.to_string(),
        };
        let label = job.job_id.to_string();
        let pipeline = DeliveryPipeline::new(
            self.service.clone(),
            channel.clone(),
            self.options.clone(),
        );
        let mut session = DeliverySession::new(requester);

        self.dispatcher.dispatch(&label, channel, async move {
            pipeline.deliver_lyrics(&mut session, &job).await
        });
        Ok(())
    }
}

/// User message for a submission that was not accepted
fn outcome_message(outcome: &GenerationOutcome) -> String {
    match outcome {
        GenerationOutcome::QuotaExhausted => views::quota_exhausted(),
        GenerationOutcome::Unauthorized => views::unauthorized(),
        GenerationOutcome::PromptRejected(detail) => views::prompt_rejected(detail),
        GenerationOutcome::TooManyJobs(detail) => views::too_many_jobs(detail),
        GenerationOutcome::OtherError(detail) => views::remote_error(detail),
        GenerationOutcome::Accepted(_) | GenerationOutcome::TransportFailure => {
            views::generic_failure()
        }
    }
}

fn custom_file_label(fields: &CustomFields) -> String {
    fields
        .title
        .clone()
        .or_else(|| fields.tags.clone())
        .unwrap_or_default()
}

fn job_label(ids: &[JobId]) -> String {
    ids.iter()
        .map(JobId::as_str)
        .collect::<Vec<_>>()
        .join(",")
}
