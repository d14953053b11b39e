use super::handlers::{self, Command};
use crate::config::Settings;
use crate::music::intent::CommandPrefixes;
use crate::music::{CommandHandler, DeliveryOptions, JobDispatcher, PollSchedule};
use crate::suno::service::RetryBudgets;
use crate::suno::{FirstEndpoint, GenerationService, HttpSunoApi, SunoError};
use crate::utils::RetryPolicy;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use tracing::{error, info};

/// Run the Telegram transport runtime.
///
/// # Errors
///
/// Returns an error if the Suno-API endpoint cannot be resolved or the
/// output directory cannot be created.
pub async fn run_bot(settings: Arc<Settings>) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&settings.music_output_dir).await?;
    let handler = Arc::new(build_command_handler(&settings)?);
    info!(
        output_dir = %settings.music_output_dir.display(),
        model = %settings.suno_model,
        "Command handler initialized."
    );

    let bot = Bot::new(settings.telegram_token.clone());

    info!("Bot is running...");

    Dispatcher::builder(bot, setup_handler())
        .dependencies(dptree::deps![handler])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

/// Wire settings into the service graph.
///
/// # Errors
///
/// Returns `SunoError::NoEndpoint` if no API base is configured.
pub fn build_command_handler(settings: &Settings) -> Result<CommandHandler, SunoError> {
    let endpoint = FirstEndpoint::from_bases(&settings.suno_api_bases())?;
    let api = Arc::new(HttpSunoApi::new(Arc::new(endpoint)));
    let budgets = RetryBudgets {
        submit: RetryPolicy::submit(settings.submit_retries),
        ..RetryBudgets::default()
    };
    let service = Arc::new(GenerationService::new(
        api,
        settings.suno_model.clone(),
        budgets,
    ));

    let prefixes = CommandPrefixes {
        music: settings.music_prefixes(),
        instrumental: settings.instrumental_prefixes(),
        lyrics: settings.lyrics_prefixes(),
    };
    let options = Arc::new(DeliveryOptions {
        output_dir: settings.music_output_dir.clone(),
        send_lyrics: settings.send_lyrics,
        send_covers: settings.send_covers,
        bot_name: settings.bot_name.clone(),
        schedule: PollSchedule::default(),
    });

    Ok(CommandHandler::new(
        prefixes,
        service,
        options,
        JobDispatcher::new(),
    ))
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(dptree::filter(|msg: Message| msg.text().is_some()).endpoint(handle_text_message))
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    handler: Arc<CommandHandler>,
) -> Result<(), teloxide::RequestError> {
    let res = match cmd {
        Command::Help => handlers::help(bot, msg, handler).await,
        Command::Healthcheck => handlers::healthcheck(bot, msg).await,
    };
    if let Err(e) = res {
        error!("Command error: {}", e);
    }
    respond(())
}

async fn handle_text_message(
    bot: Bot,
    msg: Message,
    handler: Arc<CommandHandler>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_text(bot, msg, handler).await {
        error!("Text handler error: {}", e);
    }
    respond(())
}
