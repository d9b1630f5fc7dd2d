use anyhow::Result;
use chrono::Local;
use dotenvy::dotenv;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use teloxide::prelude::*;
use tokio_util::sync::CancellationToken;

use reelsaver::cli::{Cli, Commands};
use reelsaver::core::{config, init_logger, ChatTarget};
use reelsaver::download::{DownloadOrchestrator, DownloadPolicy, YtDlpBackend};
use reelsaver::handler::{HandlerSettings, Outbox, RequestHandler};
use reelsaver::housekeeping::{Housekeeper, HousekeeperSettings};
use reelsaver::storage::Storage;
use reelsaver::telegram::{create_bot, schema, setup_bot_commands, TelegramOutbox};

/// Main entry point
///
/// Parses CLI arguments and dispatches to the selected subcommand.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    // .env must be loaded before any config static is touched
    let _ = dotenv();

    let log_path = init_logger(Path::new(config::LOG_DIR.as_str()))?;
    log::info!("Logging to {}", log_path.display());

    match cli.command {
        None | Some(Commands::Run) => run_bot().await,
        Some(Commands::Export { output }) => run_export(output),
        Some(Commands::Stats) => run_stats(),
    }
}

fn open_storage() -> Result<Storage> {
    let storage = Storage::open(
        config::storage::USER_DATA_FILE.as_str(),
        config::storage::STATS_FILE.as_str(),
    )?;
    Ok(storage)
}

fn run_export(output: Option<PathBuf>) -> Result<()> {
    let storage = open_storage()?;
    let dir = output.unwrap_or_else(|| PathBuf::from(config::storage::EXPORT_DIR.as_str()));
    let path = storage.exporter(&dir).export(Local::now())?;
    println!("{}", path.display());
    Ok(())
}

fn run_stats() -> Result<()> {
    let storage = open_storage()?;
    let snapshot = storage.stats.global_snapshot(&storage.users);
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

async fn run_bot() -> Result<()> {
    log::info!("Starting reelsaver...");

    let token = config::BOT_TOKEN.as_str();
    if token.is_empty() {
        anyhow::bail!("BOT_TOKEN is not set");
    }

    let storage = open_storage()?;
    let bot = create_bot(token)?;

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }

    let outbox: Arc<dyn Outbox> = Arc::new(TelegramOutbox::new(bot.clone()));
    let orchestrator = Arc::new(DownloadOrchestrator::new(
        Arc::new(YtDlpBackend::default()),
        DownloadPolicy::from_config(),
    ));
    let exporter = storage.exporter(config::storage::EXPORT_DIR.as_str());

    let settings = HandlerSettings::from_config();
    if settings.operator.is_none() {
        log::warn!("ADMIN_ID is not set, the admin panel is disabled");
    }
    let handler = Arc::new(RequestHandler::new(
        Arc::clone(&storage.users),
        Arc::clone(&storage.stats),
        orchestrator,
        Arc::clone(&outbox),
        exporter.clone(),
        settings.clone(),
    ));

    let recipients = settings
        .operator
        .iter()
        .map(ChatTarget::from)
        .chain(config::admin::BACKUP_CHAT_ID.as_deref().map(ChatTarget::new))
        .collect::<Vec<_>>();
    let housekeeper = Arc::new(Housekeeper::new(
        HousekeeperSettings::from_config(),
        exporter,
        outbox,
        recipients,
    ));

    let cancel = CancellationToken::new();
    let housekeeping_task = tokio::spawn(Arc::clone(&housekeeper).run(cancel.clone()));

    log::info!("Bot is running, press Ctrl+C to stop");
    Dispatcher::builder(bot, schema(handler))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    log::info!("Dispatcher stopped, shutting down");
    cancel.cancel();
    if let Err(e) = housekeeping_task.await {
        log::error!("Housekeeping task ended abnormally: {}", e);
    }

    storage.flush()?;
    Ok(())
}
