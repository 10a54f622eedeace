use std::sync::Arc;

use teloxide::prelude::*;
use tracing::{debug, error, info, warn};
use tracing_subscriber::prelude::*;

use murojaat_bot::config::{Config, StorageKind};
use murojaat_bot::desk::telegram::to_inbound;
use murojaat_bot::desk::{Desk, MemoryStore, Messenger, SqliteStore, TelegramClient, UserStore};
use murojaat_bot::health;
use murojaat_bot::telegram_log::TelegramLogLayer;

/// Bot username, needed to parse `/start@username`.
#[derive(Clone)]
struct BotUsername(String);

#[tokio::main]
async fn main() {
    // An explicitly named config file must exist; the default one may not.
    let (config_path, required) = match std::env::args().nth(1) {
        Some(path) => (path, true),
        None => ("murojaat.json".to_string(), false),
    };
    let config = match Config::load(&config_path, required) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Fatal: {e}");
            std::process::exit(1);
        }
    };

    let bot = Bot::new(&config.bot_token);
    let telegram = Arc::new(TelegramClient::new(bot.clone()));

    // Setup logging
    let log_dir = config.log_dir();
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("murojaat-bot.log"))
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Fatal: failed to open log file in {}: {e}", log_dir.display());
            std::process::exit(1);
        }
    };
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    let operator_layer = config.log_chat_id.map(|chat_id| {
        let messenger: Arc<dyn Messenger> = telegram.clone();
        TelegramLogLayer::new(messenger, chat_id)
    });

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(operator_layer)
        .init();

    info!("🚀 Starting murojaat-bot...");
    info!("Config: {config_path} (storage: {:?}, data dir: {})", config.storage, config.data_dir.display());
    if config.admin_ids.is_empty() {
        warn!("No admin_ids configured; requests will not be forwarded anywhere");
    } else {
        info!("Admin IDs: {:?}", config.admin_ids);
    }

    let store: Arc<dyn UserStore> = match config.storage {
        StorageKind::Sqlite => match SqliteStore::open(&config.database_path()) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                error!("Failed to open user store: {e}");
                return;
            }
        },
        StorageKind::Memory => {
            warn!("Using in-memory storage; registrations are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    if config.health_port != 0
        && let Err(e) = health::spawn(config.health_port).await
    {
        warn!("Failed to start health endpoint on port {}: {e}", config.health_port);
    }

    let username = match bot.get_me().await {
        Ok(me) => {
            info!("Bot user ID: {}, username: @{}", me.id, me.username());
            me.username().to_string()
        }
        Err(e) => {
            warn!("Failed to get bot info: {e}");
            String::new()
        }
    };

    if let Err(e) = bot.delete_webhook().drop_pending_updates(true).await {
        warn!("Failed to delete webhook: {e}");
    }

    let desk = Arc::new(Desk::new(store, telegram, config.admin_ids.clone()));

    let handler = Update::filter_message().endpoint(handle_message);

    info!("Bot ishga tushdi");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![desk, BotUsername(username)])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn handle_message(msg: Message, desk: Arc<Desk>, username: BotUsername) -> ResponseResult<()> {
    if !msg.chat.is_private() {
        debug!("Ignoring message from non-private chat {}", msg.chat.id);
        return Ok(());
    }

    if let Some(event) = to_inbound(&msg, &username.0) {
        desk.handle(event).await;
    }
    Ok(())
}
