//! chatdigest — group-chat fact collector and daily digest bot.

use std::path::PathBuf;
use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::AllowedUpdate;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod keyboards;
mod platform;
mod polling;
mod routes;
mod scheduler;
mod state;
mod telegram;
mod texts;

#[cfg(test)]
mod testing;

use state::AppState;
use telegram::TelegramPlatform;

fn resolve_data_dir() -> PathBuf {
    std::env::var("CHATDIGEST_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

fn print_help() {
    println!("chatdigest — collects tasks, links, files, mentions and hashtags from group chats");
    println!();
    println!("Usage: chatdigest [help]");
    println!();
    println!("Environment:");
    println!("  BOT_TOKEN                  Telegram bot token (required)");
    println!("  CHATDIGEST_DATA_DIR        Data directory (default: data)");
    println!("  PORT                       HTTP port for /health and the webhook (default: 3003)");
    println!("  WEBHOOK_URL                Public webhook URL; long polling when unset");
    println!("  WEBHOOK_SECRET             Secret token checked on webhook requests (required with WEBHOOK_URL)");
    println!("  DIGEST_WINDOW_HOURS        Digest window (default: 24)");
    println!("  MIN_TASK_LENGTH            Minimum task message length (default: 5)");
    println!("  CLASSIFIER_TIMEOUT_SECS    Classifier call timeout (default: 30)");
    println!("  SCHEDULER_POLL_SECS        Automatic digest poll interval (default: 60)");
    println!("  DIGEST_UTC_OFFSET_HOURS    Offset for digest times (default: 3)");
    println!("  OPENAI_API_KEY, ANTHROPIC_API_KEY, GROQ_API_KEY");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'chatdigest help' for usage.", arg);
                std::process::exit(1);
            }
        }
    }

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = chatdigest_core::BotConfig::from_env(&data_dir)?;
    let port = config.port;

    let store = chatdigest_store::SqliteStore::open(&config.data_paths.db)
        .map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))?;

    let classifier_config =
        chatdigest_classify::ClassifierConfig::load(&config.data_paths.classifier_config_file);
    let classifier = chatdigest_classify::create_classifier(&classifier_config);
    info!("Importance classifier: {}", classifier.name());

    let bot = Bot::new(&config.bot_token);
    let bot_username = match bot.get_me().await {
        Ok(me) => me.username.clone(),
        Err(e) => {
            warn!("getMe failed, /command@bot suffixes will be accepted for any bot: {}", e);
            None
        }
    };

    let webhook = config
        .webhook_url
        .clone()
        .zip(config.webhook_secret.clone());
    let state = Arc::new(AppState::new(
        config,
        Arc::new(store),
        classifier,
        Arc::new(TelegramPlatform::new(bot.clone())),
    ));
    state.set_bot_username(bot_username);

    scheduler::start_digest_scheduler(state.clone());

    let app = routes::build_router(state.clone());
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("chatdigest listening on {}", addr);

    match webhook {
        Some((url, secret)) => {
            let url = reqwest::Url::parse(&url)?;
            bot.set_webhook(url.clone())
                .secret_token(secret)
                .allowed_updates(vec![AllowedUpdate::Message, AllowedUpdate::CallbackQuery])
                .await?;
            info!("Webhook registered at {}", url);
            axum::serve(listener, app).await?;
        }
        None => {
            tokio::spawn(async move {
                if let Err(e) = axum::serve(listener, app).await {
                    warn!("HTTP server stopped: {}", e);
                }
            });
            polling::run_polling(bot, state).await;
        }
    }

    Ok(())
}
