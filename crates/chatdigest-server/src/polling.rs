//! Long polling through the teloxide dispatcher.

use std::sync::Arc;

use teloxide::dispatching::{Dispatcher, UpdateFilterExt};
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::types::Update;
use tracing::{debug, info, warn};

use crate::commands::{handle_callback_query, handle_message};
use crate::state::AppState;

async fn on_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    handle_message(&state, &msg).await;
    Ok(())
}

async fn on_callback(query: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    handle_callback_query(&state, &query).await;
    Ok(())
}

/// Poll for updates until the process is interrupted.
pub async fn run_polling(bot: Bot, state: Arc<AppState>) {
    if let Err(e) = bot.delete_webhook().await {
        warn!("Failed to delete webhook: {} (continuing anyway)", e);
    }

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback));

    info!("Long polling started");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|upd| async move {
            debug!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("Error in update handler"))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
    warn!("Dispatcher stopped");
}
