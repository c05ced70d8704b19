//! Update handling: commands, the settings menu and message collection.

use chrono::NaiveTime;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, error, info, warn};

use teloxide::types::{CallbackQuery, Message, Update, UpdateKind, UserId};

use crate::keyboards::{fields_menu, main_menu, mode_menu, SettingsAction};
use crate::platform::{replace_status, SendOptions};
use crate::state::AppState;
use crate::texts;
use chatdigest_core::Result;
use chatdigest_ingest::{is_command, message_text, Collector};
use chatdigest_store::{Category, DigestMode, SettingsField};

static TIME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-1]?[0-9]|2[0-3]):[0-5][0-9]$").unwrap());

/// A bot command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    On,
    Off,
    Settings,
    Summary,
    Listing(Category),
}

impl Command {
    fn requires_admin(&self) -> bool {
        matches!(self, Command::On | Command::Off | Command::Settings)
    }
}

/// Parse `/name` or `/name@bot` from the start of `text`. Commands addressed
/// to another bot and unknown commands yield `None`.
pub fn parse_command(text: &str, bot_username: Option<&str>) -> Option<Command> {
    let token = text.split_whitespace().next()?.strip_prefix('/')?;
    let (name, target) = match token.split_once('@') {
        Some((name, target)) => (name, Some(target)),
        None => (token, None),
    };

    if let (Some(target), Some(me)) = (target, bot_username) {
        if !target.eq_ignore_ascii_case(me) {
            return None;
        }
    }

    match name.to_ascii_lowercase().as_str() {
        "start" | "help" => Some(Command::Help),
        "on" => Some(Command::On),
        "off" => Some(Command::Off),
        "settings" => Some(Command::Settings),
        "summary" | "digest" => Some(Command::Summary),
        "tasks" => Some(Command::Listing(Category::Task)),
        "links" => Some(Command::Listing(Category::Link)),
        "docs" | "files" => Some(Command::Listing(Category::Document)),
        "mentions" | "tags" => Some(Command::Listing(Category::Mention)),
        "hashtags" => Some(Command::Listing(Category::Hashtag)),
        _ => None,
    }
}

/// Parse a digest time in `HH:MM` (hour may be one digit).
pub fn parse_digest_time(text: &str) -> Option<NaiveTime> {
    let text = text.trim();
    if !TIME_PATTERN.is_match(text) {
        return None;
    }
    NaiveTime::parse_from_str(text, "%H:%M").ok()
}

/// Handle one platform update. Never fails; errors are logged and reported
/// to the user where there is someone to report to.
pub async fn handle_update(state: &AppState, update: Update) {
    match update.kind {
        UpdateKind::Message(message) => handle_message(state, &message).await,
        UpdateKind::CallbackQuery(callback) => handle_callback_query(state, &callback).await,
        _ => debug!("Ignoring update {:?}", update.id),
    }
}

pub async fn handle_message(state: &AppState, message: &Message) {
    let chat_id = message.chat.id;

    if is_command(message) {
        let bot_username = state.bot_username.read().clone();
        let Some(command) = parse_command(message_text(message), bot_username.as_deref()) else {
            return;
        };
        if let Err(e) = run_command(state, message, command).await {
            error!("Command {:?} in chat {} failed: {}", command, chat_id.0, e);
            let _ = state
                .platform
                .send_message(chat_id, texts::GENERIC_ERROR, SendOptions::default())
                .await;
        }
        return;
    }

    let report = Collector::new(&state.store, state.config.min_task_length).collect(message);
    debug!("Message {} in chat {}: {:?}", message.id.0, chat_id.0, report);

    if let Some(user_id) = message.from.as_ref().map(|u| u.id) {
        if state.is_awaiting_time(chat_id, user_id) {
            if let Err(e) = handle_time_input(state, message, user_id).await {
                error!("Time input in chat {} failed: {}", chat_id.0, e);
                let _ = state
                    .platform
                    .send_message(chat_id, texts::GENERIC_ERROR, SendOptions::default())
                    .await;
            }
        }
    }
}

pub async fn handle_callback_query(state: &AppState, callback: &CallbackQuery) {
    if let Err(e) = handle_callback(state, callback).await {
        error!("Callback {:?} failed: {}", callback.data, e);
        let _ = state
            .platform
            .answer_callback(&callback.id, Some(texts::GENERIC_ERROR), true)
            .await;
    }
}

async fn run_command(state: &AppState, message: &Message, command: Command) -> Result<()> {
    let chat = &message.chat;
    let chat_id = chat.id;
    let platform = state.platform.as_ref();

    // Keeps message links right after a chat gains, changes or drops its
    // public username.
    state
        .store
        .update_chat_info(chat_id.0, chat.title(), chat.username())?;

    if command.requires_admin() {
        let is_admin = match &message.from {
            Some(user) => platform.is_admin(chat, user.id).await?,
            None => chat.is_private(),
        };
        if !is_admin {
            platform
                .send_message(chat_id, texts::ADMIN_ONLY, SendOptions::reply(message.id))
                .await?;
            return Ok(());
        }
    }

    match command {
        Command::Help => {
            platform
                .send_message(chat_id, texts::HELP, SendOptions::default())
                .await?;
        }
        Command::On => {
            state
                .store
                .get_or_default(chat_id.0, chat.title(), chat.username())?;
            state.store.set_active(chat_id.0, true)?;
            platform
                .send_message(chat_id, texts::ACTIVATED, SendOptions::default())
                .await?;
        }
        Command::Off => {
            state.store.set_active(chat_id.0, false)?;
            platform
                .send_message(chat_id, texts::DEACTIVATED, SendOptions::default())
                .await?;
        }
        Command::Settings => {
            if let Some(user) = &message.from {
                state.clear_time_input(chat_id, user.id);
            }
            let settings = state
                .store
                .get_or_default(chat_id.0, chat.title(), chat.username())?;
            let title = chat.title().unwrap_or("Чат");
            platform
                .send_message(
                    chat_id,
                    &texts::settings_status(title, &settings),
                    SendOptions::keyboard(main_menu()),
                )
                .await?;
        }
        Command::Summary => {
            let status_id = platform
                .send_message(chat_id, texts::DIGEST_PENDING, SendOptions::default())
                .await?;
            let reply = match state.assembler.build_digest(chat_id.0).await {
                Ok(outcome) => texts::digest_reply(outcome, state.assembler.window_hours()),
                Err(e) => {
                    error!("Digest for chat {} failed: {}", chat_id.0, e);
                    texts::GENERIC_ERROR.to_string()
                }
            };
            replace_status(platform, chat_id, status_id, &reply).await?;
        }
        Command::Listing(category) => {
            let status_id = platform
                .send_message(chat_id, &texts::listing_pending(category), SendOptions::default())
                .await?;
            let reply = match state
                .assembler
                .listing(chat_id.0, chat.username(), category)
                .await
            {
                Ok(outcome) => {
                    texts::listing_reply(outcome, category, state.assembler.window_hours())
                }
                Err(e) => {
                    error!("{} listing for chat {} failed: {}", category, chat_id.0, e);
                    texts::GENERIC_ERROR.to_string()
                }
            };
            replace_status(platform, chat_id, status_id, &reply).await?;
        }
    }
    Ok(())
}

async fn handle_time_input(state: &AppState, message: &Message, user_id: UserId) -> Result<()> {
    let chat = &message.chat;
    let chat_id = chat.id;

    let Some(time) = parse_digest_time(message_text(message)) else {
        state
            .platform
            .send_message(chat_id, texts::BAD_TIME, SendOptions::reply(message.id))
            .await?;
        return Ok(());
    };

    state.store.set_field(chat_id.0, SettingsField::Time(time))?;
    state
        .store
        .set_field(chat_id.0, SettingsField::Mode(DigestMode::Auto))?;
    state.clear_time_input(chat_id, user_id);
    info!("Chat {} switched to automatic digests at {}", chat_id.0, time);

    let settings = state
        .store
        .get_or_default(chat_id.0, chat.title(), chat.username())?;
    let title = chat.title().unwrap_or("Чат");
    let reply = format!(
        "{}\n\n{}",
        texts::time_set(&time.format("%H:%M").to_string()),
        texts::settings_status(title, &settings)
    );
    state
        .platform
        .send_message(chat_id, &reply, SendOptions::keyboard(main_menu()))
        .await?;
    Ok(())
}

async fn handle_callback(state: &AppState, callback: &CallbackQuery) -> Result<()> {
    let platform = state.platform.as_ref();
    let action = callback.data.as_deref().and_then(SettingsAction::parse);

    let (Some(action), Some(message)) = (action, &callback.message) else {
        platform.answer_callback(&callback.id, None, false).await?;
        return Ok(());
    };
    let chat = message.chat();
    let chat_id = chat.id;
    let message_id = message.id();
    let user_id = callback.from.id;

    if action == SettingsAction::Close {
        platform.delete_message(chat_id, message_id).await?;
        platform.answer_callback(&callback.id, None, false).await?;
        return Ok(());
    }

    if !platform.is_admin(chat, user_id).await? {
        platform
            .answer_callback(&callback.id, Some(texts::ADMIN_ONLY_SHORT), true)
            .await?;
        return Ok(());
    }

    let Some(settings) = state.store.get_settings(chat_id.0)? else {
        platform
            .answer_callback(&callback.id, Some(texts::CHAT_NOT_FOUND), true)
            .await?;
        return Ok(());
    };
    let title = chat
        .title()
        .or(settings.title.as_deref())
        .unwrap_or("Чат")
        .to_string();

    let mut notice: Option<&str> = None;
    match action {
        SettingsAction::Home => {
            state.clear_time_input(chat_id, user_id);
            platform
                .edit_message(
                    chat_id,
                    message_id,
                    &texts::settings_status(&title, &settings),
                    SendOptions::keyboard(main_menu()),
                )
                .await?;
        }
        SettingsAction::ModeMenu => {
            platform
                .edit_message(
                    chat_id,
                    message_id,
                    &texts::mode_title(&settings),
                    SendOptions::keyboard(mode_menu(&settings)),
                )
                .await?;
        }
        SettingsAction::SetManual => {
            state
                .store
                .set_field(chat_id.0, SettingsField::Mode(DigestMode::Manual))?;
            let settings = state.store.get_or_default(chat_id.0, None, None)?;
            platform
                .edit_message(
                    chat_id,
                    message_id,
                    &texts::settings_status(&title, &settings),
                    SendOptions::keyboard(main_menu()),
                )
                .await?;
            notice = Some(texts::MANUAL_MODE_ON);
        }
        SettingsAction::AskTime => {
            state.expect_time_input(chat_id, user_id);
            platform
                .edit_message(chat_id, message_id, texts::ASK_TIME, SendOptions::default())
                .await?;
        }
        SettingsAction::FieldsMenu => {
            platform
                .edit_message(
                    chat_id,
                    message_id,
                    texts::CHOOSE_FIELDS,
                    SendOptions::keyboard(fields_menu(&settings)),
                )
                .await?;
        }
        SettingsAction::Toggle(category) => {
            let value = !settings.includes(category);
            state
                .store
                .set_field(chat_id.0, SettingsField::Include(category, value))?;
            let settings = state.store.get_or_default(chat_id.0, None, None)?;
            platform
                .edit_keyboard(chat_id, message_id, fields_menu(&settings))
                .await?;
        }
        SettingsAction::Close => {}
    }

    if let Err(e) = platform.answer_callback(&callback.id, notice, false).await {
        warn!("answerCallbackQuery failed: {}", e);
    }
    Ok(())
}
