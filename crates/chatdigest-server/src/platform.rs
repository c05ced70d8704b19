//! Outbound chat platform operations.

use async_trait::async_trait;
use teloxide::types::{Chat, ChatId, InlineKeyboardMarkup, MessageId, UserId};
use tracing::warn;

use crate::texts;
use chatdigest_core::Result;
use chatdigest_runtime::render::{split_message, MAX_MESSAGE_CHARS};

/// Options for an outgoing message.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub keyboard: Option<InlineKeyboardMarkup>,
    pub disable_preview: bool,
    /// Message to reply to.
    pub reply_to: Option<MessageId>,
}

impl SendOptions {
    pub fn keyboard(keyboard: InlineKeyboardMarkup) -> Self {
        Self {
            keyboard: Some(keyboard),
            ..Default::default()
        }
    }

    pub fn no_preview() -> Self {
        Self {
            disable_preview: true,
            ..Default::default()
        }
    }

    pub fn reply(message_id: MessageId) -> Self {
        Self {
            reply_to: Some(message_id),
            ..Default::default()
        }
    }
}

/// Everything the bot does to a chat, so handlers can run against a
/// recording double in tests.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Send an HTML message. Returns the new message id.
    async fn send_message(&self, chat_id: ChatId, text: &str, options: SendOptions)
        -> Result<MessageId>;

    /// Replace the text (and keyboard) of a message.
    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        options: SendOptions,
    ) -> Result<()>;

    /// Replace only the keyboard of a message.
    async fn edit_keyboard(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        keyboard: InlineKeyboardMarkup,
    ) -> Result<()>;

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>, alert: bool)
        -> Result<()>;

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<()>;

    /// Whether `user_id` administers `chat`. Private chats always pass.
    async fn is_admin(&self, chat: &Chat, user_id: UserId) -> Result<bool>;
}

/// Send a report as one or more messages, each within Telegram's length
/// limit.
pub async fn send_report(platform: &dyn ChatPlatform, chat_id: ChatId, text: &str) -> Result<()> {
    for chunk in split_message(text, MAX_MESSAGE_CHARS) {
        platform
            .send_message(chat_id, &chunk, SendOptions::no_preview())
            .await?;
    }
    Ok(())
}

/// Replace a status message with a report. The first part goes into the
/// status message and the rest follows as new messages. When the edit is
/// refused the status message is turned into an error notice instead.
pub async fn replace_status(
    platform: &dyn ChatPlatform,
    chat_id: ChatId,
    status_id: MessageId,
    text: &str,
) -> Result<()> {
    let mut chunks = split_message(text, MAX_MESSAGE_CHARS).into_iter();
    let first = chunks.next().unwrap_or_default();

    if let Err(e) = platform
        .edit_message(chat_id, status_id, &first, SendOptions::no_preview())
        .await
    {
        warn!("Could not put the reply into message {} in chat {}: {}", status_id.0, chat_id.0, e);
        platform
            .edit_message(chat_id, status_id, texts::GENERIC_ERROR, SendOptions::default())
            .await?;
        return Ok(());
    }

    for chunk in chunks {
        platform
            .send_message(chat_id, &chunk, SendOptions::no_preview())
            .await?;
    }
    Ok(())
}
