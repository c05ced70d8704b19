//! `ChatPlatform` over the Telegram Bot API.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    Chat, ChatMember, ChatMemberKind, InlineKeyboardMarkup, LinkPreviewOptions, MessageId,
    ParseMode, ReplyParameters,
};
use teloxide::RequestError;
use tracing::debug;

use crate::platform::{ChatPlatform, SendOptions};
use chatdigest_core::{Error, Result};

fn platform_err(method: &str, e: RequestError) -> Error {
    Error::Platform(format!("{}: {}", method, e))
}

fn preview_disabled() -> LinkPreviewOptions {
    LinkPreviewOptions {
        is_disabled: true,
        url: None,
        prefer_small_media: false,
        prefer_large_media: false,
        show_above_text: false,
    }
}

/// Owners and administrators may change bot settings.
pub fn administers(member: &ChatMember) -> bool {
    matches!(
        member.kind,
        ChatMemberKind::Owner(_) | ChatMemberKind::Administrator(_)
    )
}

pub struct TelegramPlatform {
    bot: Bot,
}

impl TelegramPlatform {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatPlatform for TelegramPlatform {
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        options: SendOptions,
    ) -> Result<MessageId> {
        debug!("sendMessage to {}", chat_id.0);
        let mut request = self.bot.send_message(chat_id, text).parse_mode(ParseMode::Html);
        if options.disable_preview {
            request = request.link_preview_options(preview_disabled());
        }
        if let Some(keyboard) = options.keyboard {
            request = request.reply_markup(keyboard);
        }
        if let Some(reply_to) = options.reply_to {
            request = request.reply_parameters(ReplyParameters::new(reply_to));
        }
        let sent = request.await.map_err(|e| platform_err("sendMessage", e))?;
        Ok(sent.id)
    }

    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        options: SendOptions,
    ) -> Result<()> {
        let mut request = self
            .bot
            .edit_message_text(chat_id, message_id, text)
            .parse_mode(ParseMode::Html);
        if options.disable_preview {
            request = request.link_preview_options(preview_disabled());
        }
        if let Some(keyboard) = options.keyboard {
            request = request.reply_markup(keyboard);
        }
        request
            .await
            .map_err(|e| platform_err("editMessageText", e))?;
        Ok(())
    }

    async fn edit_keyboard(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        keyboard: InlineKeyboardMarkup,
    ) -> Result<()> {
        self.bot
            .edit_message_reply_markup(chat_id, message_id)
            .reply_markup(keyboard)
            .await
            .map_err(|e| platform_err("editMessageReplyMarkup", e))?;
        Ok(())
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        alert: bool,
    ) -> Result<()> {
        let mut request = self.bot.answer_callback_query(callback_id).show_alert(alert);
        if let Some(text) = text {
            request = request.text(text);
        }
        request
            .await
            .map_err(|e| platform_err("answerCallbackQuery", e))?;
        Ok(())
    }

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<()> {
        self.bot
            .delete_message(chat_id, message_id)
            .await
            .map_err(|e| platform_err("deleteMessage", e))?;
        Ok(())
    }

    async fn is_admin(&self, chat: &Chat, user_id: UserId) -> Result<bool> {
        if chat.is_private() {
            return Ok(true);
        }
        let member = self
            .bot
            .get_chat_member(chat.id, user_id)
            .await
            .map_err(|e| platform_err("getChatMember", e))?;
        Ok(administers(&member))
    }
}
