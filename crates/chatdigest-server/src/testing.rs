//! Test doubles for the server.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use teloxide::types::{Chat, ChatId, InlineKeyboardMarkup, MessageId, Update, UserId};
use tempfile::TempDir;

use crate::platform::{ChatPlatform, SendOptions};
use crate::state::AppState;
use chatdigest_classify::{
    ClassifierItem, ClassifyError, ImportanceClassifier, KeywordClassifier, Verdict,
};
use chatdigest_core::{BotConfig, Error, Result};
use chatdigest_runtime::render::MAX_MESSAGE_CHARS;
use chatdigest_store::{Category, SqliteStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Message {
        chat_id: ChatId,
        message_id: MessageId,
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    },
    Edit {
        chat_id: ChatId,
        message_id: MessageId,
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    },
    Keyboard {
        chat_id: ChatId,
        message_id: MessageId,
        keyboard: InlineKeyboardMarkup,
    },
    Answer {
        text: Option<String>,
        alert: bool,
    },
    Delete {
        chat_id: ChatId,
        message_id: MessageId,
    },
}

impl Sent {
    pub fn text(&self) -> Option<&str> {
        match self {
            Sent::Message { text, .. } | Sent::Edit { text, .. } => Some(text),
            Sent::Answer { text, .. } => text.as_deref(),
            _ => None,
        }
    }
}

/// Platform that records every outbound call. Texts over Telegram's limit
/// are refused the way the Bot API refuses them.
#[derive(Default)]
pub struct MockPlatform {
    admins: HashSet<UserId>,
    sent: Mutex<Vec<Sent>>,
    next_id: Mutex<i32>,
    failing_edits: Mutex<usize>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_admin(mut self, user_id: UserId) -> Self {
        self.admins.insert(user_id);
        self
    }

    /// Refuse the next `count` text edits.
    pub fn fail_next_edits(&self, count: usize) {
        *self.failing_edits.lock() = count;
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }

    /// Text of the last visible message or edit.
    pub fn last_text(&self) -> Option<String> {
        self.sent
            .lock()
            .iter()
            .rev()
            .find_map(|s| match s {
                Sent::Message { text, .. } | Sent::Edit { text, .. } => Some(text.clone()),
                _ => None,
            })
    }
}

fn check_length(text: &str) -> Result<()> {
    if text.chars().count() > MAX_MESSAGE_CHARS {
        return Err(Error::Platform("Bad Request: message is too long".into()));
    }
    Ok(())
}

#[async_trait]
impl ChatPlatform for MockPlatform {
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        options: SendOptions,
    ) -> Result<MessageId> {
        check_length(text)?;
        let message_id = {
            let mut next = self.next_id.lock();
            *next += 1;
            MessageId(1000 + *next)
        };
        self.sent.lock().push(Sent::Message {
            chat_id,
            message_id,
            text: text.to_string(),
            keyboard: options.keyboard,
        });
        Ok(message_id)
    }

    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        options: SendOptions,
    ) -> Result<()> {
        {
            let mut failing = self.failing_edits.lock();
            if *failing > 0 {
                *failing -= 1;
                return Err(Error::Platform("Bad Request: message can't be edited".into()));
            }
        }
        check_length(text)?;
        self.sent.lock().push(Sent::Edit {
            chat_id,
            message_id,
            text: text.to_string(),
            keyboard: options.keyboard,
        });
        Ok(())
    }

    async fn edit_keyboard(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        keyboard: InlineKeyboardMarkup,
    ) -> Result<()> {
        self.sent.lock().push(Sent::Keyboard {
            chat_id,
            message_id,
            keyboard,
        });
        Ok(())
    }

    async fn answer_callback(&self, _callback_id: &str, text: Option<&str>, alert: bool) -> Result<()> {
        self.sent.lock().push(Sent::Answer {
            text: text.map(str::to_string),
            alert,
        });
        Ok(())
    }

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<()> {
        self.sent.lock().push(Sent::Delete { chat_id, message_id });
        Ok(())
    }

    async fn is_admin(&self, chat: &Chat, user_id: UserId) -> Result<bool> {
        Ok(chat.is_private() || self.admins.contains(&user_id))
    }
}

/// Classifier whose provider is always down.
pub struct DownClassifier;

#[async_trait]
impl ImportanceClassifier for DownClassifier {
    async fn classify(
        &self,
        _category: Category,
        _items: &[ClassifierItem],
    ) -> std::result::Result<Vec<Verdict>, ClassifyError> {
        Err(ClassifyError::Api {
            status: 503,
            body: "overloaded".into(),
        })
    }

    fn name(&self) -> String {
        "down".into()
    }
}

pub const ADMIN: u64 = 1;
pub const MEMBER: u64 = 2;
pub const GROUP: i64 = -1001234567;
pub const WEBHOOK_SECRET: &str = "test-secret";

pub fn test_state() -> (Arc<AppState>, Arc<MockPlatform>, TempDir) {
    test_state_with(Arc::new(KeywordClassifier))
}

pub fn test_state_with(
    classifier: Arc<dyn ImportanceClassifier>,
) -> (Arc<AppState>, Arc<MockPlatform>, TempDir) {
    let dir = TempDir::new().unwrap();
    let config = BotConfig::from_lookup(dir.path(), |key| match key {
        "BOT_TOKEN" => Some("123:test".into()),
        "WEBHOOK_SECRET" => Some(WEBHOOK_SECRET.into()),
        _ => None,
    })
    .unwrap();
    let store = Arc::new(SqliteStore::open(&config.data_paths.db).unwrap());
    let platform = Arc::new(MockPlatform::new().with_admin(UserId(ADMIN)));
    let state = AppState::new(config, store, classifier, platform.clone());
    state.set_bot_username(Some("digest_bot".into()));
    (Arc::new(state), platform, dir)
}

/// The test supergroup, optionally with a public username.
pub fn group_chat(username: Option<&str>) -> Value {
    let mut chat = json!({"id": GROUP, "type": "supergroup", "title": "Study group"});
    if let Some(username) = username {
        chat["username"] = json!(username);
    }
    chat
}

pub fn message_json(chat: Value, message_id: i32, from: u64, text: &str) -> Value {
    json!({
        "message_id": message_id,
        "date": 1700000000,
        "chat": chat,
        "from": {"id": from, "is_bot": false, "first_name": "User"},
        "text": text,
    })
}

pub fn message_update(message_id: i32, from: u64, text: &str) -> Update {
    chat_message_update(group_chat(None), message_id, from, text)
}

pub fn chat_message_update(chat: Value, message_id: i32, from: u64, text: &str) -> Update {
    serde_json::from_str(
        &json!({
            "update_id": message_id,
            "message": message_json(chat, message_id, from, text),
        })
        .to_string(),
    )
    .unwrap()
}

/// A settings-menu press on message 500 of the test group.
pub fn callback_update(from: u64, data: &str) -> Update {
    serde_json::from_str(
        &json!({
            "update_id": 9000,
            "callback_query": {
                "id": "cb",
                "from": {"id": from, "is_bot": false, "first_name": "User"},
                "message": message_json(group_chat(None), 500, 0, "menu"),
                "chat_instance": "ci",
                "data": data,
            }
        })
        .to_string(),
    )
    .unwrap()
}
