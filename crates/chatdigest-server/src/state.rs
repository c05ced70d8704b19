//! Shared application state.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use teloxide::types::{ChatId, UserId};

use crate::platform::ChatPlatform;
use chatdigest_classify::ImportanceClassifier;
use chatdigest_core::BotConfig;
use chatdigest_runtime::DigestAssembler;
use chatdigest_store::SqliteStore;

/// Shared application state accessible from update handlers, routes and
/// background workers.
pub struct AppState {
    pub config: BotConfig,
    pub store: Arc<SqliteStore>,
    pub assembler: DigestAssembler,
    pub platform: Arc<dyn ChatPlatform>,
    /// Bot username, used to accept `/command@username`.
    pub bot_username: RwLock<Option<String>>,
    /// (chat, user) pairs expected to send a digest time next.
    pending_time_input: Mutex<HashSet<(ChatId, UserId)>>,
}

impl AppState {
    pub fn new(
        config: BotConfig,
        store: Arc<SqliteStore>,
        classifier: Arc<dyn ImportanceClassifier>,
        platform: Arc<dyn ChatPlatform>,
    ) -> Self {
        let assembler = DigestAssembler::from_config(store.clone(), classifier, &config);
        Self {
            config,
            store,
            assembler,
            platform,
            bot_username: RwLock::new(None),
            pending_time_input: Mutex::new(HashSet::new()),
        }
    }

    pub fn set_bot_username(&self, username: Option<String>) {
        *self.bot_username.write() = username;
    }

    pub fn expect_time_input(&self, chat_id: ChatId, user_id: UserId) {
        self.pending_time_input.lock().insert((chat_id, user_id));
    }

    pub fn is_awaiting_time(&self, chat_id: ChatId, user_id: UserId) -> bool {
        self.pending_time_input.lock().contains(&(chat_id, user_id))
    }

    pub fn clear_time_input(&self, chat_id: ChatId, user_id: UserId) {
        self.pending_time_input.lock().remove(&(chat_id, user_id));
    }
}
