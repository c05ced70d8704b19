//! Message collection: extract facts and persist them for active chats.

use tracing::{debug, warn};

use teloxide::types::Message;

use crate::extract::{extract_facts, is_command};
use chatdigest_store::SqliteStore;

/// What happened to one incoming message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectReport {
    /// Command message; not inspected.
    Command,
    /// Chat has no record or collection is off.
    Inactive,
    /// Facts written to the store.
    Stored(usize),
    /// Persistence failed; nothing from this message was stored.
    Failed,
}

/// Writes extracted facts for chats with collection enabled.
pub struct Collector<'a> {
    store: &'a SqliteStore,
    min_task_length: usize,
}

impl<'a> Collector<'a> {
    pub fn new(store: &'a SqliteStore, min_task_length: usize) -> Self {
        Self {
            store,
            min_task_length,
        }
    }

    /// Collect facts from one message. Failures are logged, never returned.
    pub fn collect(&self, message: &Message) -> CollectReport {
        if is_command(message) {
            return CollectReport::Command;
        }

        let chat_id = message.chat.id.0;
        match self.store.get_settings(chat_id) {
            Ok(Some(settings)) if settings.is_active => {}
            Ok(_) => return CollectReport::Inactive,
            Err(e) => {
                warn!("Failed to load settings for chat {}: {}", chat_id, e);
                return CollectReport::Failed;
            }
        }

        let facts = extract_facts(message, self.min_task_length);
        if facts.is_empty() {
            return CollectReport::Stored(0);
        }

        match self.store.append_batch(&facts) {
            Ok(ids) => {
                debug!(
                    "Stored {} facts from message {} in chat {}",
                    ids.len(),
                    message.id.0,
                    chat_id
                );
                CollectReport::Stored(ids.len())
            }
            Err(e) => {
                warn!(
                    "Failed to store facts from message {} in chat {}: {}",
                    message.id.0, chat_id, e
                );
                CollectReport::Failed
            }
        }
    }
}
