//! Entity extraction: one incoming chat message → candidate facts.
//!
//! Pure and side-effect free. Entity offsets are counted in UTF-16 code
//! units, the way the chat platform reports them; an entity whose range
//! does not resolve to a valid slice is skipped without affecting the
//! rest of the message.

use once_cell::sync::Lazy;
use regex::Regex;
use teloxide::types::{Message, MessageEntity, MessageEntityKind};
use tracing::debug;

use chatdigest_store::{FactPayload, NewFact};

/// Default minimum message length (in characters) for task detection.
pub const DEFAULT_MIN_TASK_LENGTH: usize = 5;

/// File name stored for documents sent without one.
pub const UNTITLED_DOCUMENT: &str = "untitled";

/// Keywords that mark a message as a task. Matched case-insensitively as substrings.
pub const TASK_KEYWORDS: &[&str] = &[
    "нужно",
    "надо",
    "сделать",
    "дедлайн",
    "deadline",
    "task",
    "задание",
];

static TASK_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let alternation = TASK_KEYWORDS
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("(?i){}", alternation)).unwrap()
});

/// Message text, falling back to the caption.
pub fn message_text(message: &Message) -> &str {
    message.text().or_else(|| message.caption()).unwrap_or("")
}

/// Entities that annotate [`message_text`].
pub fn message_entities(message: &Message) -> &[MessageEntity] {
    if message.text().is_some() {
        message.entities().unwrap_or(&[])
    } else {
        message.caption_entities().unwrap_or(&[])
    }
}

pub fn is_command(message: &Message) -> bool {
    message_text(message).starts_with('/')
}

/// Slice `text` by a UTF-16 range. `None` when the range is out of bounds
/// or splits a surrogate pair.
pub fn utf16_slice(text: &str, offset: usize, length: usize) -> Option<String> {
    let units: Vec<u16> = text.encode_utf16().collect();
    let end = offset.checked_add(length)?;
    if length == 0 || end > units.len() {
        return None;
    }
    String::from_utf16(&units[offset..end]).ok()
}

/// Whether `text` qualifies as a task.
pub fn is_task(text: &str, min_length: usize) -> bool {
    text.chars().count() >= min_length && TASK_PATTERN.is_match(text)
}

fn entity_payload(text: &str, entity: &MessageEntity) -> Option<FactPayload> {
    match &entity.kind {
        MessageEntityKind::Hashtag => utf16_slice(text, entity.offset, entity.length)
            .map(|tag| FactPayload::Hashtag { tag }),
        MessageEntityKind::Url => {
            utf16_slice(text, entity.offset, entity.length).map(|url| FactPayload::Link { url })
        }
        MessageEntityKind::TextLink { url } => Some(FactPayload::Link {
            url: url.as_str().to_string(),
        }),
        MessageEntityKind::Mention => utf16_slice(text, entity.offset, entity.length)
            .map(|handle| FactPayload::Mention { handle }),
        MessageEntityKind::TextMention { user } => {
            let handle = match &user.username {
                Some(username) if !username.is_empty() => format!("@{}", username),
                _ => user.full_name(),
            };
            Some(FactPayload::Mention { handle })
        }
        _ => None,
    }
}

fn produces_fact(kind: &MessageEntityKind) -> bool {
    matches!(
        kind,
        MessageEntityKind::Hashtag
            | MessageEntityKind::Url
            | MessageEntityKind::Mention
            | MessageEntityKind::TextLink { .. }
            | MessageEntityKind::TextMention { .. }
    )
}

/// Extract candidate facts from a message.
///
/// Order: attached document, then entities in message order, then the task.
/// Commands yield nothing.
pub fn extract_facts(message: &Message, min_task_length: usize) -> Vec<NewFact> {
    let text = message_text(message);
    if text.starts_with('/') {
        return Vec::new();
    }

    let mut payloads = Vec::new();

    if let Some(document) = message.document() {
        let file_name = document
            .file_name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| UNTITLED_DOCUMENT.to_string());
        payloads.push(FactPayload::Document {
            file_name,
            file_id: document.file.id.to_string(),
        });
    }

    for entity in message_entities(message) {
        match entity_payload(text, entity) {
            Some(payload) => payloads.push(payload),
            None if produces_fact(&entity.kind) => {
                debug!(
                    "Skipping unresolvable {:?} entity at {}+{} in message {}",
                    entity.kind, entity.offset, entity.length, message.id.0
                );
            }
            None => {}
        }
    }

    if is_task(text, min_task_length) {
        payloads.push(FactPayload::Task {
            description: text.to_string(),
        });
    }

    payloads
        .into_iter()
        .map(|payload| NewFact {
            chat_id: message.chat.id.0,
            message_id: i64::from(message.id.0),
            payload,
            context: text.to_string(),
        })
        .collect()
}
