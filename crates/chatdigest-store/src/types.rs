//! Data types for facts and chat settings.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Fact category. Each category lives in its own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Task,
    Link,
    Document,
    Mention,
    Hashtag,
}

impl Category {
    /// All categories in digest rendering order.
    pub fn all() -> &'static [Category] {
        &[
            Self::Task,
            Self::Link,
            Self::Document,
            Self::Mention,
            Self::Hashtag,
        ]
    }

    /// Backing table name.
    pub fn table(&self) -> &'static str {
        match self {
            Self::Task => "tasks",
            Self::Link => "links",
            Self::Document => "documents",
            Self::Mention => "mentions",
            Self::Hashtag => "hashtags",
        }
    }

    /// Settings column holding the inclusion toggle for this category.
    pub fn include_column(&self) -> &'static str {
        match self {
            Self::Task => "include_tasks",
            Self::Link => "include_links",
            Self::Document => "include_documents",
            Self::Mention => "include_mentions",
            Self::Hashtag => "include_hashtags",
        }
    }

    /// Code used in settings-menu callback data (`toggle_field_<code>`).
    pub fn toggle_code(&self) -> &'static str {
        match self {
            Self::Task => "tasks",
            Self::Link => "links",
            Self::Document => "files",
            Self::Mention => "mentions",
            Self::Hashtag => "hashtags",
        }
    }

    /// Inverse of [`Category::toggle_code`].
    pub fn from_toggle_code(code: &str) -> Option<Category> {
        Self::all().iter().copied().find(|c| c.toggle_code() == code)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Task => write!(f, "task"),
            Self::Link => write!(f, "link"),
            Self::Document => write!(f, "document"),
            Self::Mention => write!(f, "mention"),
            Self::Hashtag => write!(f, "hashtag"),
        }
    }
}

/// Category-specific fact content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FactPayload {
    Task { description: String },
    Link { url: String },
    Document { file_name: String, file_id: String },
    Mention { handle: String },
    Hashtag { tag: String },
}

impl FactPayload {
    pub fn category(&self) -> Category {
        match self {
            Self::Task { .. } => Category::Task,
            Self::Link { .. } => Category::Link,
            Self::Document { .. } => Category::Document,
            Self::Mention { .. } => Category::Mention,
            Self::Hashtag { .. } => Category::Hashtag,
        }
    }

    /// The primary payload string (description, URL, file name, handle or tag).
    pub fn text(&self) -> &str {
        match self {
            Self::Task { description } => description,
            Self::Link { url } => url,
            Self::Document { file_name, .. } => file_name,
            Self::Mention { handle } => handle,
            Self::Hashtag { tag } => tag,
        }
    }
}

/// Classifier state of a fact.
///
/// `important` and `about` only exist once the classifier has seen the fact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum Classification {
    #[default]
    Unchecked,
    Checked {
        important: bool,
        about: Option<String>,
    },
}

impl Classification {
    pub fn is_checked(&self) -> bool {
        matches!(self, Self::Checked { .. })
    }

    /// Classifier verdict; `false` while unchecked.
    pub fn is_important(&self) -> bool {
        matches!(self, Self::Checked { important: true, .. })
    }

    /// Classifier description; `None` while unchecked.
    pub fn about(&self) -> Option<&str> {
        match self {
            Self::Checked { about, .. } => about.as_deref(),
            Self::Unchecked => None,
        }
    }
}

/// A candidate fact ready to be appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFact {
    pub chat_id: i64,
    pub message_id: i64,
    pub payload: FactPayload,
    /// Full text of the originating message.
    pub context: String,
}

/// A fact row from the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    pub id: i64,
    pub chat_id: i64,
    pub message_id: i64,
    pub payload: FactPayload,
    pub context: String,
    pub classification: Classification,
    /// Unix millis.
    pub created_at: i64,
}

impl Fact {
    pub fn category(&self) -> Category {
        self.payload.category()
    }

    pub fn is_checked(&self) -> bool {
        self.classification.is_checked()
    }

    pub fn is_important(&self) -> bool {
        self.classification.is_important()
    }
}

/// One row of a `mark_classified` batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationUpdate {
    pub id: i64,
    pub important: bool,
    pub about: Option<String>,
}

/// How digests are triggered for a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestMode {
    Manual,
    Auto,
}

impl DigestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Auto => "auto",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(Self::Manual),
            "auto" => Some(Self::Auto),
            _ => None,
        }
    }
}

/// A chat settings row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSettings {
    pub chat_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub is_active: bool,
    pub digest_mode: DigestMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest_time: Option<NaiveTime>,
    pub include_tasks: bool,
    pub include_links: bool,
    pub include_documents: bool,
    pub include_mentions: bool,
    pub include_hashtags: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_auto_digest_on: Option<NaiveDate>,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl ChatSettings {
    /// Whether the given category is included in digests.
    pub fn includes(&self, category: Category) -> bool {
        match category {
            Category::Task => self.include_tasks,
            Category::Link => self.include_links,
            Category::Document => self.include_documents,
            Category::Mention => self.include_mentions,
            Category::Hashtag => self.include_hashtags,
        }
    }

    /// Enabled categories in rendering order.
    pub fn enabled_categories(&self) -> Vec<Category> {
        Category::all()
            .iter()
            .copied()
            .filter(|c| self.includes(*c))
            .collect()
    }
}

/// A single settings field write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    Mode(DigestMode),
    Time(NaiveTime),
    Include(Category, bool),
}
