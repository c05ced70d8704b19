//! Classifier request/response types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use chatdigest_store::{Category, Fact};

/// LLM provider identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LLMProvider {
    OpenAI,
    Anthropic,
    Groq,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::Groq => write!(f, "groq"),
        }
    }
}

/// Chat message sent to a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// One fact as submitted to the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierItem {
    pub id: i64,
    pub category: Category,
    pub text: String,
}

impl ClassifierItem {
    /// Build from a stored fact. The text combines payload and context
    /// when they differ.
    pub fn from_fact(fact: &Fact) -> Self {
        let payload = fact.payload.text();
        let text = if fact.context.is_empty() || fact.context == payload {
            payload.to_string()
        } else {
            format!("{}\n{}", payload, fact.context)
        };
        Self {
            id: fact.id,
            category: fact.category(),
            text,
        }
    }
}

/// An item the classifier judged important.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub id: i64,
    #[serde(default)]
    pub about: Option<String>,
}

/// Classifier failure. Any of these means "no answer"; nothing is persisted.
#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("classifier timed out")]
    Timeout,

    #[error("request failed: {0}")]
    Request(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<ClassifyError> for chatdigest_core::Error {
    fn from(e: ClassifyError) -> Self {
        chatdigest_core::Error::Classifier(e.to_string())
    }
}
