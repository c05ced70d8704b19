//! Importance classification of collected facts via external LLMs
//! (OpenAI/Anthropic/Groq), with a keyword fallback.

pub mod classifier;
pub mod config;
pub mod providers;
pub mod types;

pub use classifier::{create_classifier, ImportanceClassifier, KeywordClassifier, LlmClassifier};
pub use config::{ClassifierConfig, ProviderChoice, ResolvedProvider};
pub use types::*;
