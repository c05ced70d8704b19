//! chatdigest ingest: entity extraction from chat messages and fact collection.

pub mod collect;
pub mod extract;

pub use collect::{CollectReport, Collector};
pub use extract::{extract_facts, is_command, message_entities, message_text};
