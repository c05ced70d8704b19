//! chatdigest store — SQLite fact tables and per-chat settings.

pub mod schema;
pub mod sqlite;
pub mod types;

pub use sqlite::SqliteStore;
pub use types::*;
