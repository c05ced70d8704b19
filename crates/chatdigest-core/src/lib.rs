//! chatdigest core — shared error type and configuration.

pub mod config;
pub mod error;

pub use config::{BotConfig, DataPaths};
pub use error::{Error, Result};
