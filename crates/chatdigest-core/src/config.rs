//! Configuration and data directory management.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Paths to all chatdigest data files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// SQLite database directory (`data/db/`).
    pub db: PathBuf,
    /// Classifier provider configuration (`data/classifier-config.json`).
    pub classifier_config_file: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            db: root.join("db"),
            classifier_config_file: root.join("classifier-config.json"),
            root,
        };
        std::fs::create_dir_all(&paths.db)?;
        Ok(paths)
    }
}

/// Top-level bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Telegram Bot API token.
    pub bot_token: String,
    /// HTTP port for the webhook and health endpoints.
    pub port: u16,
    /// Public webhook URL. Long polling is used when absent.
    pub webhook_url: Option<String>,
    /// Value Telegram echoes in `X-Telegram-Bot-Api-Secret-Token`.
    /// Required together with `webhook_url`.
    pub webhook_secret: Option<String>,
    /// Data directory paths.
    pub data_paths: DataPaths,
    /// Length of the digest window.
    pub window_hours: i64,
    /// Minimum message length (in characters) for task detection.
    pub min_task_length: usize,
    /// Upper bound for a single classifier call.
    pub classifier_timeout: Duration,
    /// How often the automatic digest scheduler wakes up.
    pub scheduler_poll: Duration,
    /// Offset used to interpret `HH:MM` digest times.
    pub digest_utc_offset: FixedOffset,
}

impl BotConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> Result<Self> {
        Self::from_lookup(data_dir, |key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(data_dir: impl AsRef<Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bot_token = lookup("BOT_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| Error::Config("BOT_TOKEN is not set".into()))?;

        let port = lookup("PORT").and_then(|p| p.parse().ok()).unwrap_or(3003);
        let webhook_url = lookup("WEBHOOK_URL").filter(|u| !u.trim().is_empty());
        let webhook_secret = lookup("WEBHOOK_SECRET").filter(|s| !s.is_empty());
        if let Some(secret) = &webhook_secret {
            if !is_valid_secret(secret) {
                return Err(Error::Config(
                    "WEBHOOK_SECRET must be 1-256 characters of A-Z, a-z, 0-9, _ and -".into(),
                ));
            }
        }
        if webhook_url.is_some() && webhook_secret.is_none() {
            return Err(Error::Config("WEBHOOK_URL requires WEBHOOK_SECRET".into()));
        }
        let window_hours = lookup("DIGEST_WINDOW_HOURS")
            .and_then(|v| v.parse().ok())
            .filter(|h: &i64| *h > 0)
            .unwrap_or(24);
        let min_task_length = lookup("MIN_TASK_LENGTH")
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);
        let classifier_timeout = lookup("CLASSIFIER_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));
        let scheduler_poll = lookup("SCHEDULER_POLL_SECS")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(60));

        let offset_hours: i32 = lookup("DIGEST_UTC_OFFSET_HOURS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(3);
        let digest_utc_offset = FixedOffset::east_opt(offset_hours * 3600).ok_or_else(|| {
            Error::Config(format!("DIGEST_UTC_OFFSET_HOURS out of range: {}", offset_hours))
        })?;

        let data_paths = DataPaths::new(data_dir)?;

        Ok(Self {
            bot_token,
            port,
            webhook_url,
            webhook_secret,
            data_paths,
            window_hours,
            min_task_length,
            classifier_timeout,
            scheduler_poll,
            digest_utc_offset,
        })
    }
}

/// Telegram accepts secret tokens of 1-256 characters from `[A-Za-z0-9_-]`.
fn is_valid_secret(secret: &str) -> bool {
    (1..=256).contains(&secret.len())
        && secret
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = BotConfig::from_lookup(dir.path(), lookup_from(&[("BOT_TOKEN", "123:abc")]))
            .unwrap();
        assert_eq!(config.port, 3003);
        assert_eq!(config.window_hours, 24);
        assert_eq!(config.min_task_length, 5);
        assert_eq!(config.classifier_timeout, Duration::from_secs(30));
        assert_eq!(config.digest_utc_offset.local_minus_utc(), 3 * 3600);
        assert!(config.webhook_url.is_none());
        assert!(config.data_paths.db.exists());
    }

    #[test]
    fn test_missing_token() {
        let dir = tempfile::tempdir().unwrap();
        let result = BotConfig::from_lookup(dir.path(), lookup_from(&[]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let config = BotConfig::from_lookup(
            dir.path(),
            lookup_from(&[
                ("BOT_TOKEN", "t"),
                ("PORT", "8080"),
                ("WEBHOOK_URL", "https://bot.example.com/telegram/webhook"),
                ("WEBHOOK_SECRET", "s3cret_token-1"),
                ("CLASSIFIER_TIMEOUT_SECS", "5"),
                ("DIGEST_UTC_OFFSET_HOURS", "0"),
                ("DIGEST_WINDOW_HOURS", "-4"),
            ]),
        )
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.classifier_timeout, Duration::from_secs(5));
        assert_eq!(config.digest_utc_offset.local_minus_utc(), 0);
        assert_eq!(config.window_hours, 24);
        assert!(config.webhook_url.is_some());
        assert_eq!(config.webhook_secret.as_deref(), Some("s3cret_token-1"));
    }

    #[test]
    fn test_webhook_needs_valid_secret() {
        let dir = tempfile::tempdir().unwrap();
        let url = ("WEBHOOK_URL", "https://bot.example.com/telegram/webhook");

        let missing = BotConfig::from_lookup(dir.path(), lookup_from(&[("BOT_TOKEN", "t"), url]));
        assert!(matches!(missing, Err(Error::Config(_))));

        let bad = BotConfig::from_lookup(
            dir.path(),
            lookup_from(&[("BOT_TOKEN", "t"), url, ("WEBHOOK_SECRET", "has space")]),
        );
        assert!(matches!(bad, Err(Error::Config(_))));

        let too_long = "a".repeat(257);
        let long = BotConfig::from_lookup(
            dir.path(),
            lookup_from(&[("BOT_TOKEN", "t"), url, ("WEBHOOK_SECRET", too_long.as_str())]),
        );
        assert!(matches!(long, Err(Error::Config(_))));
    }
}
