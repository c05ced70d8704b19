//! Classifier provider selection, read from `classifier-config.json`.
//!
//! ```json
//! { "provider": "auto", "anthropic": { "api_key": "sk-ant-...", "model": "..." } }
//! ```
//!
//! Keys missing from the file are taken from `OPENAI_API_KEY`,
//! `ANTHROPIC_API_KEY` and `GROQ_API_KEY`.

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::types::LLMProvider;

/// Provider order tried in `auto` mode.
const AUTO_ORDER: [LLMProvider; 3] = [LLMProvider::OpenAI, LLMProvider::Anthropic, LLMProvider::Groq];

/// Which classifier backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderChoice {
    /// First provider with a key, in `AUTO_ORDER`.
    #[default]
    Auto,
    OpenAI,
    Anthropic,
    Groq,
    /// Never call an LLM.
    Keywords,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderSettings {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub provider: ProviderChoice,
    #[serde(default)]
    pub openai: ProviderSettings,
    #[serde(default)]
    pub anthropic: ProviderSettings,
    #[serde(default)]
    pub groq: ProviderSettings,
    #[serde(default)]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

fn default_max_tokens() -> usize {
    2048
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            provider: ProviderChoice::Auto,
            openai: ProviderSettings::default(),
            anthropic: ProviderSettings::default(),
            groq: ProviderSettings::default(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
        }
    }
}

/// A provider ready to be called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProvider {
    pub provider: LLMProvider,
    pub model: String,
    pub api_key: String,
}

pub fn default_model(provider: LLMProvider) -> &'static str {
    match provider {
        LLMProvider::OpenAI => "gpt-4o-mini",
        LLMProvider::Anthropic => "claude-3-5-haiku-20241022",
        LLMProvider::Groq => "llama-3.3-70b-versatile",
    }
}

fn key_var(provider: LLMProvider) -> &'static str {
    match provider {
        LLMProvider::OpenAI => "OPENAI_API_KEY",
        LLMProvider::Anthropic => "ANTHROPIC_API_KEY",
        LLMProvider::Groq => "GROQ_API_KEY",
    }
}

impl ClassifierConfig {
    pub fn load(path: &Path) -> Self {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Load from `path`, filling missing keys through `lookup`.
    ///
    /// A missing file gives the defaults. An unreadable or malformed file is
    /// logged and also gives the defaults, so the bot still starts with the
    /// keyword classifier.
    pub fn load_with<F>(path: &Path, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Ignoring malformed {}: {}", path.display(), e);
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No classifier config at {}", path.display());
                Self::default()
            }
            Err(e) => {
                warn!("Cannot read {}: {}", path.display(), e);
                Self::default()
            }
        };

        for provider in AUTO_ORDER {
            let settings = config.settings_mut(provider);
            if settings.api_key.is_none() {
                settings.api_key = lookup(key_var(provider));
            }
            if settings.api_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
                settings.api_key = None;
            }
        }
        config
    }

    fn settings(&self, provider: LLMProvider) -> &ProviderSettings {
        match provider {
            LLMProvider::OpenAI => &self.openai,
            LLMProvider::Anthropic => &self.anthropic,
            LLMProvider::Groq => &self.groq,
        }
    }

    fn settings_mut(&mut self, provider: LLMProvider) -> &mut ProviderSettings {
        match provider {
            LLMProvider::OpenAI => &mut self.openai,
            LLMProvider::Anthropic => &mut self.anthropic,
            LLMProvider::Groq => &mut self.groq,
        }
    }

    fn resolve(&self, provider: LLMProvider) -> Option<ResolvedProvider> {
        let settings = self.settings(provider);
        let api_key = settings.api_key.clone()?;
        Some(ResolvedProvider {
            provider,
            model: settings
                .model
                .clone()
                .unwrap_or_else(|| default_model(provider).to_string()),
            api_key,
        })
    }

    /// The provider to call, or `None` for the keyword fallback.
    pub fn resolve_provider(&self) -> Option<ResolvedProvider> {
        match self.provider {
            ProviderChoice::Auto => AUTO_ORDER.into_iter().find_map(|p| self.resolve(p)),
            ProviderChoice::OpenAI => self.resolve(LLMProvider::OpenAI),
            ProviderChoice::Anthropic => self.resolve(LLMProvider::Anthropic),
            ProviderChoice::Groq => self.resolve(LLMProvider::Groq),
            ProviderChoice::Keywords => None,
        }
    }
}
