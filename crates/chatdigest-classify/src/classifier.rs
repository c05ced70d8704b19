//! Importance classifiers.
//!
//! A classifier receives one batch of facts of a single category and
//! returns the subset it considers important, each with an optional short
//! description. Two implementations: an LLM-backed one and a keyword
//! heuristic used when no provider is configured.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::ClassifierConfig;
use crate::providers;
use crate::types::{ChatMessage, ClassifierItem, ClassifyError, LLMProvider, Verdict};
use chatdigest_store::Category;

/// Keywords that mark an item as important for the keyword classifier.
pub const IMPORTANCE_KEYWORDS: &[&str] = &[
    "сроч",
    "важн",
    "нужно",
    "обязательно",
    "deadline",
    "сделать",
    "внимание",
    "urgent",
    "important",
];

const SYSTEM_PROMPT: &str = "You review facts collected from a group chat and pick the ones \
worth including in a daily digest: concrete tasks, deadlines, decisions, useful resources and \
anything members would regret missing. Skip small talk, jokes and duplicates.\n\
Input is a JSON array of objects {\"id\", \"category\", \"text\"}.\n\
Answer with a JSON array containing only the important items as objects \
{\"id\": <id from the input>, \"about\": \"<one short sentence describing the item, in the \
language of the item>\"}. Answer [] when nothing is important. Output JSON only.";

#[async_trait]
pub trait ImportanceClassifier: Send + Sync {
    /// Classify a batch of items of one category. Returns the important ones.
    async fn classify(
        &self,
        category: Category,
        items: &[ClassifierItem],
    ) -> Result<Vec<Verdict>, ClassifyError>;

    /// Name for logs.
    fn name(&self) -> String;
}

/// Classifier backed by an external LLM provider.
pub struct LlmClassifier {
    client: Client,
    provider: LLMProvider,
    model: String,
    api_key: String,
    temperature: f64,
    max_tokens: usize,
}

impl LlmClassifier {
    pub fn new(
        client: Client,
        provider: LLMProvider,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            provider,
            model: model.into(),
            api_key: api_key.into(),
            temperature: 0.0,
            max_tokens: 2048,
        }
    }

    /// Build from config. `None` when no provider has a key.
    pub fn from_config(client: Client, config: &ClassifierConfig) -> Option<Self> {
        let resolved = config.resolve_provider()?;
        let mut classifier = Self::new(client, resolved.provider, resolved.model, resolved.api_key);
        classifier.temperature = config.temperature;
        classifier.max_tokens = config.max_tokens;
        Some(classifier)
    }
}

#[async_trait]
impl ImportanceClassifier for LlmClassifier {
    async fn classify(
        &self,
        category: Category,
        items: &[ClassifierItem],
    ) -> Result<Vec<Verdict>, ClassifyError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let messages = build_messages(category, items)?;
        let raw = providers::complete(
            &self.client,
            self.provider,
            &messages,
            &self.model,
            &self.api_key,
            self.temperature,
            self.max_tokens,
        )
        .await?;

        let submitted: HashSet<i64> = items.iter().map(|i| i.id).collect();
        let verdicts = parse_verdicts(&raw, &submitted)?;
        debug!(
            "{} marked {}/{} {} items important",
            self.provider,
            verdicts.len(),
            items.len(),
            category
        );
        Ok(verdicts)
    }

    fn name(&self) -> String {
        format!("{}:{}", self.provider, self.model)
    }
}

/// Build the provider conversation for one batch.
pub fn build_messages(
    category: Category,
    items: &[ClassifierItem],
) -> Result<Vec<ChatMessage>, ClassifyError> {
    let payload =
        serde_json::to_string(items).map_err(|e| ClassifyError::Malformed(e.to_string()))?;
    Ok(vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(format!("Category: {}\nItems:\n{}", category, payload)),
    ])
}

/// Parse a provider answer into verdicts.
///
/// Accepts a bare JSON array, optionally wrapped in prose or a code fence.
/// Ids that were not submitted are dropped, as are repeated ids.
pub fn parse_verdicts(raw: &str, submitted: &HashSet<i64>) -> Result<Vec<Verdict>, ClassifyError> {
    let start = raw
        .find('[')
        .ok_or_else(|| ClassifyError::Malformed("no JSON array in response".into()))?;
    let end = raw
        .rfind(']')
        .filter(|end| *end > start)
        .ok_or_else(|| ClassifyError::Malformed("unterminated JSON array".into()))?;

    let parsed: Vec<Verdict> = serde_json::from_str(&raw[start..=end])
        .map_err(|e| ClassifyError::Malformed(e.to_string()))?;

    let mut seen = HashSet::new();
    let mut verdicts = Vec::with_capacity(parsed.len());
    for mut verdict in parsed {
        if !submitted.contains(&verdict.id) {
            warn!("Classifier returned unknown id {}, ignoring", verdict.id);
            continue;
        }
        if !seen.insert(verdict.id) {
            continue;
        }
        verdict.about = verdict
            .about
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());
        verdicts.push(verdict);
    }
    Ok(verdicts)
}

/// Offline classifier: an item is important when its text contains an
/// importance keyword.
#[derive(Debug, Default, Clone)]
pub struct KeywordClassifier;

#[async_trait]
impl ImportanceClassifier for KeywordClassifier {
    async fn classify(
        &self,
        _category: Category,
        items: &[ClassifierItem],
    ) -> Result<Vec<Verdict>, ClassifyError> {
        Ok(items
            .iter()
            .filter(|item| {
                let lower = item.text.to_lowercase();
                IMPORTANCE_KEYWORDS.iter().any(|k| lower.contains(k))
            })
            .map(|item| Verdict {
                id: item.id,
                about: None,
            })
            .collect())
    }

    fn name(&self) -> String {
        "keywords".into()
    }
}

/// Create the classifier for a configuration: the LLM one when a provider
/// key is available, otherwise the keyword fallback.
pub fn create_classifier(config: &ClassifierConfig) -> Arc<dyn ImportanceClassifier> {
    match LlmClassifier::from_config(Client::new(), config) {
        Some(classifier) => {
            info!("Importance classifier: {}", classifier.name());
            Arc::new(classifier)
        }
        None => {
            warn!("No classifier provider configured, using keyword classifier");
            Arc::new(KeywordClassifier)
        }
    }
}
