//! Test doubles shared by the runtime tests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;

use chatdigest_classify::{ClassifierItem, ClassifyError, ImportanceClassifier, Verdict};
use chatdigest_store::{Category, SqliteStore};

pub fn test_store() -> (SqliteStore, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = SqliteStore::open(dir.path()).unwrap();
    (store, dir)
}

/// Classifier with scripted answers that records every call.
#[derive(Default)]
pub struct MockClassifier {
    important: HashMap<i64, Option<String>>,
    fail_all: bool,
    fail_categories: HashSet<Category>,
    delay: Option<Duration>,
    slow_categories: HashMap<Category, Duration>,
    calls: Arc<Mutex<Vec<Vec<ClassifierItem>>>>,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `id` as important with the given description.
    pub fn important(mut self, id: i64, about: Option<&str>) -> Self {
        self.important.insert(id, about.map(str::to_string));
        self
    }

    /// Fail every call.
    pub fn failing(mut self) -> Self {
        self.fail_all = true;
        self
    }

    /// Fail calls for one category.
    pub fn failing_for(mut self, category: Category) -> Self {
        self.fail_categories.insert(category);
        self
    }

    /// Sleep before answering any call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sleep before answering calls for one category.
    pub fn slow_for(mut self, category: Category, delay: Duration) -> Self {
        self.slow_categories.insert(category, delay);
        self
    }

    pub fn calls(&self) -> Vec<Vec<ClassifierItem>> {
        self.calls.lock().clone()
    }

    pub fn categories_called(&self) -> Vec<Category> {
        let mut categories: Vec<Category> = self
            .calls
            .lock()
            .iter()
            .filter_map(|batch| batch.first().map(|i| i.category))
            .collect();
        categories.sort();
        categories
    }
}

#[async_trait]
impl ImportanceClassifier for MockClassifier {
    async fn classify(
        &self,
        category: Category,
        items: &[ClassifierItem],
    ) -> Result<Vec<Verdict>, ClassifyError> {
        self.calls.lock().push(items.to_vec());

        if let Some(delay) = self.slow_categories.get(&category).copied().or(self.delay) {
            tokio::time::sleep(delay).await;
        }
        if self.fail_all || self.fail_categories.contains(&category) {
            return Err(ClassifyError::Api {
                status: 503,
                body: "unavailable".into(),
            });
        }

        Ok(self
            .important
            .iter()
            .map(|(id, about)| Verdict {
                id: *id,
                about: about.clone(),
            })
            .collect())
    }

    fn name(&self) -> String {
        "mock".into()
    }
}
