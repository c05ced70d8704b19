//! Digest assembly: window fetch, concurrent per-category classification,
//! rendering.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info};

use crate::pipeline::classify_pipeline;
use crate::render::{render_digest, render_listing, MessageLinker};
use crate::types::{Classified, DigestOutcome, ListingOutcome};
use chatdigest_classify::ImportanceClassifier;
use chatdigest_core::{BotConfig, Result};
use chatdigest_store::{Category, Fact, SqliteStore};

/// Builds digests and category listings for chats.
pub struct DigestAssembler {
    store: Arc<SqliteStore>,
    classifier: Arc<dyn ImportanceClassifier>,
    window_hours: i64,
    classifier_timeout: Duration,
}

impl DigestAssembler {
    pub fn new(
        store: Arc<SqliteStore>,
        classifier: Arc<dyn ImportanceClassifier>,
        window_hours: i64,
        classifier_timeout: Duration,
    ) -> Self {
        Self {
            store,
            classifier,
            window_hours,
            classifier_timeout,
        }
    }

    pub fn from_config(
        store: Arc<SqliteStore>,
        classifier: Arc<dyn ImportanceClassifier>,
        config: &BotConfig,
    ) -> Self {
        Self::new(store, classifier, config.window_hours, config.classifier_timeout)
    }

    pub fn window_hours(&self) -> i64 {
        self.window_hours
    }

    /// Start of the current window, unix millis.
    fn window_start(&self) -> i64 {
        chrono::Utc::now().timestamp_millis() - self.window_hours * 3_600_000
    }

    /// Build the digest for a chat.
    pub async fn build_digest(&self, chat_id: i64) -> Result<DigestOutcome> {
        let settings = match self.store.get_settings(chat_id)? {
            Some(s) if s.is_active => s,
            _ => return Ok(DigestOutcome::NotActive),
        };

        let since = self.window_start();
        let mut windows: Vec<(Category, Vec<Fact>)> = Vec::new();
        for category in settings.enabled_categories() {
            let facts = self.store.list_window(chat_id, category, since)?;
            if !facts.is_empty() {
                windows.push((category, facts));
            }
        }

        if windows.is_empty() {
            debug!("Chat {}: nothing in the window", chat_id);
            return Ok(DigestOutcome::NothingFound);
        }

        let store = self.store.as_ref();
        let classifier = self.classifier.as_ref();
        let timeout = self.classifier_timeout;
        let runs = windows.into_iter().map(|(category, facts)| async move {
            let result = classify_pipeline(store, classifier, category, facts, timeout).await;
            (category, result)
        });

        let mut sections: Vec<(Category, Vec<Fact>)> = Vec::new();
        let mut unavailable = 0usize;
        let mut attempted = 0usize;
        for (category, result) in join_all(runs).await {
            attempted += 1;
            match result? {
                Classified::Unavailable => unavailable += 1,
                Classified::Important(facts) => sections.push((category, facts)),
            }
        }

        if unavailable == attempted {
            return Ok(DigestOutcome::TemporaryFailure);
        }

        let linker = MessageLinker::new(chat_id, settings.username.as_deref());
        match render_digest(&sections, &linker, self.window_hours) {
            Some(text) => {
                info!(
                    "Digest for chat {}: {} sections, {} categories unavailable",
                    chat_id,
                    sections.iter().filter(|(_, f)| !f.is_empty()).count(),
                    unavailable
                );
                Ok(DigestOutcome::Report(text))
            }
            None => Ok(DigestOutcome::NothingImportant),
        }
    }

    /// Build a single-category listing. Ignores toggles and the activation flag.
    pub async fn listing(
        &self,
        chat_id: i64,
        username: Option<&str>,
        category: Category,
    ) -> Result<ListingOutcome> {
        let facts = self.store.list_window(chat_id, category, self.window_start())?;
        if facts.is_empty() {
            return Ok(ListingOutcome::Empty);
        }

        let result = classify_pipeline(
            &self.store,
            self.classifier.as_ref(),
            category,
            facts,
            self.classifier_timeout,
        )
        .await?;

        let important = match result {
            Classified::Unavailable => return Ok(ListingOutcome::TemporaryFailure),
            Classified::Important(facts) => facts,
        };

        let linker = MessageLinker::new(chat_id, username);
        Ok(
            match render_listing(category, &important, &linker, self.window_hours) {
                Some(text) => ListingOutcome::Report(text),
                None => ListingOutcome::NothingImportant,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::section_heading;
    use crate::testing::{test_store, MockClassifier};
    use chatdigest_store::{FactPayload, NewFact, SettingsField};
    use tempfile::TempDir;

    const CHAT: i64 = -1001234567;

    fn setup(classifier: Arc<MockClassifier>) -> (DigestAssembler, Arc<SqliteStore>, TempDir) {
        let (store, dir) = test_store();
        let store = Arc::new(store);
        let assembler =
            DigestAssembler::new(store.clone(), classifier, 24, Duration::from_millis(200));
        (assembler, store, dir)
    }

    fn add(store: &SqliteStore, message_id: i64, payload: FactPayload, context: &str) -> i64 {
        store
            .append(&NewFact {
                chat_id: CHAT,
                message_id,
                payload,
                context: context.into(),
            })
            .unwrap()
    }

    #[tokio::test]
    async fn test_inactive_chat_is_not_active() {
        let classifier = Arc::new(MockClassifier::new());
        let (assembler, store, _dir) = setup(classifier.clone());
        assert_eq!(assembler.build_digest(CHAT).await.unwrap(), DigestOutcome::NotActive);

        store.set_active(CHAT, false).unwrap();
        add(&store, 1, FactPayload::Task { description: "сделать".into() }, "сделать");
        assert_eq!(assembler.build_digest(CHAT).await.unwrap(), DigestOutcome::NotActive);
        assert!(classifier.calls().is_empty());
    }

    #[tokio::test]
    async fn test_nothing_found() {
        let classifier = Arc::new(MockClassifier::new());
        let (assembler, store, _dir) = setup(classifier.clone());
        store.set_active(CHAT, true).unwrap();
        assert_eq!(assembler.build_digest(CHAT).await.unwrap(), DigestOutcome::NothingFound);
        assert!(classifier.calls().is_empty());
    }

    #[tokio::test]
    async fn test_single_important_task() {
        let (store, _dir) = test_store();
        let store = Arc::new(store);
        store.set_active(CHAT, true).unwrap();
        let id = add(
            &store,
            77,
            FactPayload::Task {
                description: "надо сдать отчёт".into(),
            },
            "надо сдать отчёт",
        );
        let classifier = Arc::new(MockClassifier::new().important(id, Some("Submit report by Friday")));
        let assembler = DigestAssembler::new(store, classifier, 24, Duration::from_secs(5));

        let DigestOutcome::Report(text) = assembler.build_digest(CHAT).await.unwrap() else {
            panic!("expected a report");
        };
        assert!(text.contains("Submit report by Friday"));
        assert!(text.contains("https://t.me/c/1234567/77"));
    }

    #[tokio::test]
    async fn test_timed_out_category_is_omitted() {
        let (store, _dir) = test_store();
        let store = Arc::new(store);
        store.set_active(CHAT, true).unwrap();
        let task = add(&store, 1, FactPayload::Task { description: "дедлайн завтра".into() }, "дедлайн завтра");
        let link = add(
            &store,
            2,
            FactPayload::Link {
                url: "https://example.com".into(),
            },
            "https://example.com",
        );
        let classifier = Arc::new(
            MockClassifier::new()
                .important(task, None)
                .important(link, None)
                .slow_for(Category::Link, Duration::from_millis(500)),
        );
        let assembler = DigestAssembler::new(store.clone(), classifier, 24, Duration::from_millis(50));

        let DigestOutcome::Report(text) = assembler.build_digest(CHAT).await.unwrap() else {
            panic!("expected a report");
        };
        assert!(text.contains(section_heading(Category::Task)));
        assert!(!text.contains(section_heading(Category::Link)));
        assert!(!store.get_fact(Category::Link, link).unwrap().unwrap().is_checked());
    }

    #[tokio::test]
    async fn test_all_categories_failing_is_temporary_failure() {
        let classifier = Arc::new(MockClassifier::new().failing());
        let (assembler, store, _dir) = setup(classifier);
        store.set_active(CHAT, true).unwrap();
        add(&store, 1, FactPayload::Task { description: "надо".into() }, "надо бы");
        add(&store, 2, FactPayload::Hashtag { tag: "#exam".into() }, "#exam");
        assert_eq!(
            assembler.build_digest(CHAT).await.unwrap(),
            DigestOutcome::TemporaryFailure
        );
    }

    #[tokio::test]
    async fn test_nothing_important() {
        let classifier = Arc::new(MockClassifier::new());
        let (assembler, store, _dir) = setup(classifier);
        store.set_active(CHAT, true).unwrap();
        add(&store, 1, FactPayload::Mention { handle: "@ivan".into() }, "@ivan привет");
        assert_eq!(
            assembler.build_digest(CHAT).await.unwrap(),
            DigestOutcome::NothingImportant
        );
    }

    #[tokio::test]
    async fn test_hashtags_share_one_heading() {
        let (store, _dir) = test_store();
        let store = Arc::new(store);
        store.set_active(CHAT, true).unwrap();
        let a = add(&store, 1, FactPayload::Hashtag { tag: "#exam".into() }, "#exam в пятницу");
        let b = add(&store, 2, FactPayload::Hashtag { tag: "#exam".into() }, "#exam аудитория 5");
        let classifier = Arc::new(MockClassifier::new().important(a, None).important(b, None));
        let assembler = DigestAssembler::new(store, classifier, 24, Duration::from_secs(5));

        let DigestOutcome::Report(text) = assembler.build_digest(CHAT).await.unwrap() else {
            panic!("expected a report");
        };
        assert_eq!(text.matches("<b>#exam</b>").count(), 1);
        assert!(text.contains("https://t.me/c/1234567/1"));
        assert!(text.contains("https://t.me/c/1234567/2"));
    }

    #[tokio::test]
    async fn test_disabled_categories_are_not_fetched() {
        let classifier = Arc::new(MockClassifier::new());
        let (assembler, store, _dir) = setup(classifier.clone());
        store.set_active(CHAT, true).unwrap();
        store
            .set_field(CHAT, SettingsField::Include(Category::Link, false))
            .unwrap();
        add(&store, 1, FactPayload::Link { url: "https://a.b".into() }, "https://a.b");
        add(&store, 2, FactPayload::Task { description: "task one".into() }, "task one");

        assembler.build_digest(CHAT).await.unwrap();
        assert_eq!(classifier.categories_called(), vec![Category::Task]);
    }

    #[tokio::test]
    async fn test_listing_ignores_activation() {
        let (store, _dir) = test_store();
        let store = Arc::new(store);
        let id = add(&store, 9, FactPayload::Document {
            file_name: "lecture.pdf".into(),
            file_id: "BQAC".into(),
        }, "slides");
        let classifier = Arc::new(MockClassifier::new().important(id, None));
        let assembler = DigestAssembler::new(store, classifier, 24, Duration::from_secs(5));

        let ListingOutcome::Report(text) = assembler
            .listing(CHAT, Some("studygroup"), Category::Document)
            .await
            .unwrap()
        else {
            panic!("expected a report");
        };
        assert!(text.contains("https://t.me/studygroup/9"));
        assert_eq!(
            assembler.listing(CHAT, None, Category::Hashtag).await.unwrap(),
            ListingOutcome::Empty
        );
    }

    #[tokio::test]
    async fn test_listing_failure() {
        let classifier = Arc::new(MockClassifier::new().failing_for(Category::Task));
        let (assembler, store, _dir) = setup(classifier);
        add(&store, 1, FactPayload::Task { description: "сделать".into() }, "сделать дз");
        assert_eq!(
            assembler.listing(CHAT, None, Category::Task).await.unwrap(),
            ListingOutcome::TemporaryFailure
        );
    }

    #[tokio::test]
    async fn test_categories_are_classified_concurrently() {
        let (store, _dir) = test_store();
        let store = Arc::new(store);
        store.set_active(CHAT, true).unwrap();
        let task = add(&store, 1, FactPayload::Task { description: "сделать макет".into() }, "сделать макет");
        let tag = add(&store, 2, FactPayload::Hashtag { tag: "#design".into() }, "#design");
        let classifier = Arc::new(
            MockClassifier::new()
                .important(task, None)
                .important(tag, None)
                .with_delay(Duration::from_millis(300)),
        );
        let assembler = DigestAssembler::new(store, classifier, 24, Duration::from_millis(500));

        let started = std::time::Instant::now();
        let DigestOutcome::Report(text) = assembler.build_digest(CHAT).await.unwrap() else {
            panic!("expected a report");
        };
        assert!(started.elapsed() < Duration::from_millis(550));
        assert!(text.contains(section_heading(Category::Task)));
        assert!(text.contains(section_heading(Category::Hashtag)));
    }
}
