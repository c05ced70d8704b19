//! Importance classification pipeline, generic over category.
//!
//! Only unchecked facts are submitted, in a single classifier call. Results
//! are persisted in one transaction; a classifier failure writes nothing.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, warn};

use crate::types::Classified;
use chatdigest_classify::{ClassifierItem, ClassifyError, ImportanceClassifier};
use chatdigest_core::Result;
use chatdigest_store::{Category, Classification, ClassificationUpdate, Fact, SqliteStore};

/// Classify the unchecked facts among `items` and return the important ones.
///
/// `items` must all belong to `category`. Already-checked facts are never
/// resubmitted, so repeated runs converge without further external calls.
pub async fn classify_pipeline(
    store: &SqliteStore,
    classifier: &dyn ImportanceClassifier,
    category: Category,
    mut items: Vec<Fact>,
    timeout: Duration,
) -> Result<Classified> {
    let batch: Vec<ClassifierItem> = items
        .iter()
        .filter(|f| !f.is_checked())
        .map(ClassifierItem::from_fact)
        .collect();

    if !batch.is_empty() {
        let answer = match tokio::time::timeout(timeout, classifier.classify(category, &batch)).await
        {
            Ok(answer) => answer,
            Err(_) => Err(ClassifyError::Timeout),
        };

        let verdicts = match answer {
            Ok(verdicts) => verdicts,
            Err(e) => {
                warn!(
                    "Classifier {} failed for {} {} items: {}",
                    classifier.name(),
                    batch.len(),
                    category,
                    e
                );
                return Ok(Classified::Unavailable);
            }
        };

        let important: HashMap<i64, Option<String>> =
            verdicts.into_iter().map(|v| (v.id, v.about)).collect();

        let updates: Vec<ClassificationUpdate> = batch
            .iter()
            .map(|item| ClassificationUpdate {
                id: item.id,
                important: important.contains_key(&item.id),
                about: important.get(&item.id).cloned().flatten(),
            })
            .collect();

        store.mark_classified(category, &updates)?;

        let by_id: HashMap<i64, &ClassificationUpdate> = updates.iter().map(|u| (u.id, u)).collect();
        for fact in items.iter_mut() {
            if let Some(update) = by_id.get(&fact.id) {
                fact.classification = Classification::Checked {
                    important: update.important,
                    about: update.about.clone(),
                };
            }
        }

        debug!(
            "Classified {} {} items, {} important",
            updates.len(),
            category,
            important.len()
        );
    }

    Ok(Classified::Important(
        items.into_iter().filter(|f| f.is_important()).collect(),
    ))
}
