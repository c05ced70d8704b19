//! Automatic daily digests.

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{debug, error, info, warn};

use teloxide::types::ChatId;

use crate::platform::send_report;
use crate::state::AppState;
use chatdigest_core::Result;
use chatdigest_runtime::DigestOutcome;
use chatdigest_store::{ChatSettings, DigestMode};

/// Whether an automatic digest is due for `settings` at local time `now`.
///
/// A digest is due once the configured time has passed and none has been
/// sent on the current local date.
pub fn is_due(settings: &ChatSettings, now: NaiveDateTime) -> bool {
    if !settings.is_active || settings.digest_mode != DigestMode::Auto {
        return false;
    }
    let Some(time) = settings.digest_time else {
        return false;
    };
    if now.time() < time {
        return false;
    }
    settings.last_auto_digest_on != Some(now.date())
}

/// Send every digest that is due at `now`. Returns the number of chats
/// attempted.
pub async fn run_due_digests(state: &AppState, now: DateTime<Utc>) -> Result<usize> {
    let local_now = now.with_timezone(&state.config.digest_utc_offset).naive_local();
    let due: Vec<ChatSettings> = state
        .store
        .list_auto_digest_chats()?
        .into_iter()
        .filter(|s| is_due(s, local_now))
        .collect();

    for settings in &due {
        let chat_id = settings.chat_id;

        let outcome = match state.assembler.build_digest(chat_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Automatic digest for chat {} failed: {}", chat_id, e);
                continue;
            }
        };

        let text = match outcome {
            DigestOutcome::TemporaryFailure => {
                warn!("Chat {}: classifier unavailable, retrying on the next pass", chat_id);
                continue;
            }
            DigestOutcome::NotActive | DigestOutcome::NothingFound => {
                debug!("Chat {}: no automatic digest today", chat_id);
                state.store.mark_auto_digest_sent(chat_id, local_now.date())?;
                continue;
            }
            other => crate::texts::digest_reply(other, state.assembler.window_hours()),
        };

        // Marked before sending; a failed send waits for the next day.
        state.store.mark_auto_digest_sent(chat_id, local_now.date())?;
        match send_report(state.platform.as_ref(), ChatId(chat_id), &text).await {
            Ok(()) => info!("Sent automatic digest to chat {}", chat_id),
            Err(e) => warn!("Failed to send automatic digest to chat {}: {}", chat_id, e),
        }
    }

    Ok(due.len())
}

/// Spawn the scheduler loop.
pub fn start_digest_scheduler(state: Arc<AppState>) {
    tokio::spawn(async move {
        info!(
            "Digest scheduler started (poll every {:?}, offset {})",
            state.config.scheduler_poll, state.config.digest_utc_offset
        );
        loop {
            if let Err(e) = run_due_digests(&state, Utc::now()).await {
                error!("Digest scheduler pass failed: {}", e);
            }
            tokio::time::sleep(state.config.scheduler_poll).await;
        }
    });
}
