//! Telegram webhook receiver.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use teloxide::types::Update;
use tracing::{debug, warn};

use crate::commands::handle_update;
use crate::state::AppState;

/// Header carrying the secret registered with `setWebhook`.
pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/telegram/webhook", post(receive_update))
}

fn is_authentic(state: &AppState, headers: &HeaderMap) -> bool {
    let Some(expected) = state.config.webhook_secret.as_deref() else {
        return false;
    };
    headers
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|given| given == expected)
}

/// POST /telegram/webhook — check the secret, acknowledge at once, handle
/// in the background.
async fn receive_update(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if !is_authentic(&state, &headers) {
        warn!("Rejected webhook request without a valid secret token");
        return StatusCode::UNAUTHORIZED;
    }
    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            debug!("Malformed webhook update: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };
    debug!("Webhook update {:?}", update.id);
    tokio::spawn(async move {
        handle_update(&state, update).await;
    });
    StatusCode::OK
}
