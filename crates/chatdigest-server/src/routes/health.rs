//! Liveness route.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

/// GET /health — liveness plus a database round trip.
async fn get_health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    match state.store.count_chats() {
        Ok(chats) => Json(serde_json::json!({
            "status": "ok",
            "chats": chats,
            "bot": state.bot_username.read().clone(),
        })),
        Err(e) => Json(serde_json::json!({
            "status": "degraded",
            "error": e.to_string(),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_state, GROUP};

    #[tokio::test]
    async fn test_health_counts_chats() {
        let (state, _platform, _dir) = test_state();
        state.store.set_active(GROUP, true).unwrap();
        let Json(body) = get_health(State(state)).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["chats"], 1);
        assert_eq!(body["bot"], "digest_bot");
    }
}
