//! HTTP route handlers.

pub mod health;
pub mod webhook;

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the main Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(webhook::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{group_chat, message_json, test_state, ADMIN, GROUP, WEBHOOK_SECRET};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::time::Duration;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_route() {
        let (state, _platform, _dir) = test_state();
        let response = build_router(state)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    fn webhook_request(secret: Option<&str>, body: String) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/telegram/webhook")
            .header("content-type", "application/json");
        if let Some(secret) = secret {
            builder = builder.header(webhook::SECRET_HEADER, secret);
        }
        builder.body(Body::from(body)).unwrap()
    }

    fn off_update() -> String {
        serde_json::json!({
            "update_id": 77,
            "message": message_json(group_chat(None), 3, ADMIN, "/off"),
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_webhook_rejects_malformed_update() {
        let (state, _platform, _dir) = test_state();
        let response = build_router(state)
            .oneshot(webhook_request(Some(WEBHOOK_SECRET), "{\"nope\": true}".into()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_forged_update_is_rejected() {
        let (state, platform, _dir) = test_state();
        state.store.set_active(GROUP, true).unwrap();
        let router = build_router(state.clone());

        let response = router
            .clone()
            .oneshot(webhook_request(None, off_update()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = router
            .oneshot(webhook_request(Some("not-the-secret"), off_update()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(platform.sent().is_empty());
        assert!(state.store.get_settings(GROUP).unwrap().unwrap().is_active);
    }

    #[tokio::test]
    async fn test_update_with_secret_is_accepted() {
        let (state, platform, _dir) = test_state();
        state.store.set_active(GROUP, true).unwrap();

        let response = build_router(state.clone())
            .oneshot(webhook_request(Some(WEBHOOK_SECRET), off_update()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        for _ in 0..50 {
            if !platform.sent().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!state.store.get_settings(GROUP).unwrap().unwrap().is_active);
    }
}
