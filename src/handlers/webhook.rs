use axum::{Json, body::Bytes, extract::State, http::StatusCode};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::AppState;
use crate::services::decode_webhook;

/// Push endpoint for the hiring platform.
///
/// Always answers `200 {"ack":"success"}`: a non-2xx makes the platform redeliver, and a
/// payload we cannot decode will not decode any better the second time. Decoded events are
/// queued on the worker pool; the response never waits for processing.
pub async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    match decode_webhook(&body) {
        Ok(notification) => {
            log::info!(
                "Webhook {:?} for {} (registration {}, message {})",
                notification.notification_type,
                notification.resource,
                notification.registration,
                notification.message_id
            );
            if let Err(e) = state.workers.try_submit(notification.into_change_event()) {
                log::warn!("Webhook event not queued: {}", e);
            }
        }
        Err(e) => {
            log::warn!("Discarding webhook ({} bytes): {}", body.len(), e);
        }
    }

    (StatusCode::OK, Json(json!({ "ack": "success" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::test_state;
    use axum::{Router, body::Body, http::Request, routing::post};
    use tower::ServiceExt;
    use wiremock::MockServer;

    async fn ack_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_malformed_webhook_is_acknowledged() {
        let mock_server = MockServer::start().await;
        let t = test_state(&mock_server.uri()).await;
        let app = Router::new()
            .route("/webhook", post(receive_webhook))
            .with_state(t.state.clone());

        for body in ["", "not json", r#"{"message":{"data":"!!!"}}"#] {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri("/webhook")
                        .body(Body::from(body))
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(ack_body(response).await, json!({ "ack": "success" }));
        }

        assert_eq!(t.store.processed_count().await, 0);
    }
}
