use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::{AppState, handlers};

async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if let Err(e) = state.store.health_check().await {
        log::error!("Health check failed: {}", e);
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unhealthy",
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "store": {
                    "connected": false,
                    "error": "Store unavailable"
                }
            })),
        ));
    }

    Ok(Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "store": { "connected": true },
        "workers": { "queued": state.workers.queued() }
    })))
}

pub fn create_routes(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/api/health", get(health_check))
        // Push notifications from the hiring platform
        .route("/api/webhooks/hire", post(handlers::webhook::receive_webhook))
        // OAuth
        .route(
            "/api/oauth/callback",
            get(handlers::connections::oauth_callback),
        )
        // Connections
        .route(
            "/api/connections/{company_id}",
            get(handlers::connections::get_connection)
                .delete(handlers::connections::deauthorize),
        )
        .route(
            "/api/connections/{company_id}/authorize",
            get(handlers::connections::authorize),
        )
        .route(
            "/api/connections/{company_id}/subscription",
            post(handlers::connections::renew_subscription),
        )
        .route(
            "/api/connections/{company_id}/poll",
            post(handlers::connections::trigger_poll),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::test_state;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;
    use wiremock::MockServer;

    #[tokio::test]
    async fn test_health_check() {
        let mock_server = MockServer::start().await;
        let t = test_state(&mock_server.uri()).await;

        let response = create_routes(t.state.clone())
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
