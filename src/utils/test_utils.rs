//! Shared setup for unit tests.
//!
//! Every remote dependency (hiring platform, token endpoint, HR system, mail relay, Telegram)
//! is pointed at one wiremock server; routes are disjoint so a single server is enough.

use chrono::Utc;
use std::sync::Arc;

use crate::AppState;
use crate::models::{Credential, Subscription};
use crate::services::notifier::RecordingNotifier;
use crate::store::{MemoryStore, SyncStore};
use crate::utils::env::EnvVars;

pub const TEST_COMPANY: &str = "acme";
pub const TEST_REGISTRATION: &str = "tenants/t/registrations/r1";

/// NOTE: Keep in sync with `tests/common/mod.rs::test_env_vars()`.
pub fn test_env_vars(mock_uri: &str) -> EnvVars {
    EnvVars {
        database_url: String::new(),
        port: 0,
        hire_api_base_url: mock_uri.to_string(),
        hire_token_url: format!("{}/token", mock_uri),
        hire_authorize_url: format!("{}/authorize", mock_uri),
        hire_client_id: "client-id".to_string(),
        hire_client_secret: "client-secret".to_string(),
        hire_redirect_url: "http://localhost:3002/api/oauth/callback".to_string(),
        hire_oauth_scopes: "hire.readonly".to_string(),
        hire_tenant: "tenants/t".to_string(),
        hire_pubsub_topic: "projects/p/topics/hire".to_string(),
        hire_event_types: vec!["APPLICATION_STATUS_CHANGE".to_string()],
        target_stage: "BACKGROUND IN PROGRESS".to_string(),
        disable_polling: true,
        poll_safety_window_minutes: 60,
        subscription_renewal_interval_seconds: 86_400,
        hr_api_base_url: format!("{}/hr", mock_uri),
        hr_api_key: None,
        http_timeout_seconds: 5,
        worker_count: 2,
        worker_queue_capacity: 16,
        mail_relay_url: None,
        mail_relay_api_key: None,
        notification_recipient: None,
        telegram_bot_token: None,
        telegram_chat_id: None,
        telegram_api_base_url: mock_uri.to_string(),
        cors_allowed_origins: vec![],
    }
}

pub struct TestState {
    pub state: Arc<AppState>,
    pub store: Arc<MemoryStore>,
    pub notifier: RecordingNotifier,
}

/// App state over a memory store holding one authorized, subscribed connection.
pub async fn test_state(mock_uri: &str) -> TestState {
    let store = Arc::new(MemoryStore::new());
    store.upsert_connection(TEST_COMPANY).await.unwrap();
    store
        .set_subscription(
            TEST_COMPANY,
            Some(&Subscription {
                name: TEST_REGISTRATION.to_string(),
                event_types: vec!["APPLICATION_STATUS_CHANGE".to_string()],
                topic: "projects/p/topics/hire".to_string(),
                renewed_at: Utc::now(),
            }),
        )
        .await
        .unwrap();
    store
        .put_credential(&Credential {
            company_id: TEST_COMPANY.to_string(),
            access_token: "at-1".to_string(),
            refresh_token: "rt-1".to_string(),
            expires_at: Utc::now().timestamp() + 3600,
        })
        .await
        .unwrap();

    let notifier = RecordingNotifier::new();
    let state = AppState::with_store(
        test_env_vars(mock_uri),
        store.clone(),
        Arc::new(notifier.clone()),
    )
    .expect("Failed to build app state");

    TestState {
        state: Arc::new(state),
        store,
        notifier,
    }
}
