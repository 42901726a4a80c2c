use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use talent_sync::AppState;
use talent_sync::models::{Credential, Subscription};
use talent_sync::services::RecordingNotifier;
use talent_sync::store::{MemoryStore, SyncStore};
use talent_sync::utils::env::EnvVars;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const COMPANY: &str = "acme";
pub const REGISTRATION: &str = "tenants/t/registrations/r1";
pub const APPLICATION: &str = "tenants/t/applications/a1";
pub const CANDIDATE: &str = "tenants/t/candidates/c1";

/// Every remote dependency points at the same mock server.
///
/// NOTE: Keep in sync with `src/utils/test_utils.rs::test_env_vars()` which serves
/// unit tests. Integration tests can't access #[cfg(test)] items from the library.
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
        hr_api_key: Some("hr-key".to_string()),
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

pub struct TestApp {
    pub mock_server: MockServer,
    pub state: Arc<AppState>,
    pub store: Arc<MemoryStore>,
    pub notifier: RecordingNotifier,
}

impl TestApp {
    /// One authorized and subscribed connection over a memory store.
    pub async fn start() -> Self {
        let mock_server = MockServer::start().await;

        let store = Arc::new(MemoryStore::new());
        store.upsert_connection(COMPANY).await.unwrap();
        store
            .set_subscription(
                COMPANY,
                Some(&Subscription {
                    name: REGISTRATION.to_string(),
                    event_types: vec!["APPLICATION_STATUS_CHANGE".to_string()],
                    topic: "projects/p/topics/hire".to_string(),
                    renewed_at: Utc::now(),
                }),
            )
            .await
            .unwrap();
        store
            .put_credential(&Credential {
                company_id: COMPANY.to_string(),
                access_token: "at-1".to_string(),
                refresh_token: "rt-1".to_string(),
                expires_at: Utc::now().timestamp() + 3600,
            })
            .await
            .unwrap();

        let notifier = RecordingNotifier::new();
        let state = AppState::with_store(
            test_env_vars(&mock_server.uri()),
            store.clone(),
            Arc::new(notifier.clone()),
        )
        .expect("Failed to build app state");

        Self {
            mock_server,
            state: Arc::new(state),
            store,
            notifier,
        }
    }

    /// Mock the platform and HR endpoints for one candidate in the target stage.
    /// The HR create mock expects exactly `creations` calls.
    pub async fn mount_candidate_in_stage(&self, stage: &str, creations: u64) {
        Mock::given(method("GET"))
            .and(path(format!("/v1/{}", APPLICATION)))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": APPLICATION,
                "candidate": CANDIDATE,
                "job": "tenants/t/jobs/j1",
                "status": {"state": "ACTIVE", "processStage": stage}
            })))
            .mount(&self.mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/v1/{}", CANDIDATE)))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": CANDIDATE,
                "personName": {"givenName": "Ada", "familyName": "Lovelace"},
                "emails": ["ada@example.com"],
                "phoneNumbers": ["+44 20 0000"]
            })))
            .mount(&self.mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/hr/applicants"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": 42})))
            .expect(creations)
            .mount(&self.mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/hr/applicants/42/jobs"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&self.mock_server)
            .await;
    }

    /// Wait until `count` outcome notifications were sent, or fail after five seconds.
    pub async fn wait_for_notifications(&self, count: usize) {
        let waited = tokio::time::timeout(Duration::from_secs(5), async {
            while self.notifier.sent().await.len() < count {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await;
        assert!(waited.is_ok(), "expected {} notification(s)", count);
    }
}

/// Webhook body for `resource`, wrapped the way the platform delivers it.
pub fn webhook_body(notification_type: &str, registration: &str, resource: &str) -> String {
    let inner = serde_json::json!({
        "notificationType": notification_type,
        "registration": registration,
        "resource": resource,
    });
    let data = base64::Engine::encode(
        &base64::engine::general_purpose::STANDARD,
        inner.to_string(),
    );
    serde_json::json!({
        "message": {
            "data": data,
            "messageId": "m-1",
            "publishTime": Utc::now().to_rfc3339()
        },
        "subscription": "projects/p/subscriptions/hire"
    })
    .to_string()
}
