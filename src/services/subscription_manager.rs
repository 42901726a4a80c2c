//! Push registration lifecycle on the hiring platform.
//!
//! The platform treats a repeated create as a renewal, so first registration and renewal share
//! one code path and the stored registration is always overwritten. Each call is a single
//! attempt; the renewal service retries on its next tick.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use super::hire_client::HireClient;
use super::token_manager::TokenManager;
use crate::error::SyncError;
use crate::models::Subscription;
use crate::store::SyncStore;

#[derive(Clone)]
pub struct SubscriptionManager {
    store: Arc<dyn SyncStore>,
    tokens: TokenManager,
    hire: HireClient,
    tenant: String,
    topic: String,
    event_types: Vec<String>,
}

impl SubscriptionManager {
    pub fn new(
        store: Arc<dyn SyncStore>,
        tokens: TokenManager,
        hire: HireClient,
        tenant: String,
        topic: String,
        event_types: Vec<String>,
    ) -> Self {
        Self {
            store,
            tokens,
            hire,
            tenant,
            topic,
            event_types,
        }
    }

    pub async fn create_or_renew(&self, company_id: &str) -> Result<Subscription, SyncError> {
        if self.store.get_connection(company_id).await?.is_none() {
            return Err(SyncError::NotFound(format!("connection {}", company_id)));
        }

        let token = self.tokens.ensure_valid_token(company_id).await?;

        let registration = self
            .hire
            .create_registration(&token, &self.tenant, &self.topic, &self.event_types)
            .await?;

        let subscription = Subscription {
            name: registration.name,
            event_types: if registration.event_types.is_empty() {
                self.event_types.clone()
            } else {
                registration.event_types
            },
            topic: registration.topic.unwrap_or_else(|| self.topic.clone()),
            renewed_at: Utc::now(),
        };

        self.store
            .set_subscription(company_id, Some(&subscription))
            .await?;

        log::info!(
            "Registration {} active for company {}",
            subscription.name,
            company_id
        );

        Ok(subscription)
    }

    /// Tear down the registration. Without a stored registration this is a no-op.
    pub async fn delete(&self, company_id: &str) -> Result<(), SyncError> {
        let Some(connection) = self.store.get_connection(company_id).await? else {
            return Ok(());
        };
        let Some(name) = connection.registration_name().filter(|n| !n.is_empty()) else {
            log::debug!("No registration stored for {}, nothing to delete", company_id);
            return Ok(());
        };

        let token = self.tokens.ensure_valid_token(company_id).await?;
        self.hire.delete_registration(&token, name).await?;
        self.store.set_subscription(company_id, None).await?;

        log::info!("Deleted registration {} for company {}", name, company_id);
        Ok(())
    }
}

/// Renew every stored registration on a fixed interval. Failures are logged per connection.
pub async fn run_subscription_renewal_service(
    store: Arc<dyn SyncStore>,
    subscriptions: SubscriptionManager,
    interval_secs: u64,
) {
    log::info!(
        "Starting subscription renewal service (interval: {} seconds)",
        interval_secs
    );

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    // The first tick completes immediately; registrations were just created or are
    // restored from the store, so skip it.
    interval.tick().await;

    loop {
        interval.tick().await;

        let connections = match store.list_connections().await {
            Ok(connections) => connections,
            Err(e) => {
                log::error!("Failed to list connections for renewal: {}", e);
                continue;
            }
        };

        for connection in connections.iter().filter(|c| c.subscription.is_some()) {
            if let Err(e) = subscriptions.create_or_renew(&connection.company_id).await {
                log::warn!(
                    "Failed to renew registration for {}: {}",
                    connection.company_id,
                    e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Credential;
    use crate::store::MemoryStore;
    use reqwest::Client;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup(uri: &str) -> (Arc<MemoryStore>, SubscriptionManager) {
        let store = Arc::new(MemoryStore::new());
        store.upsert_connection("acme").await.unwrap();
        store
            .put_credential(&Credential {
                company_id: "acme".to_string(),
                access_token: "at-1".to_string(),
                refresh_token: "rt-1".to_string(),
                expires_at: Utc::now().timestamp() + 3600,
            })
            .await
            .unwrap();

        let hire = HireClient::new(
            Client::new(),
            uri.to_string(),
            format!("{}/token", uri),
            "client-id".to_string(),
            "client-secret".to_string(),
            "http://localhost/callback".to_string(),
        );
        let tokens = TokenManager::new(store.clone(), hire.clone());
        let manager = SubscriptionManager::new(
            store.clone(),
            tokens,
            hire,
            "tenants/t".to_string(),
            "projects/p/topics/hire".to_string(),
            vec!["APPLICATION_STATUS_CHANGE".to_string()],
        );
        (store, manager)
    }

    #[tokio::test]
    async fn test_create_or_renew_overwrites_registration() {
        let mock_server = MockServer::start().await;
        let (store, manager) = setup(&mock_server.uri()).await;

        Mock::given(method("POST"))
            .and(path("/v1/tenants/t/registrations"))
            .and(header("Authorization", "Bearer at-1"))
            .and(body_partial_json(serde_json::json!({
                "topic": "projects/p/topics/hire",
                "eventTypes": ["APPLICATION_STATUS_CHANGE"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "tenants/t/registrations/r1"
            })))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/tenants/t/registrations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "tenants/t/registrations/r2"
            })))
            .mount(&mock_server)
            .await;

        let first = manager.create_or_renew("acme").await.unwrap();
        assert_eq!(first.name, "tenants/t/registrations/r1");
        assert_eq!(first.topic, "projects/p/topics/hire");

        manager.create_or_renew("acme").await.unwrap();
        let connection = store.get_connection("acme").await.unwrap().unwrap();
        assert_eq!(
            connection.registration_name(),
            Some("tenants/t/registrations/r2")
        );
    }

    #[tokio::test]
    async fn test_create_error_carries_remote_body() {
        let mock_server = MockServer::start().await;
        let (store, manager) = setup(&mock_server.uri()).await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("topic does not exist"))
            .mount(&mock_server)
            .await;

        let err = manager.create_or_renew("acme").await.unwrap_err();
        assert!(
            matches!(err, SyncError::Remote { status: 400, ref body } if body == "topic does not exist")
        );

        let connection = store.get_connection("acme").await.unwrap().unwrap();
        assert!(connection.subscription.is_none());
    }

    #[tokio::test]
    async fn test_delete_without_registration_is_noop() {
        let mock_server = MockServer::start().await;
        let (_store, manager) = setup(&mock_server.uri()).await;

        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        manager.delete("acme").await.unwrap();
        manager.delete("unknown-company").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_clears_registration() {
        let mock_server = MockServer::start().await;
        let (store, manager) = setup(&mock_server.uri()).await;

        store
            .set_subscription(
                "acme",
                Some(&Subscription {
                    name: "tenants/t/registrations/r1".to_string(),
                    event_types: vec![],
                    topic: "projects/p/topics/hire".to_string(),
                    renewed_at: Utc::now(),
                }),
            )
            .await
            .unwrap();

        Mock::given(method("DELETE"))
            .and(path("/v1/tenants/t/registrations/r1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&mock_server)
            .await;

        manager.delete("acme").await.unwrap();

        let connection = store.get_connection("acme").await.unwrap().unwrap();
        assert!(connection.subscription.is_none());
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_registration() {
        let mock_server = MockServer::start().await;
        let (store, manager) = setup(&mock_server.uri()).await;

        store
            .set_subscription(
                "acme",
                Some(&Subscription {
                    name: "tenants/t/registrations/r1".to_string(),
                    event_types: vec![],
                    topic: "projects/p/topics/hire".to_string(),
                    renewed_at: Utc::now(),
                }),
            )
            .await
            .unwrap();

        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&mock_server)
            .await;

        let err = manager.delete("acme").await.unwrap_err();
        assert!(matches!(err, SyncError::Transient(msg) if msg.contains("boom")));

        let connection = store.get_connection("acme").await.unwrap().unwrap();
        assert_eq!(
            connection.registration_name(),
            Some("tenants/t/registrations/r1")
        );
    }
}
