//! Outcome notifications.
//!
//! The pipeline reports every synchronization result through [`Notifier`]. Delivery is the
//! notifier's business: errors are logged by the caller and never change the sync outcome.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncNotification {
    pub company_id: String,
    pub candidate_name: String,
    pub candidate_email: String,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncNotification {
    pub fn subject(&self) -> String {
        if self.succeeded {
            format!("Candidate {} synchronized", self.candidate_name)
        } else {
            format!("Candidate {} could not be synchronized", self.candidate_name)
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        notification: &SyncNotification,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Posts outcomes to an HTTP mail relay. Unconfigured relays only log.
#[derive(Clone)]
pub struct MailRelayNotifier {
    http_client: Client,
    relay: Option<(String, String)>,
    api_key: Option<String>,
}

impl MailRelayNotifier {
    pub fn new(
        http_client: Client,
        relay_url: Option<String>,
        api_key: Option<String>,
        recipient: Option<String>,
    ) -> Self {
        Self {
            http_client,
            relay: relay_url.zip(recipient),
            api_key,
        }
    }
}

#[async_trait]
impl Notifier for MailRelayNotifier {
    async fn notify(
        &self,
        notification: &SyncNotification,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let Some((relay_url, recipient)) = &self.relay else {
            log::warn!(
                "Mail relay not configured. Please set MAIL_RELAY_URL and NOTIFICATION_RECIPIENT. Notification ignored: {}",
                notification.subject()
            );
            return Ok(());
        };

        let mut request = self.http_client.post(relay_url).json(&serde_json::json!({
            "to": recipient,
            "subject": notification.subject(),
            "outcome": notification,
        }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Mail relay returned {}: {}", status, body).into());
        }
        Ok(())
    }
}

/// Keeps notifications in memory. Test double for the unit and integration tests, not
/// wired into [`crate::AppState::new`].
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<SyncNotification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<SyncNotification> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        notification: &SyncNotification,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.sent.lock().await.push(notification.clone());
        Ok(())
    }
}
