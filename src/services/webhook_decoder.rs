//! Push notification decoding.
//!
//! The platform delivers a Pub/Sub style envelope whose `message.data` is base64 of the real
//! notification JSON. Each layer is decoded into a typed struct and any failure is reported as
//! `SyncError::Malformed`; nothing is partially populated.

use serde::Deserialize;

use crate::error::SyncError;
use crate::models::{ChangeEvent, EventOrigin, EventType};

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PushMessage {
    data: String,
    #[serde(default)]
    message_id: String,
}

#[derive(Deserialize, Debug)]
struct PushEnvelope {
    message: PushMessage,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookNotification {
    pub notification_type: EventType,
    pub registration: String,
    pub resource: String,
    #[serde(skip)]
    pub message_id: String,
}

impl WebhookNotification {
    pub fn into_change_event(self) -> ChangeEvent {
        ChangeEvent {
            origin: EventOrigin::Webhook {
                registration: self.registration,
                message_id: self.message_id,
            },
            event_type: self.notification_type,
            resource: self.resource,
            application: None,
        }
    }
}

pub fn decode_webhook(body: &[u8]) -> Result<WebhookNotification, SyncError> {
    let envelope: PushEnvelope = serde_json::from_slice(body)
        .map_err(|e| SyncError::Malformed(format!("webhook envelope: {}", e)))?;

    let inner = base64::Engine::decode(
        &base64::engine::general_purpose::STANDARD,
        envelope.message.data.trim(),
    )
    .map_err(|e| SyncError::Malformed(format!("webhook data is not base64: {}", e)))?;

    let mut notification: WebhookNotification = serde_json::from_slice(&inner)
        .map_err(|e| SyncError::Malformed(format!("webhook notification: {}", e)))?;

    if notification.registration.is_empty() || notification.resource.is_empty() {
        return Err(SyncError::Malformed(
            "webhook notification without registration or resource".to_string(),
        ));
    }

    notification.message_id = envelope.message.message_id;
    Ok(notification)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(inner: &str) -> Vec<u8> {
        let data = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, inner);
        serde_json::to_vec(&serde_json::json!({
            "message": {
                "data": data,
                "messageId": "m-1",
                "publishTime": "2026-10-14T08:00:00Z"
            },
            "subscription": "projects/p/subscriptions/hire"
        }))
        .unwrap()
    }

    #[test]
    fn test_decode_webhook() {
        let body = envelope(
            r#"{"notificationType":"APPLICATION_STATUS_CHANGE","registration":"tenants/t/registrations/r1","resource":"tenants/t/applications/a1"}"#,
        );

        let notification = decode_webhook(&body).unwrap();
        assert_eq!(
            notification.notification_type,
            EventType::ApplicationStatusChange
        );
        assert_eq!(notification.message_id, "m-1");

        let event = notification.into_change_event();
        assert_eq!(event.resource, "tenants/t/applications/a1");
        assert!(matches!(
            event.origin,
            EventOrigin::Webhook { ref registration, .. } if registration == "tenants/t/registrations/r1"
        ));
    }

    #[test]
    fn test_invalid_envelope_is_malformed() {
        assert!(matches!(
            decode_webhook(b"not json"),
            Err(SyncError::Malformed(_))
        ));
        assert!(matches!(
            decode_webhook(br#"{"subscription":"s"}"#),
            Err(SyncError::Malformed(_))
        ));
    }

    #[test]
    fn test_invalid_base64_is_malformed() {
        let body = br#"{"message":{"data":"%%%not-base64%%%","messageId":"m"}}"#;
        assert!(matches!(decode_webhook(body), Err(SyncError::Malformed(_))));
    }

    #[test]
    fn test_unknown_notification_type_is_malformed() {
        let body = envelope(
            r#"{"notificationType":"JOB_DELETE","registration":"r","resource":"tenants/t/jobs/j1"}"#,
        );
        assert!(matches!(decode_webhook(&body), Err(SyncError::Malformed(_))));
    }

    #[test]
    fn test_missing_resource_is_malformed() {
        let body = envelope(
            r#"{"notificationType":"APPLICATION_UPDATE","registration":"r","resource":""}"#,
        );
        assert!(matches!(decode_webhook(&body), Err(SyncError::Malformed(_))));
    }
}
