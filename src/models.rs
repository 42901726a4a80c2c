//! Domain types shared by the store, the remote clients and the sync pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// A company's link to the hiring platform.
#[derive(Clone, Debug, PartialEq)]
pub struct Connection {
    pub company_id: String,
    pub subscription: Option<Subscription>,
    pub last_poll_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Connection {
    pub fn new(company_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            company_id: company_id.into(),
            subscription: None,
            last_poll_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn registration_name(&self) -> Option<&str> {
        self.subscription.as_ref().map(|s| s.name.as_str())
    }
}

/// OAuth token pair for one connection. `expires_at` is unix seconds.
#[derive(Clone, Debug, PartialEq)]
pub struct Credential {
    pub company_id: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
}

/// Push-notification registration on the hiring platform.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub name: String,
    pub event_types: Vec<String>,
    pub topic: String,
    pub renewed_at: DateTime<Utc>,
}

/// A candidate that has already been pushed to the HR system.
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct ProcessedRecord {
    pub resource_id: String,
    pub system_id: i64,
    pub candidate_name: String,
    pub candidate_email: String,
    pub created_at: DateTime<Utc>,
}

/// Notification types published by the hiring platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    CandidateCreate,
    CandidateUpdate,
    ApplicationCreate,
    ApplicationUpdate,
    ApplicationStatusChange,
}

impl EventType {
    pub fn is_application_event(&self) -> bool {
        matches!(
            self,
            EventType::ApplicationCreate
                | EventType::ApplicationUpdate
                | EventType::ApplicationStatusChange
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum EventOrigin {
    Webhook {
        registration: String,
        message_id: String,
    },
    Poll {
        company_id: String,
        watermark: DateTime<Utc>,
    },
}

impl std::fmt::Display for EventOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventOrigin::Webhook { message_id, .. } => write!(f, "webhook message {}", message_id),
            EventOrigin::Poll {
                company_id,
                watermark,
            } => write!(f, "poll of {} at {}", company_id, watermark.to_rfc3339()),
        }
    }
}

/// Unit of work flowing from either ingestion path into the event processor.
#[derive(Clone, Debug)]
pub struct ChangeEvent {
    pub origin: EventOrigin,
    pub event_type: EventType,
    /// Resource name on the hiring platform, e.g. `tenants/t/applications/a1`
    pub resource: String,
    /// Snapshot already fetched by the poller; webhook events fetch it on demand.
    pub application: Option<Application>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationStatus {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub process_stage: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub name: String,
    pub candidate: String,
    #[serde(default)]
    pub job: Option<String>,
    #[serde(default)]
    pub status: ApplicationStatus,
    #[serde(default)]
    pub update_time: Option<DateTime<Utc>>,
}

impl Application {
    pub fn process_stage(&self) -> Option<&str> {
        self.status.process_stage.as_deref()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonName {
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub family_name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostalAddress {
    #[serde(default)]
    pub lines: Vec<String>,
    #[serde(default)]
    pub locality: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
}

/// Candidate detail as returned by the hiring platform.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCandidate {
    pub name: String,
    #[serde(default)]
    pub person_name: PersonName,
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub phone_numbers: Vec<String>,
    #[serde(default)]
    pub postal_addresses: Vec<PostalAddress>,
}

/// Person record in the shape the HR system expects, built from a remote candidate.
#[derive(Clone, Debug, PartialEq)]
pub struct CanonicalCandidate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<PostalAddress>,
}

impl CanonicalCandidate {
    /// Email is the only mandatory field; it doubles as the HR login.
    pub fn from_remote(candidate: &RemoteCandidate) -> Result<Self, SyncError> {
        let email = candidate
            .emails
            .iter()
            .map(|e| e.trim())
            .find(|e| !e.is_empty())
            .ok_or_else(|| {
                SyncError::Unprocessable(format!("candidate {} has no email", candidate.name))
            })?
            .to_string();

        let phone = candidate
            .phone_numbers
            .iter()
            .map(|p| p.trim())
            .find(|p| !p.is_empty())
            .map(str::to_string);

        let address = candidate
            .postal_addresses
            .iter()
            .find(|a| !a.lines.is_empty() || a.locality.is_some())
            .cloned();

        Ok(Self {
            first_name: candidate.person_name.given_name.trim().to_string(),
            last_name: candidate.person_name.family_name.trim().to_string(),
            email,
            phone,
            address,
        })
    }

    pub fn login(&self) -> &str {
        &self.email
    }

    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.email.clone()
        } else {
            full.to_string()
        }
    }
}
