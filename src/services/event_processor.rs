//! Synchronization pipeline for one change event.
//!
//! ```text
//! RECEIVED -> FILTERED_OUT | DUPLICATE | ENRICHED -> SYNCHRONIZED | FAILED
//! ```
//!
//! Webhook and poll events both end up here. The dedup check, the HR creation and the
//! ProcessedRecord write for one candidate run under that candidate's lock, so two deliveries
//! of the same notification cannot both pass the dedup check.

use std::sync::Arc;

use super::hire_client::HireClient;
use super::notifier::{Notifier, SyncNotification};
use super::record_creator::RecordCreator;
use super::token_manager::TokenManager;
use crate::error::SyncError;
use crate::models::{Application, CanonicalCandidate, ChangeEvent, EventOrigin};
use crate::store::SyncStore;
use crate::utils::keyed_lock::KeyedLocks;
use crate::utils::telegram::TelegramClient;

#[derive(Clone, Debug, PartialEq)]
pub enum SyncOutcome {
    FilteredOut { reason: String },
    Duplicate { system_id: i64 },
    Synchronized { system_id: i64, created: bool },
}

pub struct EventProcessor {
    store: Arc<dyn SyncStore>,
    tokens: TokenManager,
    hire: HireClient,
    creator: RecordCreator,
    target_stage: String,
    locks: KeyedLocks,
    notifier: Arc<dyn Notifier>,
    alerts: TelegramClient,
}

impl EventProcessor {
    pub fn new(
        store: Arc<dyn SyncStore>,
        tokens: TokenManager,
        hire: HireClient,
        creator: RecordCreator,
        target_stage: String,
        notifier: Arc<dyn Notifier>,
        alerts: TelegramClient,
    ) -> Self {
        Self {
            store,
            tokens,
            hire,
            creator,
            target_stage,
            locks: KeyedLocks::new(),
            notifier,
            alerts,
        }
    }

    /// Run the pipeline and log the outcome. Used by the worker pool and the poller, which
    /// only count results.
    pub async fn handle(&self, event: ChangeEvent) -> Result<SyncOutcome, SyncError> {
        let result = self.process(&event).await;
        match &result {
            Ok(SyncOutcome::FilteredOut { reason }) => {
                log::debug!("{} ({}) filtered out: {}", event.resource, event.origin, reason);
            }
            Ok(SyncOutcome::Duplicate { system_id }) => {
                log::info!(
                    "{} ({}) already synchronized as applicant {}",
                    event.resource,
                    event.origin,
                    system_id
                );
            }
            Ok(SyncOutcome::Synchronized { system_id, created }) => {
                log::info!(
                    "{} ({}) synchronized as applicant {} (created: {})",
                    event.resource,
                    event.origin,
                    system_id,
                    created
                );
            }
            Err(SyncError::Transient(msg)) => {
                log::warn!(
                    "{} ({}) failed with a transient error: {}",
                    event.resource,
                    event.origin,
                    msg
                );
            }
            Err(e) => {
                log::error!("{} ({}) failed: {}", event.resource, event.origin, e);
            }
        }
        result
    }

    pub async fn process(&self, event: &ChangeEvent) -> Result<SyncOutcome, SyncError> {
        let Some(company_id) = self.resolve_company(&event.origin).await? else {
            return Ok(SyncOutcome::FilteredOut {
                reason: "no connection for event origin".to_string(),
            });
        };

        let result = self.process_for_company(&company_id, event).await;

        if let Err(e) = &result {
            if e.needs_operator() {
                self.alerts.alert(&company_id, &event.resource, e).await;
            }
        }

        result
    }

    async fn resolve_company(&self, origin: &EventOrigin) -> Result<Option<String>, SyncError> {
        match origin {
            EventOrigin::Poll { company_id, .. } => Ok(self
                .store
                .get_connection(company_id)
                .await?
                .map(|c| c.company_id)),
            EventOrigin::Webhook { registration, .. } => {
                let connection = self
                    .store
                    .find_connection_by_registration(registration)
                    .await?;
                if connection.is_none() {
                    log::warn!("Notification for unknown registration {}", registration);
                }
                Ok(connection.map(|c| c.company_id))
            }
        }
    }

    async fn process_for_company(
        &self,
        company_id: &str,
        event: &ChangeEvent,
    ) -> Result<SyncOutcome, SyncError> {
        if !event.event_type.is_application_event() {
            return Ok(SyncOutcome::FilteredOut {
                reason: format!("{:?} does not carry a process stage", event.event_type),
            });
        }

        let application = match &event.application {
            Some(application) => application.clone(),
            None => {
                let token = self.tokens.ensure_valid_token(company_id).await?;
                self.hire.get_application(&token, &event.resource).await?
            }
        };

        if !self.is_target_stage(&application) {
            return Ok(SyncOutcome::FilteredOut {
                reason: format!(
                    "stage {:?} is not {}",
                    application.process_stage(),
                    self.target_stage
                ),
            });
        }

        let candidate_id = application.candidate.as_str();
        let guard = self.locks.lock(candidate_id).await;

        if let Some(existing) = self.store.get_processed_record(candidate_id).await? {
            return Ok(SyncOutcome::Duplicate {
                system_id: existing.system_id,
            });
        }

        let token = self.tokens.ensure_valid_token(company_id).await?;
        let remote = self.hire.get_candidate(&token, candidate_id).await?;

        let candidate = match CanonicalCandidate::from_remote(&remote) {
            Ok(candidate) => candidate,
            Err(e) => {
                let name = format!(
                    "{} {}",
                    remote.person_name.given_name, remote.person_name.family_name
                );
                self.notify(company_id, name.trim(), "", Err(&e)).await;
                return Err(e);
            }
        };

        log::debug!("{} enriched as {}", candidate_id, candidate.login());

        let result = self
            .creator
            .create_or_find(candidate_id, &candidate, application.job.as_deref())
            .await;
        drop(guard);

        let display_name = candidate.display_name();
        match result {
            Ok((system_id, created)) => {
                self.notify(company_id, &display_name, &candidate.email, Ok(()))
                    .await;
                Ok(SyncOutcome::Synchronized { system_id, created })
            }
            Err(e) => {
                self.notify(company_id, &display_name, &candidate.email, Err(&e))
                    .await;
                Err(e)
            }
        }
    }

    fn is_target_stage(&self, application: &Application) -> bool {
        application
            .process_stage()
            .map(|stage| stage.eq_ignore_ascii_case(&self.target_stage))
            .unwrap_or(false)
    }

    async fn notify(
        &self,
        company_id: &str,
        candidate_name: &str,
        candidate_email: &str,
        outcome: Result<(), &SyncError>,
    ) {
        let notification = SyncNotification {
            company_id: company_id.to_string(),
            candidate_name: candidate_name.to_string(),
            candidate_email: candidate_email.to_string(),
            succeeded: outcome.is_ok(),
            error: outcome.err().map(|e| e.to_string()),
        };

        if let Err(e) = self.notifier.notify(&notification).await {
            log::warn!(
                "Failed to send outcome notification for {}: {}",
                candidate_name,
                e
            );
        }
    }
}
