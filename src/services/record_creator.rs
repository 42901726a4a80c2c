use chrono::Utc;
use std::sync::Arc;

use super::hr_client::{ApplicantRecord, HrClient};
use crate::error::{HrErrorCode, SyncError};
use crate::models::{CanonicalCandidate, ProcessedRecord};
use crate::store::SyncStore;

/// Idempotent applicant creation in the HR system plus the local dedup record.
#[derive(Clone)]
pub struct RecordCreator {
    hr: HrClient,
    store: Arc<dyn SyncStore>,
}

impl RecordCreator {
    pub fn new(hr: HrClient, store: Arc<dyn SyncStore>) -> Self {
        Self { hr, store }
    }

    /// Create the applicant (or adopt the existing one on a duplicate login), record it under
    /// `resource_id`, then link it to `job`.
    ///
    /// Returns the HR id and whether this call created it.
    pub async fn create_or_find(
        &self,
        resource_id: &str,
        candidate: &CanonicalCandidate,
        job: Option<&str>,
    ) -> Result<(i64, bool), SyncError> {
        let record = ApplicantRecord::from(candidate);

        let (system_id, created) = match self.hr.create_applicant(&record).await {
            Ok(id) => (id, true),
            Err(SyncError::Conflict {
                code: HrErrorCode::DuplicateLogin,
                login,
            }) => match self.hr.find_applicant_by_login(&login).await? {
                Some(id) => {
                    log::info!(
                        "Applicant with login {} already exists as {}, reusing it",
                        login,
                        id
                    );
                    (id, false)
                }
                None => {
                    log::error!(
                        "HR system reported duplicate login {} but lookup found nothing; manual reconciliation needed for {}",
                        login,
                        resource_id
                    );
                    return Err(SyncError::Conflict {
                        code: HrErrorCode::DuplicateLogin,
                        login,
                    });
                }
            },
            Err(e) => return Err(e),
        };

        self.persist(resource_id, candidate, system_id).await?;

        if let Some(job) = job {
            if let Err(e) = self.hr.link_applicant_to_job(system_id, job).await {
                log::warn!(
                    "Applicant {} synchronized but linking to job {} failed: {}",
                    system_id,
                    job,
                    e
                );
            }
        }

        Ok((system_id, created))
    }

    async fn persist(
        &self,
        resource_id: &str,
        candidate: &CanonicalCandidate,
        system_id: i64,
    ) -> Result<(), SyncError> {
        let record = ProcessedRecord {
            resource_id: resource_id.to_string(),
            system_id,
            candidate_name: candidate.display_name(),
            candidate_email: candidate.email.clone(),
            created_at: Utc::now(),
        };

        let reconciliation = |detail: String| {
            log::error!(
                "RECONCILIATION REQUIRED: {} exists in the HR system as {} but was not recorded: {}",
                resource_id,
                system_id,
                detail
            );
            SyncError::ReconciliationRequired {
                resource: resource_id.to_string(),
                system_id,
                detail,
            }
        };

        match self.store.insert_processed_record(&record).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                // Another process recorded this resource first.
                match self.store.get_processed_record(resource_id).await {
                    Ok(Some(existing)) if existing.system_id == system_id => Ok(()),
                    Ok(Some(existing)) => Err(reconciliation(format!(
                        "already recorded as applicant {}",
                        existing.system_id
                    ))),
                    Ok(None) => Err(reconciliation(
                        "insert reported an existing record that cannot be read".to_string(),
                    )),
                    Err(e) => Err(reconciliation(e.to_string())),
                }
            }
            Err(e) => Err(reconciliation(e.to_string())),
        }
    }
}
