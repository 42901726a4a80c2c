use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{HrErrorCode, SyncError};
use crate::models::CanonicalCandidate;

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantAddress {
    pub street: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Applicant creation payload
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantRecord {
    /// The HR system identifies applicants by login; we use the candidate's email
    pub login: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<ApplicantAddress>,
}

impl From<&CanonicalCandidate> for ApplicantRecord {
    fn from(candidate: &CanonicalCandidate) -> Self {
        Self {
            login: candidate.login().to_string(),
            email: candidate.email.clone(),
            first_name: candidate.first_name.clone(),
            last_name: candidate.last_name.clone(),
            phone: candidate.phone.clone(),
            address: candidate.address.as_ref().map(|a| ApplicantAddress {
                street: a.lines.join(", "),
                city: a.locality.clone(),
                region: a.region.clone(),
                postal_code: a.postal_code.clone(),
                country: a.country_code.clone(),
            }),
        }
    }
}

#[derive(Deserialize, Debug)]
struct CreatedApplicant {
    id: i64,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct HrErrorBody {
    error_code: String,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize, Debug)]
struct ApplicantSummary {
    id: i64,
    login: String,
}

#[derive(Deserialize, Debug)]
struct ApplicantList {
    #[serde(default)]
    applicants: Vec<ApplicantSummary>,
}

/// HR system of record API client
#[derive(Clone)]
pub struct HrClient {
    http_client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HrClient {
    pub fn new(http_client: Client, base_url: String, api_key: Option<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .http_client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => builder.header("x-api-key", key),
            None => builder,
        }
    }

    /// Create an applicant and return its id.
    ///
    /// A `DUPLICATE_LOGIN` answer comes back as `SyncError::Conflict` so callers can
    /// recover by looking the applicant up.
    pub async fn create_applicant(&self, record: &ApplicantRecord) -> Result<i64, SyncError> {
        log::info!("Creating HR applicant for login {}", record.login);

        let response = self
            .request(reqwest::Method::POST, "/applicants")
            .json(record)
            .send()
            .await
            .map_err(|e| SyncError::from_transport("create applicant", e))?;

        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            if let Ok(error) = serde_json::from_str::<HrErrorBody>(&body) {
                let code = HrErrorCode::from_code(&error.error_code);
                if code == HrErrorCode::DuplicateLogin {
                    log::info!(
                        "HR system reports duplicate login {}: {}",
                        record.login,
                        error.message
                    );
                    return Err(SyncError::Conflict {
                        code,
                        login: record.login.clone(),
                    });
                }
            }

            log::error!(
                "HR API error creating applicant: status={}, body={}",
                status.as_u16(),
                body
            );
            return Err(SyncError::from_status(status, body));
        }

        let created: CreatedApplicant = response
            .json()
            .await
            .map_err(|e| SyncError::from_transport("create applicant", e))?;

        Ok(created.id)
    }

    /// Exact (case-insensitive) login match, or `None`.
    pub async fn find_applicant_by_login(&self, login: &str) -> Result<Option<i64>, SyncError> {
        let response = self
            .request(reqwest::Method::GET, "/applicants")
            .query(&[("login", login)])
            .send()
            .await
            .map_err(|e| SyncError::from_transport("find applicant", e))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::from_status(status, body));
        }

        let list: ApplicantList = response
            .json()
            .await
            .map_err(|e| SyncError::from_transport("find applicant", e))?;

        Ok(list
            .applicants
            .into_iter()
            .find(|a| a.login.eq_ignore_ascii_case(login))
            .map(|a| a.id))
    }

    pub async fn link_applicant_to_job(
        &self,
        applicant_id: i64,
        job_reference: &str,
    ) -> Result<(), SyncError> {
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/applicants/{}/jobs", applicant_id),
            )
            .json(&serde_json::json!({ "jobReference": job_reference }))
            .send()
            .await
            .map_err(|e| SyncError::from_transport("link applicant", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::from_status(status, body));
        }
        Ok(())
    }
}
