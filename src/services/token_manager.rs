//! Access-token lifecycle for hiring platform connections.
//!
//! Every outbound call asks for a token right before it is made. The credential is read
//! from the store each time, so a token refreshed by a concurrent pipeline is picked up and
//! nothing holds on to a token across a blocking call. Concurrent refreshes are allowed to
//! race; the last write wins.

use chrono::Utc;
use std::sync::Arc;

use super::hire_client::HireClient;
use crate::error::SyncError;
use crate::models::Credential;
use crate::store::SyncStore;

#[derive(Clone)]
pub struct TokenManager {
    store: Arc<dyn SyncStore>,
    hire: HireClient,
}

impl TokenManager {
    pub fn new(store: Arc<dyn SyncStore>, hire: HireClient) -> Self {
        Self { store, hire }
    }

    /// Return a non-expired access token for the company, refreshing it if needed.
    pub async fn ensure_valid_token(&self, company_id: &str) -> Result<String, SyncError> {
        self.ensure_valid_token_at(company_id, Utc::now().timestamp())
            .await
    }

    pub async fn ensure_valid_token_at(
        &self,
        company_id: &str,
        now: i64,
    ) -> Result<String, SyncError> {
        let credential = self
            .store
            .get_credential(company_id)
            .await?
            .ok_or_else(|| {
                SyncError::AuthFailure(format!("no credential stored for {}", company_id))
            })?;

        if credential.expires_at > now {
            return Ok(credential.access_token);
        }

        if credential.refresh_token.is_empty() {
            return Err(SyncError::AuthFailure(format!(
                "access token for {} expired and no refresh token is stored",
                company_id
            )));
        }

        log::info!(
            "Access token for {} expired at {}, refreshing",
            company_id,
            credential.expires_at
        );

        let refreshed = self
            .hire
            .refresh_access_token(&credential.refresh_token)
            .await
            .map_err(|e| match e {
                SyncError::Transient(msg) => SyncError::Transient(msg),
                other => SyncError::AuthFailure(format!(
                    "token refresh for {} rejected: {}",
                    company_id, other
                )),
            })?;

        let updated = Credential {
            company_id: credential.company_id,
            access_token: refreshed.access_token,
            refresh_token: refreshed
                .refresh_token
                .filter(|t| !t.is_empty())
                .unwrap_or(credential.refresh_token),
            expires_at: now + refreshed.expires_in,
        };

        self.store.put_credential(&updated).await?;

        log::info!(
            "Refreshed access token for {} (expires at {})",
            company_id,
            updated.expires_at
        );

        Ok(updated.access_token)
    }

    /// Exchange an authorization code and store the resulting credential, replacing any
    /// previous one for the company.
    pub async fn authorize(&self, company_id: &str, code: &str) -> Result<Credential, SyncError> {
        let token = self.hire.exchange_code(code).await.map_err(|e| match e {
            SyncError::Transient(msg) => SyncError::Transient(msg),
            other => SyncError::AuthFailure(format!("code exchange rejected: {}", other)),
        })?;

        let refresh_token = token.refresh_token.filter(|t| !t.is_empty()).ok_or_else(|| {
            SyncError::AuthFailure("code exchange returned no refresh token".to_string())
        })?;

        let credential = Credential {
            company_id: company_id.to_string(),
            access_token: token.access_token,
            refresh_token,
            expires_at: Utc::now().timestamp() + token.expires_in,
        };

        self.store.put_credential(&credential).await?;
        Ok(credential)
    }
}
