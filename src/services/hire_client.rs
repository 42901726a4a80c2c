//! Client for the hiring platform: OAuth token endpoint, resource reads, push registrations
//! and the application change listing.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::models::{Application, RemoteCandidate};

/// Response from the OAuth token endpoint
#[derive(Deserialize, Clone, Debug)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime of `access_token` in seconds
    pub expires_in: i64,
    /// Only present for `authorization_code` grants or when the platform rotates it
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CreateRegistrationRequest<'a> {
    topic: &'a str,
    event_types: &'a [String],
}

/// Registration returned by the create call
#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub name: String,
    #[serde(default)]
    pub event_types: Vec<String>,
    #[serde(default)]
    pub topic: Option<String>,
}

/// One page of the application change listing
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationPage {
    #[serde(default)]
    pub applications: Vec<Application>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Clone)]
pub struct HireClient {
    http_client: Client,
    api_base_url: String,
    token_url: String,
    client_id: String,
    client_secret: String,
    redirect_url: String,
}

impl HireClient {
    pub fn new(
        http_client: Client,
        api_base_url: String,
        token_url: String,
        client_id: String,
        client_secret: String,
        redirect_url: String,
    ) -> Self {
        Self {
            http_client,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            token_url,
            client_id,
            client_secret,
            redirect_url,
        }
    }

    fn resource_url(&self, name: &str) -> String {
        format!("{}/v1/{}", self.api_base_url, name.trim_start_matches('/'))
    }

    /// `grant_type=refresh_token`
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenResponse, SyncError> {
        log::debug!("Refreshing hiring platform access token");

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SyncError::from_transport("token refresh", e))?;

        read_json("token refresh", response).await
    }

    /// `grant_type=authorization_code`
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, SyncError> {
        let response = self
            .http_client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_url.as_str()),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SyncError::from_transport("code exchange", e))?;

        read_json("code exchange", response).await
    }

    pub async fn get_application(
        &self,
        access_token: &str,
        name: &str,
    ) -> Result<Application, SyncError> {
        let response = self
            .http_client
            .get(self.resource_url(name))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| SyncError::from_transport("get application", e))?;

        read_json("get application", response).await
    }

    pub async fn get_candidate(
        &self,
        access_token: &str,
        name: &str,
    ) -> Result<RemoteCandidate, SyncError> {
        let response = self
            .http_client
            .get(self.resource_url(name))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| SyncError::from_transport("get candidate", e))?;

        read_json("get candidate", response).await
    }

    /// Create a push registration. Repeating the call renews it.
    pub async fn create_registration(
        &self,
        access_token: &str,
        tenant: &str,
        topic: &str,
        event_types: &[String],
    ) -> Result<RegistrationResponse, SyncError> {
        let url = format!("{}/registrations", self.resource_url(tenant));

        log::info!(
            "Creating hiring platform registration: tenant={}, topic={}, events={:?}",
            tenant,
            topic,
            event_types
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(access_token)
            .json(&CreateRegistrationRequest { topic, event_types })
            .send()
            .await
            .map_err(|e| SyncError::from_transport("create registration", e))?;

        read_json("create registration", response).await
    }

    pub async fn delete_registration(
        &self,
        access_token: &str,
        name: &str,
    ) -> Result<(), SyncError> {
        let response = self
            .http_client
            .delete(self.resource_url(name))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| SyncError::from_transport("delete registration", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::error!(
                "Hiring platform error deleting registration {}: status={}, body={}",
                name,
                status.as_u16(),
                body
            );
            return Err(SyncError::from_status(status, body));
        }
        Ok(())
    }

    pub async fn list_applications(
        &self,
        access_token: &str,
        tenant: &str,
        filter: &str,
        page_token: Option<&str>,
    ) -> Result<ApplicationPage, SyncError> {
        let url = format!("{}/applications", self.resource_url(tenant));

        let mut query = vec![("filter", filter)];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(access_token)
            .query(&query)
            .send()
            .await
            .map_err(|e| SyncError::from_transport("list applications", e))?;

        read_json("list applications", response).await
    }
}

async fn read_json<T: DeserializeOwned>(
    context: &str,
    response: reqwest::Response,
) -> Result<T, SyncError> {
    let status = response.status();

    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        log::warn!(
            "Hiring platform error during {}: status={}, body={}",
            context,
            status.as_u16(),
            body
        );

        return Err(SyncError::from_status(status, body));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| SyncError::from_transport(context, e))
}
