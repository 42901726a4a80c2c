//! Connection lifecycle endpoints: OAuth authorization, deauthorization, manual renewal and
//! manual poll.

use axum::{
    Json,
    extract::{Path, Query, State},
    response::Redirect,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::AppState;
use crate::error::SyncError;
use crate::models::Subscription;
use crate::services::PollSummary;

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionResponse {
    pub company_id: String,
    pub authorized: bool,
    pub registration: Option<Subscription>,
    pub last_poll_at: Option<chrono::DateTime<chrono::Utc>>,
}

pub async fn get_connection(
    State(state): State<Arc<AppState>>,
    Path(company_id): Path<String>,
) -> Result<Json<ConnectionResponse>, SyncError> {
    let connection = state
        .store
        .get_connection(&company_id)
        .await?
        .ok_or_else(|| SyncError::NotFound(format!("connection {}", company_id)))?;
    let authorized = state.store.get_credential(&company_id).await?.is_some();

    Ok(Json(ConnectionResponse {
        company_id: connection.company_id,
        authorized,
        registration: connection.subscription,
        last_poll_at: connection.last_poll_at,
    }))
}

/// Start the OAuth consent flow for a company.
pub async fn authorize(
    State(state): State<Arc<AppState>>,
    Path(company_id): Path<String>,
) -> Result<Redirect, SyncError> {
    let oauth_state = hex::encode(rand::random::<[u8; 16]>());
    state
        .pending_authorizations
        .insert(oauth_state.clone(), company_id.clone())
        .await;

    let env = &state.env_vars;
    let url = reqwest::Url::parse_with_params(
        &env.hire_authorize_url,
        &[
            ("response_type", "code"),
            ("client_id", env.hire_client_id.as_str()),
            ("redirect_uri", env.hire_redirect_url.as_str()),
            ("scope", env.hire_oauth_scopes.as_str()),
            ("access_type", "offline"),
            ("prompt", "consent"),
            ("state", oauth_state.as_str()),
        ],
    )
    .map_err(|e| SyncError::Malformed(format!("invalid authorize URL: {}", e)))?;

    log::info!("Starting authorization for company {}", company_id);
    Ok(Redirect::to(url.as_str()))
}

#[derive(Deserialize, Debug)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// OAuth redirect target. Stores the credential and registers for push notifications.
///
/// A failed registration does not undo the authorization; the poller still covers the
/// connection and the registration can be retried through the renewal endpoint.
pub async fn oauth_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackQuery>,
) -> Result<Json<Value>, SyncError> {
    if let Some(error) = params.error {
        return Err(SyncError::AuthFailure(format!(
            "authorization declined: {}",
            error
        )));
    }

    let oauth_state = params
        .state
        .ok_or_else(|| SyncError::Malformed("missing state parameter".to_string()))?;
    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| SyncError::Malformed("missing code parameter".to_string()))?;

    let company_id = state
        .pending_authorizations
        .remove(&oauth_state)
        .await
        .ok_or_else(|| {
            SyncError::Malformed("unknown or expired authorization state".to_string())
        })?;

    state.store.upsert_connection(&company_id).await?;
    state.tokens.authorize(&company_id, &code).await?;
    log::info!("Company {} authorized", company_id);

    match state.subscriptions.create_or_renew(&company_id).await {
        Ok(subscription) => Ok(Json(json!({
            "companyId": company_id,
            "registration": subscription,
        }))),
        Err(e) => {
            log::error!(
                "Company {} authorized but registration failed: {}",
                company_id,
                e
            );
            Ok(Json(json!({
                "companyId": company_id,
                "registration": null,
                "registrationError": e.to_string(),
            })))
        }
    }
}

/// Tear down the registration, then drop the credential.
pub async fn deauthorize(
    State(state): State<Arc<AppState>>,
    Path(company_id): Path<String>,
) -> Result<Json<Value>, SyncError> {
    if state.store.get_connection(&company_id).await?.is_none() {
        return Err(SyncError::NotFound(format!("connection {}", company_id)));
    }

    state.subscriptions.delete(&company_id).await?;
    state.store.delete_credential(&company_id).await?;

    log::info!("Company {} deauthorized", company_id);
    Ok(Json(json!({ "companyId": company_id, "deauthorized": true })))
}

pub async fn renew_subscription(
    State(state): State<Arc<AppState>>,
    Path(company_id): Path<String>,
) -> Result<Json<Subscription>, SyncError> {
    let subscription = state.subscriptions.create_or_renew(&company_id).await?;
    Ok(Json(subscription))
}

pub async fn trigger_poll(
    State(state): State<Arc<AppState>>,
    Path(company_id): Path<String>,
) -> Result<Json<PollSummary>, SyncError> {
    let summary = state
        .poller
        .run_cycle(&state.processor, &company_id)
        .await?;
    Ok(Json(summary))
}
