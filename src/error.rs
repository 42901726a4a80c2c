use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-level error codes returned by the HR system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HrErrorCode {
    DuplicateLogin,
    Other(String),
}

impl HrErrorCode {
    pub fn from_code(code: &str) -> Self {
        match code {
            "DUPLICATE_LOGIN" => HrErrorCode::DuplicateLogin,
            other => HrErrorCode::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            HrErrorCode::DuplicateLogin => "DUPLICATE_LOGIN",
            HrErrorCode::Other(code) => code,
        }
    }
}

#[derive(Debug)]
pub enum SyncError {
    /// Missing, expired or rejected credential. Needs operator attention.
    AuthFailure(String),
    /// Input that does not have the expected shape.
    Malformed(String),
    /// Timeout, connection failure or 5xx from a remote call.
    Transient(String),
    /// Duplicate identity reported by the HR system that could not be resolved by lookup.
    Conflict { code: HrErrorCode, login: String },
    /// Remote data lacks a field required to create a record.
    Unprocessable(String),
    /// Remote creation succeeded but the local dedup record could not be written.
    ReconciliationRequired {
        resource: String,
        system_id: i64,
        detail: String,
    },
    /// Non-retryable remote response, body attached for diagnostics.
    Remote { status: u16, body: String },
    NotFound(String),
    Storage(String),
}

impl SyncError {
    /// Errors that should be raised to an operator, not just logged.
    pub fn needs_operator(&self) -> bool {
        matches!(
            self,
            SyncError::AuthFailure(_) | SyncError::ReconciliationRequired { .. }
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::AuthFailure(_) => "auth_failure",
            SyncError::Malformed(_) => "malformed",
            SyncError::Transient(_) => "transient",
            SyncError::Conflict { .. } => "conflict",
            SyncError::Unprocessable(_) => "unprocessable",
            SyncError::ReconciliationRequired { .. } => "reconciliation_required",
            SyncError::Remote { .. } => "remote",
            SyncError::NotFound(_) => "not_found",
            SyncError::Storage(_) => "storage",
        }
    }

    /// Map a failed `reqwest` call to the error taxonomy.
    pub fn from_transport(context: &str, e: reqwest::Error) -> Self {
        if e.is_decode() {
            SyncError::Malformed(format!("{}: invalid response body: {}", context, e))
        } else {
            SyncError::Transient(format!("{}: {}", context, e))
        }
    }

    /// Map a non-success HTTP status to the error taxonomy.
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        match status.as_u16() {
            401 | 403 => SyncError::AuthFailure(format!(
                "remote rejected credentials ({}): {}",
                status, body
            )),
            429 | 500..=599 => {
                SyncError::Transient(format!("remote returned {}: {}", status, body))
            }
            code => SyncError::Remote { status: code, body },
        }
    }
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::AuthFailure(msg) => write!(f, "Authorization failure: {}", msg),
            SyncError::Malformed(msg) => write!(f, "Malformed input: {}", msg),
            SyncError::Transient(msg) => write!(f, "Transient error: {}", msg),
            SyncError::Conflict { code, login } => write!(
                f,
                "Unresolved {} conflict for login {}",
                code.as_str(),
                login
            ),
            SyncError::Unprocessable(msg) => write!(f, "Unprocessable record: {}", msg),
            SyncError::ReconciliationRequired {
                resource,
                system_id,
                detail,
            } => write!(
                f,
                "Reconciliation required: {} was created as applicant {} but could not be recorded: {}",
                resource, system_id, detail
            ),
            SyncError::Remote { status, body } => {
                write!(f, "Remote API error {}: {}", status, body)
            }
            SyncError::NotFound(msg) => write!(f, "Not found: {}", msg),
            SyncError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for SyncError {}

impl From<sqlx::Error> for SyncError {
    fn from(e: sqlx::Error) -> Self {
        SyncError::Storage(e.to_string())
    }
}

impl IntoResponse for SyncError {
    fn into_response(self) -> Response {
        let status = match &self {
            SyncError::AuthFailure(_) => StatusCode::UNAUTHORIZED,
            SyncError::Malformed(_) => StatusCode::BAD_REQUEST,
            SyncError::NotFound(_) => StatusCode::NOT_FOUND,
            SyncError::Conflict { .. } => StatusCode::CONFLICT,
            SyncError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SyncError::Transient(_) | SyncError::Remote { .. } => StatusCode::BAD_GATEWAY,
            SyncError::ReconciliationRequired { .. } | SyncError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = match &self {
            SyncError::Storage(_) => "Storage error".to_string(),
            _ => self.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "kind": self.kind(),
        }));

        (status, body).into_response()
    }
}
