//! The uniform response envelope.
//!
//! Every endpoint answers `{Success: true, ...}` or `{Success: false,
//! Errors: {...}}`; authorization and internal failures additionally carry
//! the HTTP code inside the `Errors` object.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use c2ng_core::error::{SessionError, StoreError};

/// Field name → messages, as produced by request validation.
pub type ValidationErrors = BTreeMap<String, Vec<String>>;

/// A failed response carrying a structured `Errors` object.
#[derive(Debug)]
pub struct ApiFailure {
    status: StatusCode,
    errors: Value,
    message: Option<String>,
}

impl ApiFailure {
    /// Domain failure: HTTP 400 with taxonomy codes.
    pub fn domain(errors: Value) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            errors,
            message: None,
        }
    }

    /// Schema validation failure: HTTP 400 with per-field messages.
    pub fn validation(errors: ValidationErrors) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            errors: json!(errors),
            message: None,
        }
    }

    /// Authorization failure: HTTP 403.
    pub fn access_denied() -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            errors: json!({"Access": "denied", "Code": 403}),
            message: None,
        }
    }

    /// Unexpected failure: HTTP 500. The cause is logged, never exposed.
    pub fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            errors: json!({"InternalError": "internal_error", "Code": 500}),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let mut body = json!({
            "Success": false,
            "Errors": self.errors,
        });
        if let Some(message) = self.message {
            body["Message"] = json!(message);
        }
        (self.status, Json(body)).into_response()
    }
}

impl From<SessionError> for ApiFailure {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::ImsiRequired => ApiFailure::domain(json!({"Request": "imsi_required"})),
            SessionError::UssUnavailable(cause) => {
                tracing::warn!(cause, "USSP unavailable");
                ApiFailure::domain(json!({"USS": "provider_unavailable"}))
            }
            SessionError::FlightNotApproved => {
                ApiFailure::domain(json!({"USS": "flight_not_approved"}))
            }
            other => {
                tracing::error!("Session open failed: {other}");
                ApiFailure::internal()
            }
        }
    }
}

impl From<StoreError> for ApiFailure {
    fn from(err: StoreError) -> Self {
        tracing::error!("Store failure: {err}");
        ApiFailure::internal()
    }
}

pub type ApiResult<T> = Result<T, ApiFailure>;

/// Bare `{Success: true}` response.
#[derive(Debug, Serialize)]
pub struct BaseSuccess {
    #[serde(rename = "Success")]
    pub success: bool,
}

impl BaseSuccess {
    pub fn new() -> Self {
        Self { success: true }
    }
}

impl Default for BaseSuccess {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_error_mapping() {
        let failure = ApiFailure::from(SessionError::ImsiRequired);
        assert_eq!(failure.status, StatusCode::BAD_REQUEST);
        assert_eq!(failure.errors, json!({"Request": "imsi_required"}));

        let failure = ApiFailure::from(SessionError::FlightNotApproved);
        assert_eq!(failure.errors, json!({"USS": "flight_not_approved"}));

        let failure = ApiFailure::from(SessionError::UssUnavailable("down".to_string()));
        assert_eq!(failure.errors, json!({"USS": "provider_unavailable"}));
    }

    #[test]
    fn access_denied_carries_the_code() {
        let failure = ApiFailure::access_denied();
        assert_eq!(failure.status, StatusCode::FORBIDDEN);
        assert_eq!(failure.errors, json!({"Access": "denied", "Code": 403}));
    }
}
