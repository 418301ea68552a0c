//! API errors and their HTTP mapping
//!
//! Every failure is a JSON body with an `error` field. Internal details are
//! logged and replaced by a generic message.

use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::{json, Value};

use crate::auth::AuthError;
use crate::collections::ServiceError;
use crate::validation::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthorized,
    #[error("Invalid credentials")]
    BadCredentials,
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Validation(ValidationError),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    /// Detail is logged, never returned
    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn invalid_json() -> Self {
        ApiError::BadRequest("Invalid JSON body".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized | ApiError::BadCredentials => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match &self {
            ApiError::Validation(e) => json!({"error": e.message, "field": e.field}),
            ApiError::Internal(detail) => {
                tracing::error!(%detail, "Request failed");
                json!({"error": self.to_string()})
            }
            other => json!({"error": other.to_string()}),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::NotFound(what) => ApiError::NotFound(format!("{} not found", what)),
            ServiceError::Validation(v) => ApiError::Validation(v),
            ServiceError::Conflict(msg) => ApiError::Conflict(msg),
            ServiceError::Store(store) => ApiError::Internal(store.to_string()),
            ServiceError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingToken | AuthError::InvalidToken(_) => ApiError::Unauthorized,
            AuthError::Crypto(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::Validation(e)
    }
}

/// Parse a request body as JSON; `allow_empty` maps an empty body to `{}`
pub fn parse_json_body(body: &[u8], allow_empty: bool) -> Result<Value, ApiError> {
    if allow_empty && body.iter().all(u8::is_ascii_whitespace) {
        return Ok(json!({}));
    }
    serde_json::from_slice(body).map_err(|_| ApiError::invalid_json())
}
