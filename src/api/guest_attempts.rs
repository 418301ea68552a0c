//! Guest attempt endpoints. No session required: these count anonymous use.

use axum::{
    body::Bytes,
    extract::Extension,
    http::StatusCode,
    Json,
};

use super::error::{parse_json_body, ApiError};
use super::AppState;
use crate::collections::Deleted;
use crate::common::GuestAttempt;

pub async fn list_guest_attempts(
    Extension(state): Extension<AppState>,
) -> Result<Json<Vec<GuestAttempt>>, ApiError> {
    Ok(Json(state.guest_attempts.list().await?))
}

pub async fn create_guest_attempt(
    Extension(state): Extension<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<GuestAttempt>), ApiError> {
    let raw = parse_json_body(&body, true)?;
    let attempt = state.guest_attempts.create(&raw).await?;
    Ok((StatusCode::CREATED, Json(attempt)))
}

pub async fn clear_guest_attempts(
    Extension(state): Extension<AppState>,
) -> Result<Json<Deleted>, ApiError> {
    Ok(Json(state.guest_attempts.clear().await?))
}
