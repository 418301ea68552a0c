//! Recording endpoints

use axum::{
    body::Bytes,
    extract::Extension,
    http::HeaderMap,
    Json,
};

use super::error::{parse_json_body, ApiError};
use super::AppState;
use crate::collections::Deleted;
use crate::common::Recording;
use crate::validation::validate_id_set;

pub async fn list_recordings(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Recording>>, ApiError> {
    state.require_session(&headers)?;
    Ok(Json(state.recordings.list().await?))
}

/// Body: `{"ids": ["rec-1", ...]}`
pub async fn delete_recordings(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Deleted>, ApiError> {
    state.require_session(&headers)?;
    let raw = parse_json_body(&body, false)?;
    let ids = validate_id_set(&raw)?;
    Ok(Json(state.recordings.remove_many(&ids).await?))
}
