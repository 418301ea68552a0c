//! Patient endpoints

use axum::{
    body::Bytes,
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    Json,
};

use super::error::{parse_json_body, ApiError};
use super::AppState;
use crate::collections::Deleted;
use crate::common::Patient;

fn parse_patient_id(raw: &str) -> Result<u64, ApiError> {
    raw.parse::<u64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::BadRequest("Invalid patient id".to_string()))
}

pub async fn list_patients(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Patient>>, ApiError> {
    state.require_session(&headers)?;
    Ok(Json(state.patients.list().await?))
}

pub async fn create_patient(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    state.require_session(&headers)?;
    let raw = parse_json_body(&body, false)?;
    let patient = state.patients.create(&raw).await?;
    Ok((StatusCode::CREATED, Json(patient)))
}

pub async fn update_patient(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Patient>, ApiError> {
    state.require_session(&headers)?;
    let id = parse_patient_id(&id)?;
    let raw = parse_json_body(&body, false)?;
    Ok(Json(state.patients.update(id, &raw).await?))
}

pub async fn delete_patient(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    state.require_session(&headers)?;
    let id = parse_patient_id(&id)?;
    let deleted = state.patients.remove(id).await?;
    if deleted.removed == 0 {
        return Err(ApiError::NotFound("Patient not found".to_string()));
    }
    Ok(Json(deleted))
}
