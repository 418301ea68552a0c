//! Consultation and clinical insight endpoints (read-only)

use std::collections::HashMap;
use axum::{
    extract::{Extension, Query},
    http::HeaderMap,
    Json,
};

use super::error::ApiError;
use super::AppState;
use crate::common::{ClinicalInsight, Consultation};

/// Optional `?patientId=` filter
pub async fn list_consultations(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Consultation>>, ApiError> {
    state.require_session(&headers)?;
    let consultations = match params.get("patientId") {
        Some(raw) => {
            let patient_id = raw.parse::<u64>()
                .map_err(|_| ApiError::BadRequest("Invalid patientId".to_string()))?;
            state.consultations.list_for_patient(patient_id).await?
        }
        None => state.consultations.list().await?,
    };
    Ok(Json(consultations))
}

pub async fn list_insights(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ClinicalInsight>>, ApiError> {
    state.require_session(&headers)?;
    Ok(Json(state.insights.list().await?))
}
