//! API Layer - JSON endpoints for the clinic datastore
//!
//! Protected handlers check the session before reading the body, so an
//! anonymous request never reaches body parsing or the datastore.

pub mod error;
pub mod middleware;
pub mod patients;
pub mod recordings;
pub mod consultations;
pub mod guest_attempts;
pub mod auth;

pub use error::ApiError;

use std::sync::Arc;
use axum::{
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{Claims, SessionKeys};
use crate::collections::{
    ConsultationService, GuestAttemptService, InsightService, PatientService, RecordingService,
    UserService,
};
use crate::config::{AccessConfig, Config};
use crate::store::Datastore;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionKeys>,
    pub access: Arc<AccessConfig>,
    pub patients: PatientService,
    pub recordings: RecordingService,
    pub consultations: ConsultationService,
    pub insights: InsightService,
    pub guest_attempts: GuestAttemptService,
    pub users: UserService,
}

impl AppState {
    pub fn new(store: Arc<Datastore>, config: &Config) -> Self {
        Self {
            sessions: Arc::new(SessionKeys::new(&config.auth)),
            access: Arc::new(config.access.clone()),
            patients: PatientService::new(store.clone()),
            recordings: RecordingService::new(store.clone()),
            consultations: ConsultationService::new(store.clone()),
            insights: InsightService::new(store.clone()),
            guest_attempts: GuestAttemptService::new(store.clone()),
            users: UserService::new(store),
        }
    }

    /// Verified session claims, or `ApiError::Unauthorized`
    pub fn require_session(&self, headers: &HeaderMap) -> Result<Claims, ApiError> {
        Ok(self.sessions.authenticate(headers)?)
    }
}

/// Create the main API router
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/patients", get(patients::list_patients).post(patients::create_patient))
        .route("/patients/:id", put(patients::update_patient).delete(patients::delete_patient))
        .route("/recordings", get(recordings::list_recordings).delete(recordings::delete_recordings))
        .route("/consultations", get(consultations::list_consultations))
        .route("/clinical-insights", get(consultations::list_insights))
        .route(
            "/guest-attempts",
            get(guest_attempts::list_guest_attempts)
                .post(guest_attempts::create_guest_attempt)
                .delete(guest_attempts::clear_guest_attempts),
        )
        .route("/auth/password-login", post(auth::password_login))
        .route("/auth/password-signup", post(auth::password_signup));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .fallback(not_found)
        .layer(axum::middleware::from_fn(middleware::access_middleware))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
}

async fn health_check() -> &'static str {
    "OK"
}

async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::NOT_FOUND, Json(json!({"error": "Not found"})))
}
