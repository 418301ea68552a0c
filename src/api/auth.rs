//! Password sign-in and sign-up
//!
//! Both return `{ok, user, token}` and set the session cookie.

use axum::{
    body::Bytes,
    extract::Extension,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::info;

use super::error::{parse_json_body, ApiError};
use super::AppState;
use crate::common::{PublicUser, User};
use crate::validation::{validate_login, validate_signup};

fn session_response(state: &AppState, user: &User) -> Result<Response, ApiError> {
    let token = state.sessions.issue_for(user)?;
    let cookie = state.sessions.session_cookie(&token);
    let body = json!({
        "ok": true,
        "user": PublicUser::from(user),
        "token": token,
    });
    Ok(([(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

pub async fn password_login(
    Extension(state): Extension<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let raw = parse_json_body(&body, false)?;
    let login = validate_login(&raw)?;

    let user = state.users.authenticate(&login).await?
        .ok_or(ApiError::BadCredentials)?;
    session_response(&state, &user)
}

pub async fn password_signup(
    Extension(state): Extension<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let raw = parse_json_body(&body, false)?;
    let signup = validate_signup(&raw)?;

    let user = state.users.register(signup).await?;
    info!(user_id = user.id, role = %user.role, "Clinician signed up");
    session_response(&state, &user)
}
