//! API Middleware - Page access gating and request ids

use axum::{
    extract::{Extension, Request},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use super::AppState;
use crate::config::AccessConfig;

/// Outcome of the page access check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Pass,
    /// Protected page without a session; target carries `callbackUrl`
    RedirectToLogin(String),
    /// Sign-in page with a session
    RedirectToLanding(String),
}

/// Prefix match: the exact path, or the prefix followed by `/...`
pub fn path_matches(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

pub fn classify(
    access: &AccessConfig,
    path: &str,
    query: Option<&str>,
    has_session: bool,
) -> AccessDecision {
    // API handlers answer 401 themselves
    if path_matches(path, "/api") {
        return AccessDecision::Pass;
    }

    if !has_session && access.protected_prefixes.iter().any(|p| path_matches(path, p)) {
        let destination = match query {
            Some(q) if !q.is_empty() => format!("{}?{}", path, q),
            _ => path.to_string(),
        };
        let callback = serde_urlencoded::to_string(&[("callbackUrl", destination.as_str())])
            .unwrap_or_default();
        return AccessDecision::RedirectToLogin(format!("{}?{}", access.login_path, callback));
    }

    if has_session && access.auth_routes.iter().any(|p| path_matches(path, p)) {
        return AccessDecision::RedirectToLanding(access.landing_path.clone());
    }

    AccessDecision::Pass
}

/// Redirects anonymous visitors away from protected pages and signed-in
/// users away from the sign-in pages
pub async fn access_middleware(
    Extension(state): Extension<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let has_session = state.require_session(request.headers()).is_ok();
    let decision = classify(&state.access, request.uri().path(), request.uri().query(), has_session);

    match decision {
        AccessDecision::Pass => next.run(request).await,
        AccessDecision::RedirectToLogin(target) | AccessDecision::RedirectToLanding(target) => {
            debug!(path = %request.uri().path(), %target, "Access redirect");
            Redirect::temporary(&target).into_response()
        }
    }
}

/// Request ID middleware
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let header_value = HeaderValue::from_str(&request_id).ok();

    if let Some(value) = header_value.clone() {
        request.headers_mut().insert("X-Request-ID", value);
    }

    let mut response = next.run(request).await;

    if let Some(value) = header_value {
        response.headers_mut().insert("X-Request-ID", value);
    }

    response
}
