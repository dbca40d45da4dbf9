//! Access gate
//!
//! Every request outside the public path prefixes needs a `session_user`
//! cookie. Requests without one are sent to the CAS login page with a
//! `service` pointing back at `/auth/callback` on the current environment.
//! There is no loop protection beyond the public prefixes, which is why
//! `/auth` has to stay public.

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::helpers::header_value;
use super::session::has_session;
use crate::cas::{EnvironmentContext, RequestOrigin};
use crate::AppState;

/// 302 to the CAS login page with caching disabled
pub fn cas_login_redirect(env: &EnvironmentContext) -> Response {
    let login_url = env.login_url();
    let location = match header_value(&login_url) {
        Ok(h) => h,
        Err(e) => return *e,
    };

    let mut response = StatusCode::FOUND.into_response();
    let headers = response.headers_mut();
    headers.insert(header::LOCATION, location);
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    response
}

/// Axum middleware that admits requests with a session and redirects the rest to CAS.
///
/// Wire up with `axum::middleware::from_fn_with_state(state, access_gate)`.
pub async fn access_gate(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    if state.config.is_public_path(&path) || has_session(request.headers()) {
        return next.run(request).await;
    }

    let origin = RequestOrigin::from_request(request.headers(), request.uri());
    let env = EnvironmentContext::resolve(&state.config, &origin);

    tracing::info!(
        event = "cas_login_redirect",
        environment = env.label(),
        host = %origin.host,
        path = %path,
        method = %request.method(),
        service_url = %env.callback_url(),
        "Unauthenticated request, redirecting to CAS login"
    );

    cas_login_redirect(&env)
}
