//! Authentication handlers for the CAS login, callback, and logout flows
//!
//! This module contains the Axum HTTP handlers for the CAS flow:
//! - `login_handler`: Explicitly starts a CAS login
//! - `callback_handler`: CAS redirects here with `?ticket=`; validates and sets cookies
//! - `validate_handler`: JSON ticket validation for script clients
//! - `logout_handler`: Clears the session cookies, then CAS single sign-out
//! - `session_handler`: Returns the cookie session as JSON

use askama::Template;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use super::gate::cas_login_redirect;
use super::session::{append_cookies, cleared_session_cookies, session_cookies, SessionUser};
use crate::cas::{EnvironmentContext, RequestOrigin, ValidationResult};
use crate::web::templates::CallbackFailureTemplate;
use crate::AppState;

// =============================================================================
// Types
// =============================================================================

#[derive(Deserialize)]
pub struct CallbackParams {
    pub ticket: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    #[serde(default)]
    pub ticket: Option<String>,
}

/// Body of `POST /api/auth/validate`
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ValidateResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidateResponse {
    fn failure(error: impl Into<String>) -> Self {
        ValidateResponse {
            success: false,
            user: None,
            attributes: None,
            error: Some(error.into()),
        }
    }
}

impl From<&ValidationResult> for ValidateResponse {
    fn from(result: &ValidationResult) -> Self {
        match result {
            ValidationResult::Success {
                username,
                attributes,
            } => ValidateResponse {
                success: true,
                user: Some(username.clone()),
                attributes: Some(attributes.clone()),
                error: None,
            },
            ValidationResult::Failure(error) => ValidateResponse::failure(error.to_string()),
        }
    }
}

// =============================================================================
// Internal Helpers
// =============================================================================

/// Redeem a ticket for the environment of the current request
async fn redeem_ticket(
    state: &AppState,
    origin: &RequestOrigin,
    ticket: Option<&str>,
) -> ValidationResult {
    let env = EnvironmentContext::resolve(&state.config, origin);
    state.validator.validate(ticket.unwrap_or_default(), &env).await
}

/// Session cookies for a result: set on success, cleared on any failure
fn cookies_for(state: &AppState, result: &ValidationResult) -> Vec<String> {
    match result {
        ValidationResult::Success {
            username,
            attributes,
        } => session_cookies(&state.config, username, attributes, chrono::Utc::now()),
        ValidationResult::Failure(_) => cleared_session_cookies(&state.config),
    }
}

fn with_cookies(mut response: Response, cookies: &[String]) -> Response {
    match append_cookies(&mut response, cookies) {
        Ok(()) => response,
        Err(e) => *e,
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Login handler - redirects to CAS login for the current environment
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    origin: RequestOrigin,
) -> Response {
    let env = EnvironmentContext::resolve(&state.config, &origin);
    tracing::info!(
        event = "login_requested",
        environment = env.label(),
        service_url = %env.callback_url(),
        "Login requested"
    );
    cas_login_redirect(&env)
}

/// Callback handler - CAS sends the browser here with a service ticket
///
/// Success sets the session cookies and redirects to `/`. Any failure clears
/// the session cookies and renders a page that shows the error and returns
/// to `/` after a countdown, which restarts the login through the gate.
pub async fn callback_handler(
    Query(params): Query<CallbackParams>,
    State(state): State<Arc<AppState>>,
    origin: RequestOrigin,
) -> Response {
    tracing::info!(
        event = "cas_callback",
        has_ticket = params.ticket.is_some(),
        host = %origin.host,
        "CAS callback received"
    );

    let result = redeem_ticket(&state, &origin, params.ticket.as_deref()).await;
    let cookies = cookies_for(&state, &result);

    let response = match &result {
        ValidationResult::Success { username, .. } => {
            tracing::info!(
                event = "session_established",
                user = %username,
                "Authentication successful, redirecting to landing page"
            );
            Redirect::to("/").into_response()
        }
        ValidationResult::Failure(error) => {
            tracing::warn!(
                event = "session_cleared",
                error = %error,
                "Authentication failed, session cookies cleared"
            );
            let template = CallbackFailureTemplate {
                message: error.to_string(),
                redirect_after_secs: state.config.callback_failure_redirect_secs,
            };
            match template.render() {
                Ok(html) => (StatusCode::UNAUTHORIZED, Html(html)).into_response(),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to render callback failure page");
                    (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
                }
            }
        }
    };

    let mut response = with_cookies(response, &cookies);
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

/// Validate handler - `{ticket}` in, `{success, user?, attributes?, error?}` out
///
/// Always answers 200 with the uniform shape, including for unreadable
/// bodies. Cookies are set or cleared exactly as in the callback flow.
pub async fn validate_handler(
    State(state): State<Arc<AppState>>,
    origin: RequestOrigin,
    body: Bytes,
) -> Response {
    let request: ValidateRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "Unreadable validation request body");
            let cookies = cleared_session_cookies(&state.config);
            let response = Json(ValidateResponse::failure(format!(
                "invalid request body: {}",
                e
            )))
            .into_response();
            return with_cookies(response, &cookies);
        }
    };

    let result = redeem_ticket(&state, &origin, request.ticket.as_deref()).await;
    let cookies = cookies_for(&state, &result);

    with_cookies(Json(ValidateResponse::from(&result)).into_response(), &cookies)
}

/// Logout handler - clears the session cookies and hands off to CAS logout
///
/// CAS returns the browser to the service base URL afterwards.
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    origin: RequestOrigin,
) -> Response {
    let env = EnvironmentContext::resolve(&state.config, &origin);
    let logout_url = env.logout_url();

    tracing::info!(
        event = "cas_logout_redirect",
        environment = env.label(),
        service_url = %env.base_service_url,
        "Logout requested, redirecting to CAS logout"
    );

    let location = match super::helpers::header_value(&logout_url) {
        Ok(h) => h,
        Err(e) => return *e,
    };
    let mut response = StatusCode::FOUND.into_response();
    response.headers_mut().insert(header::LOCATION, location);

    with_cookies(response, &cleared_session_cookies(&state.config))
}

/// Session handler - the cookie session as JSON for page scripts
pub async fn session_handler(user: SessionUser) -> Json<SessionUser> {
    Json(user)
}
