use crate::auth::session::{read_session, SessionUser};
use crate::cas::RequestOrigin;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::convert::Infallible;

/// Custom authentication error type
#[derive(Debug)]
pub enum AuthError {
    Unauthenticated(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::Unauthenticated(msg) => (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "Authentication required",
                    "message": msg,
                    "code": "UNAUTHENTICATED"
                })),
            )
                .into_response(),
        }
    }
}

/// Authenticated user extractor - reads the session cookies
///
/// Fails with `AuthError` when `session_user` is absent. Page routes are
/// already covered by the access gate; API routes under `/api` are not, so
/// they rely on this rejection instead.
///
/// Usage:
/// ```rust,ignore
/// async fn handler(user: SessionUser) {
///     println!("User: {}, attributes: {:?}", user.username, user.attributes);
/// }
/// ```
impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = read_session(&parts.headers).ok_or_else(|| {
            AuthError::Unauthenticated("Missing session_user cookie".to_string())
        })?;

        tracing::debug!(
            user = %session.username,
            attribute_count = session.attributes.len(),
            "User authenticated via cookie"
        );

        Ok(session)
    }
}

/// Scheme and host of the current request, used to resolve the CAS service URL
impl<S> FromRequestParts<S> for RequestOrigin
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestOrigin::from_request(&parts.headers, &parts.uri))
    }
}
