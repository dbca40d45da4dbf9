use super::templates::IndexTemplate;
use crate::auth::SessionUser;
use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};

/// Liveness probe - always returns OK if the process is running
pub async fn healthz_handler() -> impl IntoResponse {
    StatusCode::OK
}

/// Landing page behind the access gate
pub async fn index_handler(user: SessionUser) -> impl IntoResponse {
    let mut attributes: Vec<(String, String)> = user.attributes.into_iter().collect();
    attributes.sort();

    tracing::debug!(
        user = %user.username,
        attribute_count = attributes.len(),
        "Rendering landing page"
    );

    let template = IndexTemplate {
        username: user.username,
        attributes,
        login_time: user
            .login_time
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
    };

    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render landing page");
            (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
        }
    }
}
