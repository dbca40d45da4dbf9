use super::handlers::{healthz_handler, index_handler};
use crate::{
    auth::{
        access_gate, callback_handler, login_handler, logout_handler, session_handler,
        validate_handler,
    },
    AppState,
};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/healthz", get(healthz_handler))
        .route("/auth/login", get(login_handler))
        .route("/auth/callback", get(callback_handler))
        // POST for form submission, GET for plain links
        .route("/auth/logout", get(logout_handler).post(logout_handler))
        .route("/api/auth/validate", post(validate_handler))
        .route("/api/auth/session", get(session_handler))
        .nest_service("/static", ServeDir::new("static"))
        .layer(middleware::from_fn_with_state(state.clone(), access_gate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
