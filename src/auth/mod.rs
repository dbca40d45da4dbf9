//! Authentication module
//!
//! This module puts the application behind CAS single sign-on.
//!
//! ## Structure
//!
//! - `gate`: Middleware that redirects requests without a session to CAS login
//! - `session`: Cookie-held session (write, clear, read back)
//! - `extractors`: Axum extractors for the session user and the request origin
//! - `helpers`: Pure helper functions (cookie extraction, header values, HTTP client)
//! - `handlers`: HTTP handlers for login, callback, validate, logout and session
//!
//! ## Authentication Flow
//!
//! 1. User visits a protected page without `session_user` → redirect to CAS `/login`
//! 2. CAS authenticates → redirect to `/auth/callback?ticket=ST-...`
//! 3. Gateway validates the ticket via `/serviceValidate` → sets cookies → redirect to `/`
//! 4. User visits `/auth/logout` → cookies cleared → CAS `/logout` → back to the service

pub mod extractors;
pub mod gate;
pub mod handlers;
pub mod helpers;
pub mod session;

// Re-export handlers for convenient routing
pub use handlers::{
    callback_handler, login_handler, logout_handler, session_handler, validate_handler,
    CallbackParams, ValidateRequest, ValidateResponse,
};

pub use extractors::AuthError;
pub use gate::{access_gate, cas_login_redirect};
pub use session::{SessionData, SessionUser, SESSION_DATA_COOKIE, SESSION_USER_COOKIE};
