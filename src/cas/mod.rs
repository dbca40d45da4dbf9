//! CAS protocol client
//!
//! This module speaks CAS 2.0 to the upstream identity server.
//!
//! ## Structure
//!
//! - `environment`: per-request classification (local development vs production)
//!   and the service URL derived from it
//! - `urls`: login, logout and serviceValidate URL builders
//! - `parser`: `serviceValidate` XML response parser
//! - `validator`: the outbound `serviceValidate` call
//!
//! ## Service URL
//!
//! CAS binds a ticket to the exact `service` string presented at login. Both
//! the login redirect and ticket validation take that string from
//! [`EnvironmentContext::callback_url`], so the two can never drift apart.

pub mod environment;
pub mod parser;
pub mod urls;
pub mod validator;

pub use environment::{is_local_development, EnvironmentContext, RequestOrigin};
pub use parser::parse_service_response;
pub use urls::{
    build_callback_url, build_cas_login_url, build_cas_logout_url, build_service_validate_url,
    CALLBACK_PATH,
};
pub use validator::TicketValidator;

use std::collections::HashMap;

/// Why a ticket did not produce a user
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing ticket")]
    MissingTicket,
    #[error("HTTP error: {0}")]
    HttpError(u16),
    /// CAS answered with `authenticationFailure`
    #[error("{message}")]
    CasFailure {
        code: Option<String>,
        message: String,
    },
    #[error("invalid CAS response: {0}")]
    ParseAnomaly(String),
    #[error("network error: {0}")]
    NetworkError(String),
}

/// Outcome of redeeming one service ticket
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    Success {
        username: String,
        attributes: HashMap<String, String>,
    },
    Failure(ValidationError),
}

impl ValidationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ValidationResult::Success { .. })
    }
}
