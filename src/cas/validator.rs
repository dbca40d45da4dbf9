//! Service ticket redemption against CAS `serviceValidate`

use super::environment::EnvironmentContext;
use super::parser::parse_service_response;
use super::urls::build_service_validate_url;
use super::{ValidationError, ValidationResult};
use crate::auth::helpers::create_http_client;
use crate::config::Config;

const ACCEPT_XML: &str = "application/xml, text/xml, */*";
const USER_AGENT: &str = concat!("cas-gateway/", env!("CARGO_PKG_VERSION"));

/// Redeems service tickets. Holds only a pooled HTTP client, so one
/// instance is shared by all requests.
pub struct TicketValidator {
    client: reqwest::Client,
}

impl TicketValidator {
    /// Create a validator whose CAS calls use explicit timeouts
    pub fn new(connect_timeout_secs: u64, request_timeout_secs: u64) -> Result<Self, String> {
        let client = create_http_client(connect_timeout_secs, request_timeout_secs)
            .map_err(|e| format!("Failed to build HTTP client for serviceValidate: {}", e))?;

        tracing::info!(
            connect_timeout_secs = connect_timeout_secs,
            request_timeout_secs = request_timeout_secs,
            "Ticket validator initialized"
        );

        Ok(Self { client })
    }

    pub fn from_config(config: &Config) -> Result<Self, String> {
        Self::new(
            config.http_connect_timeout_secs,
            config.http_request_timeout_secs,
        )
    }

    /// Redeem `ticket` for the service URL of `env`.
    ///
    /// The service URL is `env.callback_url()`, the same string the login
    /// redirect sent to CAS. Makes at most one request and never retries.
    pub async fn validate(&self, ticket: &str, env: &EnvironmentContext) -> ValidationResult {
        let ticket = ticket.trim();
        if ticket.is_empty() {
            tracing::warn!(event = "cas_validate_missing_ticket", "No ticket to validate");
            return ValidationResult::Failure(ValidationError::MissingTicket);
        }

        let service_url = env.callback_url();
        let url = build_service_validate_url(&env.cas_server, &service_url, ticket);

        // Do not log the ticket or the full URL; a ticket is a bearer credential until redeemed
        tracing::info!(
            event = "cas_validate_request",
            environment = env.label(),
            cas_server = %env.cas_server,
            service_url = %service_url,
            ticket_len = ticket.len(),
            "Validating service ticket"
        );

        let response = match self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, ACCEPT_XML)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    event = "cas_validate_network_error",
                    cas_server = %env.cas_server,
                    error = %e,
                    "serviceValidate request failed"
                );
                return ValidationResult::Failure(ValidationError::NetworkError(e.to_string()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                event = "cas_validate_http_error",
                status = %status,
                "CAS returned a non-success status"
            );
            return ValidationResult::Failure(ValidationError::HttpError(status.as_u16()));
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(
                    event = "cas_validate_body_error",
                    error = %e,
                    "Failed to read serviceValidate response body"
                );
                return ValidationResult::Failure(ValidationError::NetworkError(e.to_string()));
            }
        };

        tracing::debug!(body_len = body.len(), "serviceValidate response received");

        let result = parse_service_response(&body);
        match &result {
            ValidationResult::Success {
                username,
                attributes,
            } => tracing::info!(
                event = "cas_validate_success",
                user = %username,
                attribute_count = attributes.len(),
                "Ticket validated"
            ),
            ValidationResult::Failure(error) => tracing::warn!(
                event = "cas_validate_failure",
                error = %error,
                "Ticket rejected"
            ),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, http::StatusCode, routing::get, Router};
    use std::collections::HashMap;

    const SUCCESS_XML: &str = r#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
        <cas:authenticationSuccess>
            <cas:user>alice</cas:user>
            <cas:attributes><cas:email>a@x.com</cas:email></cas:attributes>
        </cas:authenticationSuccess>
    </cas:serviceResponse>"#;

    /// Serve `router` on an ephemeral port and return its base URL
    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/cas", addr)
    }

    fn env_for(cas_server: &str) -> EnvironmentContext {
        EnvironmentContext {
            is_local_development: true,
            base_service_url: "http://localhost:3000".to_string(),
            cas_server: cas_server.to_string(),
        }
    }

    fn validator() -> TicketValidator {
        TicketValidator::new(2, 5).unwrap()
    }

    #[tokio::test]
    async fn test_empty_ticket_makes_no_request() {
        // Nothing listens here; a request would surface as NetworkError
        let env = env_for("http://127.0.0.1:9/cas");
        assert_eq!(
            validator().validate("", &env).await,
            ValidationResult::Failure(ValidationError::MissingTicket)
        );
        assert_eq!(
            validator().validate("   ", &env).await,
            ValidationResult::Failure(ValidationError::MissingTicket)
        );
    }

    #[tokio::test]
    async fn test_success_sends_service_and_ticket() {
        let router = Router::new().route(
            "/cas/serviceValidate",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                let expected_service = q.get("service").map(String::as_str)
                    == Some("http://localhost:3000/auth/callback");
                let expected_ticket = q.get("ticket").map(String::as_str) == Some("ST-1");
                if expected_service && expected_ticket {
                    (StatusCode::OK, SUCCESS_XML)
                } else {
                    (StatusCode::OK, "<serviceResponse><authenticationFailure code=\"INVALID_SERVICE\">bad</authenticationFailure></serviceResponse>")
                }
            }),
        );
        let cas = spawn(router).await;

        let result = validator().validate("ST-1", &env_for(&cas)).await;
        match result {
            ValidationResult::Success {
                username,
                attributes,
            } => {
                assert_eq!(username, "alice");
                assert_eq!(attributes.get("email").map(String::as_str), Some("a@x.com"));
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_accept_header_is_sent() {
        let router = Router::new().route(
            "/cas/serviceValidate",
            get(|headers: axum::http::HeaderMap| async move {
                let accept = headers
                    .get("accept")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                if accept == ACCEPT_XML {
                    SUCCESS_XML
                } else {
                    "<serviceResponse/>"
                }
            }),
        );
        let cas = spawn(router).await;

        assert!(validator().validate("ST-2", &env_for(&cas)).await.is_success());
    }

    #[tokio::test]
    async fn test_non_success_status_is_http_error() {
        let router = Router::new().route(
            "/cas/serviceValidate",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, SUCCESS_XML) }),
        );
        let cas = spawn(router).await;

        assert_eq!(
            validator().validate("ST-3", &env_for(&cas)).await,
            ValidationResult::Failure(ValidationError::HttpError(503))
        );
    }

    #[tokio::test]
    async fn test_cas_failure_is_passed_through() {
        let router = Router::new().route(
            "/cas/serviceValidate",
            get(|| async {
                r#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas"><cas:authenticationFailure code="INVALID_TICKET">Ticket ST-4 not recognized</cas:authenticationFailure></cas:serviceResponse>"#
            }),
        );
        let cas = spawn(router).await;

        assert_eq!(
            validator().validate("ST-4", &env_for(&cas)).await,
            ValidationResult::Failure(ValidationError::CasFailure {
                code: Some("INVALID_TICKET".to_string()),
                message: "Ticket ST-4 not recognized".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = validator()
            .validate("ST-5", &env_for(&format!("http://{}/cas", addr)))
            .await;
        assert!(matches!(
            result,
            ValidationResult::Failure(ValidationError::NetworkError(_))
        ));
    }
}
