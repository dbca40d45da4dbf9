//! Local-development vs production classification
//!
//! A developer machine reports its own address as the CAS service base
//! (it differs per machine); every other host uses the one canonical
//! production URL, whichever internal host or port served the request.

use axum::http::{header, HeaderMap, Uri};

use super::urls::{build_callback_url, build_cas_login_url, build_cas_logout_url};
use crate::config::Config;

/// Host fragments that always indicate a developer machine or private network
const LOCAL_HOST_MARKERS: [&str; 5] = ["localhost", "127.0.0.1", "192.168.", "10.0.", "172.16."];

/// Host suffixes reserved for local development domains
const LOCAL_DOMAIN_SUFFIXES: [&str; 2] = [".local", ".dev"];

/// Scheme and host the browser used to reach us
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOrigin {
    pub scheme: String,
    pub host: String,
}

impl RequestOrigin {
    /// Derive the origin from request headers.
    ///
    /// Host comes from the `Host` header, then the URI authority (HTTP/2).
    /// Scheme comes from `X-Forwarded-Proto`, then the URI, then `http`.
    pub fn from_request(headers: &HeaderMap, uri: &Uri) -> Self {
        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .or_else(|| uri.authority().map(|a| a.as_str().to_string()))
            .unwrap_or_default();

        let scheme = headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .or_else(|| uri.scheme_str().map(|s| s.to_string()))
            .unwrap_or_else(|| "http".to_string());

        RequestOrigin { scheme, host }
    }
}

/// Check whether a host belongs to a local development setup
pub fn is_local_development(host: &str, local_port_markers: &[String]) -> bool {
    if host.is_empty() {
        return false;
    }
    let host = host.to_ascii_lowercase();

    LOCAL_HOST_MARKERS.iter().any(|m| host.contains(m))
        || local_port_markers
            .iter()
            .any(|port| !port.is_empty() && host.contains(port.as_str()))
        || LOCAL_DOMAIN_SUFFIXES.iter().any(|s| host.ends_with(s))
}

/// Per-request view of where CAS should send the browser back to
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentContext {
    pub is_local_development: bool,
    pub base_service_url: String,
    pub cas_server: String,
}

impl EnvironmentContext {
    pub fn resolve(config: &Config, origin: &RequestOrigin) -> Self {
        let is_local = is_local_development(&origin.host, &config.local_port_markers);

        let base_service_url = if is_local {
            format!("{}://{}", origin.scheme, origin.host)
        } else {
            config.production_url.clone()
        };

        tracing::debug!(
            host = %origin.host,
            environment = if is_local { "local-development" } else { "production" },
            base_service_url = %base_service_url,
            "Resolved service environment"
        );

        EnvironmentContext {
            is_local_development: is_local,
            base_service_url,
            cas_server: config.cas_server_url.clone(),
        }
    }

    /// Short name for logs
    pub fn label(&self) -> &'static str {
        if self.is_local_development {
            "local-development"
        } else {
            "production"
        }
    }

    /// The `service` parameter for both login and serviceValidate
    pub fn callback_url(&self) -> String {
        build_callback_url(&self.base_service_url)
    }

    pub fn login_url(&self) -> String {
        build_cas_login_url(&self.cas_server, &self.callback_url())
    }

    pub fn logout_url(&self) -> String {
        build_cas_logout_url(&self.cas_server, &self.base_service_url)
    }
}
