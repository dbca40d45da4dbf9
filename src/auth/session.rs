//! Cookie-held sessions
//!
//! The browser cookies are the only session state; there is no server-side
//! store and no revocation. Cookies are deliberately not `HttpOnly` because
//! page scripts read the current user from them.
//!
//! - `session_user`: url-encoded username
//! - `session_user_data`: url-encoded JSON `{username, attributes, loginTime}`,
//!   written only when the user has attributes

use axum::{
    http::{header::SET_COOKIE, HeaderMap},
    response::Response,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::helpers::{extract_cookie, header_value};
use crate::config::Config;

pub const SESSION_USER_COOKIE: &str = "session_user";
pub const SESSION_DATA_COOKIE: &str = "session_user_data";

/// Older auth cookies cleared alongside the session cookies
const LEGACY_COOKIES: [&str; 2] = ["auth_token", "session"];

const EXPIRED: &str = "Thu, 01 Jan 1970 00:00:01 GMT";

/// JSON bundle stored in `session_user_data`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub username: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    pub login_time: DateTime<Utc>,
}

/// Session as read back from request cookies
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub username: String,
    pub attributes: HashMap<String, String>,
    pub login_time: Option<DateTime<Utc>>,
}

fn cookie_attributes(config: &Config) -> String {
    format!(
        "Path=/; SameSite=Lax{}{}",
        config.cookie_domain_attr(),
        config.cookie_secure_flag()
    )
}

/// Build the `Set-Cookie` values for a freshly validated user
pub fn session_cookies(
    config: &Config,
    username: &str,
    attributes: &HashMap<String, String>,
    login_time: DateTime<Utc>,
) -> Vec<String> {
    let attrs = cookie_attributes(config);
    let max_age = config.session_max_age_secs;

    let mut cookies = vec![format!(
        "{}={}; Max-Age={}; {}",
        SESSION_USER_COOKIE,
        urlencoding::encode(username),
        max_age,
        attrs
    )];

    if !attributes.is_empty() {
        let data = SessionData {
            username: username.to_string(),
            attributes: attributes.clone(),
            login_time,
        };
        match serde_json::to_string(&data) {
            Ok(json) => cookies.push(format!(
                "{}={}; Max-Age={}; {}",
                SESSION_DATA_COOKIE,
                urlencoding::encode(&json),
                max_age,
                attrs
            )),
            Err(e) => tracing::warn!(
                error = %e,
                "Failed to serialize session data; only the username cookie is set"
            ),
        }
    }

    cookies
}

/// Build `Set-Cookie` values that expire every session-related cookie
pub fn cleared_session_cookies(config: &Config) -> Vec<String> {
    let attrs = cookie_attributes(config);
    [SESSION_USER_COOKIE, SESSION_DATA_COOKIE]
        .iter()
        .chain(LEGACY_COOKIES.iter())
        .map(|name| format!("{}=; Max-Age=0; Expires={}; {}", name, EXPIRED, attrs))
        .collect()
}

fn session_username(headers: &HeaderMap) -> Option<String> {
    let raw = extract_cookie(headers, SESSION_USER_COOKIE)?;
    let username = urlencoding::decode(&raw)
        .map(|u| u.into_owned())
        .unwrap_or(raw);
    Some(username).filter(|u| !u.is_empty())
}

/// Whether the request carries a non-empty `session_user` cookie
pub fn has_session(headers: &HeaderMap) -> bool {
    session_username(headers).is_some()
}

/// Read the session back from request cookies.
///
/// `session_user` decides whether there is a session at all. A missing or
/// unreadable `session_user_data` only costs the attributes.
pub fn read_session(headers: &HeaderMap) -> Option<SessionUser> {
    let username = session_username(headers)?;

    let Some(raw) = extract_cookie(headers, SESSION_DATA_COOKIE).filter(|v| !v.is_empty()) else {
        return Some(SessionUser {
            username,
            attributes: HashMap::new(),
            login_time: None,
        });
    };

    let decoded = urlencoding::decode(&raw)
        .map_err(|e| e.to_string())
        .and_then(|json| serde_json::from_str::<SessionData>(&json).map_err(|e| e.to_string()));

    match decoded {
        Ok(data) => Some(SessionUser {
            username,
            attributes: data.attributes,
            login_time: Some(data.login_time),
        }),
        Err(e) => {
            tracing::warn!(
                user = %username,
                error = %e,
                "Unreadable session_user_data cookie, continuing without attributes"
            );
            Some(SessionUser {
                username,
                attributes: HashMap::new(),
                login_time: None,
            })
        }
    }
}

/// Append `Set-Cookie` headers to a response
pub fn append_cookies(response: &mut Response, cookies: &[String]) -> Result<(), Box<Response>> {
    for cookie in cookies {
        let value = header_value(cookie)?;
        response.headers_mut().append(SET_COOKIE, value);
    }
    Ok(())
}
