//! CAS endpoint URL builders
//!
//! All functions are pure. `cas_server` is the CAS base URL without a
//! trailing slash (e.g. `https://sso.example.edu/cas`).

/// Path CAS redirects back to with `?ticket=`
pub const CALLBACK_PATH: &str = "/auth/callback";

/// Build the service URL registered with CAS for a given base
pub fn build_callback_url(base_service_url: &str) -> String {
    format!("{}{}", base_service_url, CALLBACK_PATH)
}

/// Build CAS login URL
pub fn build_cas_login_url(cas_server: &str, service_url: &str) -> String {
    format!(
        "{}/login?service={}",
        cas_server,
        urlencoding::encode(service_url)
    )
}

/// Build CAS serviceValidate URL
pub fn build_service_validate_url(cas_server: &str, service_url: &str, ticket: &str) -> String {
    format!(
        "{}/serviceValidate?service={}&ticket={}",
        cas_server,
        urlencoding::encode(service_url),
        urlencoding::encode(ticket)
    )
}

/// Build CAS logout URL; CAS sends the browser back to `base_service_url`
pub fn build_cas_logout_url(cas_server: &str, base_service_url: &str) -> String {
    format!(
        "{}/logout?service={}",
        cas_server,
        urlencoding::encode(base_service_url)
    )
}
