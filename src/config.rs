use std::env;

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Development,
    Production,
}

/// Port suffixes that mark a host as a developer machine
pub const DEFAULT_LOCAL_PORT_MARKERS: [&str; 5] = [":3000", ":8080", ":8000", ":5173", ":4200"];

/// Path prefixes the access gate never redirects
///
/// `/auth` must stay on this list: CAS redirects back to `/auth/callback`
/// without a session cookie.
pub const DEFAULT_PUBLIC_PATH_PREFIXES: [&str; 8] = [
    "/auth",
    "/api",
    "/_next",
    "/static",
    "/favicon.ico",
    "/icons",
    "/live2d",
    "/healthz",
];

#[derive(Debug, Clone)]
pub struct Config {
    // Environment configuration
    pub environment: Environment,

    // Server configuration
    pub server_host: String,
    pub server_port: u16,

    // CAS server base URL, e.g. https://sso.example.edu/cas
    pub cas_server_url: String,

    // Canonical public URL used as the service base outside local development
    pub production_url: String,

    // Host fragments such as ":3000" that classify a request as local development
    pub local_port_markers: Vec<String>,

    // Paths served without a session
    pub public_path_prefixes: Vec<String>,

    // Cookie configuration (None = host-only cookie, Some = domain cookie)
    pub cookie_domain: Option<String>,
    pub session_max_age_secs: u64,

    // HTTP client timeout configuration for serviceValidate (in seconds)
    pub http_connect_timeout_secs: u64,
    pub http_request_timeout_secs: u64,

    // Countdown on the callback failure page before returning to "/"
    pub callback_failure_redirect_secs: u64,
}

impl Config {
    /// Build a configuration with defaults for everything but the two URLs
    pub fn new(cas_server_url: impl Into<String>, production_url: impl Into<String>) -> Self {
        Config {
            environment: Environment::Development,
            server_host: "0.0.0.0".to_string(),
            server_port: 3000,
            cas_server_url: normalize_base_url(&cas_server_url.into()),
            production_url: normalize_base_url(&production_url.into()),
            local_port_markers: DEFAULT_LOCAL_PORT_MARKERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            public_path_prefixes: DEFAULT_PUBLIC_PATH_PREFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            cookie_domain: None,
            session_max_age_secs: 86_400,
            http_connect_timeout_secs: 10,
            http_request_timeout_secs: 30,
            callback_failure_redirect_secs: 5,
        }
    }

    /// Load configuration from environment variables using std::env::var
    pub fn load() -> anyhow::Result<Self> {
        // Required variables
        let cas_server_url = env::var("CAS_SERVER_URL")
            .map_err(|_| anyhow::anyhow!("CAS_SERVER_URL environment variable is required"))?;

        let production_url = env::var("PRODUCTION_URL")
            .map_err(|_| anyhow::anyhow!("PRODUCTION_URL environment variable is required"))?;

        // Both URLs end up in Location headers and outbound requests
        url::Url::parse(&cas_server_url)
            .map_err(|e| anyhow::anyhow!("CAS_SERVER_URL is not a valid URL: {}", e))?;
        url::Url::parse(&production_url)
            .map_err(|e| anyhow::anyhow!("PRODUCTION_URL is not a valid URL: {}", e))?;

        let mut config = Config::new(cas_server_url, production_url);

        config.environment = match env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
            .as_str()
        {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        };

        // Optional variables with defaults
        if let Ok(host) = env::var("SERVER_HOST") {
            config.server_host = host;
        }
        config.server_port = parse_var("SERVER_PORT").unwrap_or(config.server_port);

        if let Ok(markers) = env::var("LOCAL_PORT_MARKERS") {
            config.local_port_markers = parse_list(&markers);
        }
        if let Ok(prefixes) = env::var("PUBLIC_PATH_PREFIXES") {
            config.public_path_prefixes = parse_list(&prefixes);
        }

        // Cookie domain: if not set or empty, use host-only cookies (no Domain attribute)
        config.cookie_domain = env::var("COOKIE_DOMAIN").ok().filter(|s| !s.is_empty());

        config.session_max_age_secs =
            parse_var("SESSION_MAX_AGE_SECS").unwrap_or(config.session_max_age_secs);
        config.http_connect_timeout_secs =
            parse_var("HTTP_CONNECT_TIMEOUT_SECS").unwrap_or(config.http_connect_timeout_secs);
        config.http_request_timeout_secs =
            parse_var("HTTP_REQUEST_TIMEOUT_SECS").unwrap_or(config.http_request_timeout_secs);
        config.callback_failure_redirect_secs = parse_var("CALLBACK_FAILURE_REDIRECT_SECS")
            .unwrap_or(config.callback_failure_redirect_secs);

        Ok(config)
    }

    /// Check if running in production mode
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Get cookie security flags based on environment
    pub fn cookie_secure_flag(&self) -> &str {
        if self.is_production() {
            "; Secure"
        } else {
            ""
        }
    }

    /// Get cookie domain attribute string (empty if host-only cookie)
    pub fn cookie_domain_attr(&self) -> String {
        match &self.cookie_domain {
            Some(domain) => format!("; Domain={}", domain),
            None => String::new(),
        }
    }

    /// Whether the access gate lets `path` through without a session
    pub fn is_public_path(&self, path: &str) -> bool {
        self.public_path_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Get bind address for server
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.parse::<T>().ok())
}

/// Split a comma separated variable, dropping blank entries
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

// e.g., "https://sso.example.edu/cas/" -> "https://sso.example.edu/cas"
fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
