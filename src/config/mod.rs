//! Configuration management
//!
//! Configuration is loaded from `config.yml` and may be overridden by
//! `PORTICO_*` environment variables. Missing sections and keys are filled
//! with defaults, so an absent or empty file yields a runnable development
//! setup.

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Session cookie and route protection
    #[serde(default)]
    pub auth: AuthConfig,
    /// Backend API client
    #[serde(default)]
    pub api: ApiConfig,
    /// Site metadata used by page templates
    #[serde(default)]
    pub site: SiteConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origin (cookies are sent with credentials)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
    /// Deployment environment
    #[serde(default)]
    pub environment: Environment,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
            environment: Environment::default(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        *self == Environment::Production
    }
}

/// Session cookie and route protection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Name of the session cookie
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Session lifetime in seconds (cookie Max-Age and embedded expiry)
    #[serde(default = "default_session_ttl")]
    pub session_ttl_seconds: i64,
    /// Force the Secure cookie attribute; defaults to on in production
    #[serde(default)]
    pub secure_cookie: Option<bool>,
    /// Redirect targets
    #[serde(default)]
    pub routes: AuthRoutes,
    /// Path prefixes that require a session
    #[serde(default = "default_protected_routes")]
    pub protected_routes: Vec<String>,
    /// Path prefixes only meaningful for visitors without a session
    #[serde(default = "default_guest_routes")]
    pub guest_routes: Vec<String>,
    /// Credential verification backend
    #[serde(default)]
    pub verifier: VerifierKind,
    /// Simulated latency of the demo verifier in milliseconds
    #[serde(default)]
    pub demo_latency_ms: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            session_ttl_seconds: default_session_ttl(),
            secure_cookie: None,
            routes: AuthRoutes::default(),
            protected_routes: default_protected_routes(),
            guest_routes: default_guest_routes(),
            verifier: VerifierKind::default(),
            demo_latency_ms: 0,
        }
    }
}

impl AuthConfig {
    /// Whether the session cookie carries the Secure attribute
    pub fn cookie_secure(&self, environment: Environment) -> bool {
        self.secure_cookie.unwrap_or_else(|| environment.is_production())
    }
}

fn default_cookie_name() -> String {
    "session".to_string()
}

/// Upper bound on `auth.session_ttl_seconds` (10 years)
pub const MAX_SESSION_TTL_SECONDS: i64 = 60 * 60 * 24 * 365 * 10;

fn default_session_ttl() -> i64 {
    60 * 60 * 24 * 7 // 7 days
}

fn default_protected_routes() -> Vec<String> {
    vec![
        "/dashboard".to_string(),
        "/settings".to_string(),
        "/profile".to_string(),
    ]
}

fn default_guest_routes() -> Vec<String> {
    vec!["/login".to_string(), "/register".to_string()]
}

/// Redirect targets used by the guard and the route filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRoutes {
    #[serde(default = "default_login_route")]
    pub login: String,
    #[serde(default = "default_dashboard_route")]
    pub dashboard: String,
    #[serde(default = "default_home_route")]
    pub home: String,
}

impl Default for AuthRoutes {
    fn default() -> Self {
        Self {
            login: default_login_route(),
            dashboard: default_dashboard_route(),
            home: default_home_route(),
        }
    }
}

fn default_login_route() -> String {
    "/login".to_string()
}

fn default_dashboard_route() -> String {
    "/dashboard".to_string()
}

fn default_home_route() -> String {
    "/".to_string()
}

/// Which credential verifier handles logins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VerifierKind {
    /// Built-in demo account (default)
    #[default]
    Demo,
    /// `POST {api.base_url}/auth/login`
    Http,
}

/// Backend API client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every endpoint is appended to
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_api_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            timeout_seconds: default_api_timeout(),
        }
    }
}

fn default_api_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_api_timeout() -> u64 {
    30
}

/// Site metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_site_name")]
    pub name: String,
    #[serde(default = "default_site_description")]
    pub description: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: default_site_name(),
            description: default_site_description(),
        }
    }
}

fn default_site_name() -> String {
    "Portico".to_string()
}

fn default_site_description() -> String {
    "A server-rendered starter with cookie sessions".to_string()
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// A missing or empty file yields the defaults. A file that exists but
    /// is not valid YAML is an error carrying the line and column.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: format_yaml_error(&e),
        })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Recognised variables:
    /// - PORTICO_SERVER_HOST, PORTICO_SERVER_PORT
    /// - PORTICO_SERVER_CORS_ORIGIN, PORTICO_ENVIRONMENT
    /// - PORTICO_AUTH_COOKIE_NAME, PORTICO_AUTH_SESSION_TTL_SECONDS
    /// - PORTICO_AUTH_SECURE_COOKIE, PORTICO_AUTH_VERIFIER
    /// - PORTICO_AUTH_DEMO_LATENCY_MS
    /// - PORTICO_API_BASE_URL, PORTICO_API_TIMEOUT_SECONDS
    /// - PORTICO_SITE_NAME
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        // Server configuration
        if let Ok(host) = std::env::var("PORTICO_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("PORTICO_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("PORTICO_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }
        if let Ok(environment) = std::env::var("PORTICO_ENVIRONMENT") {
            match environment.to_lowercase().as_str() {
                "development" => self.server.environment = Environment::Development,
                "production" => self.server.environment = Environment::Production,
                _ => {} // Ignore invalid values
            }
        }

        // Auth configuration
        if let Ok(name) = std::env::var("PORTICO_AUTH_COOKIE_NAME") {
            self.auth.cookie_name = name;
        }
        if let Ok(ttl) = std::env::var("PORTICO_AUTH_SESSION_TTL_SECONDS") {
            if let Ok(ttl) = ttl.parse::<i64>() {
                self.auth.session_ttl_seconds = ttl;
            }
        }
        if let Ok(secure) = std::env::var("PORTICO_AUTH_SECURE_COOKIE") {
            match secure.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.auth.secure_cookie = Some(true),
                "0" | "false" | "no" | "off" => self.auth.secure_cookie = Some(false),
                _ => {}
            }
        }
        if let Ok(verifier) = std::env::var("PORTICO_AUTH_VERIFIER") {
            match verifier.to_lowercase().as_str() {
                "demo" => self.auth.verifier = VerifierKind::Demo,
                "http" => self.auth.verifier = VerifierKind::Http,
                _ => {}
            }
        }
        if let Ok(latency) = std::env::var("PORTICO_AUTH_DEMO_LATENCY_MS") {
            if let Ok(latency) = latency.parse::<u64>() {
                self.auth.demo_latency_ms = latency;
            }
        }

        // API configuration
        if let Ok(base_url) = std::env::var("PORTICO_API_BASE_URL") {
            self.api.base_url = base_url;
        }
        if let Ok(timeout) = std::env::var("PORTICO_API_TIMEOUT_SECONDS") {
            if let Ok(timeout) = timeout.parse::<u64>() {
                self.api.timeout_seconds = timeout;
            }
        }

        // Site configuration
        if let Ok(name) = std::env::var("PORTICO_SITE_NAME") {
            self.site.name = name;
        }
    }

    /// Check the values that cannot be expressed through types alone
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.cookie_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.cookie_name must not be empty".to_string(),
            ));
        }
        if self.auth.session_ttl_seconds <= 0 {
            return Err(ConfigError::ValidationError(format!(
                "auth.session_ttl_seconds must be positive, got {}",
                self.auth.session_ttl_seconds
            )));
        }
        if self.auth.session_ttl_seconds > MAX_SESSION_TTL_SECONDS {
            return Err(ConfigError::ValidationError(format!(
                "auth.session_ttl_seconds must be at most {}, got {}",
                MAX_SESSION_TTL_SECONDS, self.auth.session_ttl_seconds
            )));
        }

        let routes = &self.auth.routes;
        for (name, route) in [
            ("login", &routes.login),
            ("dashboard", &routes.dashboard),
            ("home", &routes.home),
        ] {
            if !route.starts_with('/') {
                return Err(ConfigError::ValidationError(format!(
                    "auth.routes.{} must be an absolute path, got '{}'",
                    name, route
                )));
            }
        }

        for prefix in self.auth.protected_routes.iter().chain(&self.auth.guest_routes) {
            if !prefix.starts_with('/') {
                return Err(ConfigError::ValidationError(format!(
                    "route prefix '{}' must start with '/'",
                    prefix
                )));
            }
        }

        if let Some(shared) = self
            .auth
            .protected_routes
            .iter()
            .find(|p| self.auth.guest_routes.contains(p))
        {
            return Err(ConfigError::ValidationError(format!(
                "route prefix '{}' cannot be both protected and guest-only",
                shared
            )));
        }

        if self.api.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "api.timeout_seconds must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared by every test that touches process environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
