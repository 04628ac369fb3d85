//! Shared application state and cross-cutting middleware
//!
//! Contains:
//! - `AppState`, built once at startup and cloned into every handler
//! - The JSON error envelope used by the `/api` routes
//! - Request statistics

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::api::guard::AuthContext;
use crate::api::route_filter::RouteFilter;
use crate::config::{AuthRoutes, Config, SiteConfig, VerifierKind};
use crate::render::PageRenderer;
use crate::services::api_client::ApiClient;
use crate::services::credentials::{
    CredentialVerifier, DemoCredentialVerifier, HttpCredentialVerifier,
};
use crate::services::login::LoginService;
use crate::services::session::SessionStore;

// ============================================================================
// Request Statistics
// ============================================================================

/// Lightweight request statistics using atomic operations (no locks)
pub struct RequestStats {
    total_requests: AtomicU64,
    /// Microseconds, summed over all requests
    total_response_time_us: AtomicU64,
    start_time: Instant,
}

impl RequestStats {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            total_response_time_us: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record(&self, duration_us: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_time_us.fetch_add(duration_us, Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn avg_response_time_us(&self) -> f64 {
        let total = self.total_requests.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        let total_time = self.total_response_time_us.load(Ordering::Relaxed);
        total_time as f64 / total as f64
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for RequestStats {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Application State
// ============================================================================

/// Application state containing shared services
///
/// Everything here is read-only after startup apart from the request counters.
#[derive(Clone)]
pub struct AppState {
    pub session_store: Arc<SessionStore>,
    pub auth_routes: Arc<AuthRoutes>,
    pub route_filter: Arc<RouteFilter>,
    pub login_service: Arc<LoginService>,
    /// Unauthenticated client; see [`AppState::api_for`]
    pub api_client: ApiClient,
    pub renderer: Arc<PageRenderer>,
    pub site: Arc<SiteConfig>,
    pub request_stats: Arc<RequestStats>,
}

impl AppState {
    /// Build the state with an explicit credential verifier
    pub fn new(config: &Config, verifier: Arc<dyn CredentialVerifier>) -> anyhow::Result<Self> {
        let api_client = ApiClient::from_config(&config.api)?;
        Self::with_client(config, verifier, api_client)
    }

    /// Build the state with the verifier selected in `auth.verifier`
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api_client = ApiClient::from_config(&config.api)?;

        let verifier: Arc<dyn CredentialVerifier> = match config.auth.verifier {
            VerifierKind::Demo => Arc::new(DemoCredentialVerifier::with_latency(
                Duration::from_millis(config.auth.demo_latency_ms),
            )),
            VerifierKind::Http => Arc::new(HttpCredentialVerifier::new(api_client.clone())),
        };
        tracing::info!(verifier = ?config.auth.verifier, "credential verifier selected");

        Self::with_client(config, verifier, api_client)
    }

    fn with_client(
        config: &Config,
        verifier: Arc<dyn CredentialVerifier>,
        api_client: ApiClient,
    ) -> anyhow::Result<Self> {
        let renderer = PageRenderer::new(config.site.clone())?;

        Ok(Self {
            session_store: Arc::new(SessionStore::from_config(
                &config.auth,
                config.server.environment,
            )),
            auth_routes: Arc::new(config.auth.routes.clone()),
            route_filter: Arc::new(RouteFilter::from_config(&config.auth)),
            login_service: Arc::new(LoginService::new(verifier)),
            api_client,
            renderer: Arc::new(renderer),
            site: Arc::new(config.site.clone()),
            request_stats: Arc::new(RequestStats::new()),
        })
    }

    /// API client carrying the current request's access token, if any
    pub fn api_for(&self, auth: &AuthContext) -> ApiClient {
        self.api_client.with_token(auth.access_token())
    }
}

// ============================================================================
// Error envelope
// ============================================================================

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

/// Request statistics middleware
///
/// Records request count and response time for the health endpoint.
pub async fn request_stats_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let response = next.run(request).await;

    let duration_us = start.elapsed().as_micros() as u64;
    state.request_stats.record(duration_us);

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::SessionUser;
    use axum::http::HeaderMap;
    use axum_extra::extract::cookie::CookieJar;

    #[test]
    fn test_api_error_status_mapping() {
        assert_eq!(ApiError::unauthorized("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::internal_error("x").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::new("SOMETHING_ELSE", "x").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_api_error_envelope_shape() {
        let value = serde_json::to_value(ApiError::unauthorized("Not authenticated")).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"error": {"code": "UNAUTHORIZED", "message": "Not authenticated"}})
        );
    }

    #[test]
    fn test_request_stats_average() {
        let stats = RequestStats::new();
        assert_eq!(stats.avg_response_time_us(), 0.0);

        stats.record(100);
        stats.record(300);
        assert_eq!(stats.total_requests(), 2);
        assert_eq!(stats.avg_response_time_us(), 200.0);
    }

    #[test]
    fn test_app_state_from_default_config() {
        let state = AppState::from_config(&Config::default()).unwrap();
        assert_eq!(state.session_store.cookie_name(), "session");
        assert_eq!(state.auth_routes.login, "/login");
        assert!(state.api_client.token().is_none());
    }

    #[test]
    fn test_api_for_binds_session_token() {
        let state = AppState::from_config(&Config::default()).unwrap();

        let anonymous = AuthContext::new(
            state.session_store.clone(),
            state.auth_routes.clone(),
            CookieJar::from_headers(&HeaderMap::new()),
        );
        assert!(state.api_for(&anonymous).token().is_none());

        let (jar, _) = state.session_store.create(
            CookieJar::new(),
            "token-abc",
            SessionUser {
                id: "1".to_string(),
                email: "demo@example.com".to_string(),
                name: "Demo User".to_string(),
            },
        );
        let signed_in = AuthContext::new(state.session_store.clone(), state.auth_routes.clone(), jar);
        assert_eq!(state.api_for(&signed_in).token(), Some("token-abc"));
        // The shared client stays anonymous
        assert!(state.api_client.token().is_none());
    }
}
