//! Credential verification
//!
//! Login delegates the actual credential check to a [`CredentialVerifier`].
//! The demo verifier accepts a single built-in account; the HTTP verifier
//! forwards the check to the backend API.

use async_trait::async_trait;
use std::time::Duration;

use crate::models::{AuthResponse, LoginCredentials, SessionUser};
use crate::services::api_client::{ApiClient, ApiClientError};
use crate::services::session::DEFAULT_SESSION_TTL_SECONDS;

pub const DEMO_EMAIL: &str = "demo@example.com";
pub const DEMO_PASSWORD: &str = "password";

/// Failure of the verification call itself (not a credential mismatch)
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Credential backend request failed: {0}")]
    Backend(#[from] ApiClientError),

    #[error("Credential backend returned an unexpected response: {0}")]
    InvalidResponse(String),
}

/// Checks an email/password pair
///
/// `Ok(None)` means the credentials were rejected.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<Option<AuthResponse>, CredentialError>;
}

/// Built-in demo account, for running without a backend
#[derive(Debug, Clone, Default)]
pub struct DemoCredentialVerifier {
    latency: Duration,
}

impl DemoCredentialVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a slow backend
    pub fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl CredentialVerifier for DemoCredentialVerifier {
    async fn verify(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<Option<AuthResponse>, CredentialError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if credentials.email != DEMO_EMAIL || credentials.password != DEMO_PASSWORD {
            return Ok(None);
        }

        Ok(Some(AuthResponse {
            user: SessionUser {
                id: "1".to_string(),
                email: credentials.email.clone(),
                name: "Demo User".to_string(),
            },
            access_token: format!("mock-jwt-token-{}", chrono::Utc::now().timestamp_millis()),
            expires_in: DEFAULT_SESSION_TTL_SECONDS,
        }))
    }
}

/// Verifies credentials with `POST {base_url}/auth/login`
pub struct HttpCredentialVerifier {
    client: ApiClient,
    endpoint: String,
}

impl HttpCredentialVerifier {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            endpoint: "/auth/login".to_string(),
        }
    }
}

#[async_trait]
impl CredentialVerifier for HttpCredentialVerifier {
    async fn verify(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<Option<AuthResponse>, CredentialError> {
        match self
            .client
            .post::<AuthResponse, _>(&self.endpoint, Some(credentials))
            .await
        {
            Ok(response) => response
                .data
                .map(Some)
                .ok_or_else(|| CredentialError::InvalidResponse("empty body".to_string())),
            Err(e) if e.is_unauthorized() || e.is_forbidden() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};

    fn credentials(email: &str, password: &str) -> LoginCredentials {
        LoginCredentials {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_demo_accepts_demo_account() {
        let response = DemoCredentialVerifier::new()
            .verify(&credentials(DEMO_EMAIL, DEMO_PASSWORD))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(response.user.id, "1");
        assert_eq!(response.user.email, DEMO_EMAIL);
        assert_eq!(response.user.name, "Demo User");
        assert!(response.access_token.starts_with("mock-jwt-token-"));
        assert_eq!(response.expires_in, 604800);
    }

    #[tokio::test]
    async fn test_demo_rejects_other_credentials() {
        let verifier = DemoCredentialVerifier::new();
        assert!(verifier
            .verify(&credentials(DEMO_EMAIL, "wrong-password"))
            .await
            .unwrap()
            .is_none());
        assert!(verifier
            .verify(&credentials("someone@example.com", DEMO_PASSWORD))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_demo_latency_is_applied() {
        let verifier = DemoCredentialVerifier::with_latency(Duration::from_millis(30));
        let start = std::time::Instant::now();
        verifier
            .verify(&credentials(DEMO_EMAIL, DEMO_PASSWORD))
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    async fn spawn_backend() -> String {
        let app = Router::new().route(
            "/api/auth/login",
            post(|Json(body): Json<LoginCredentials>| async move {
                match (body.email.as_str(), body.password.as_str()) {
                    ("jane@example.com", "secret1") => (
                        StatusCode::OK,
                        Json(serde_json::json!({
                            "user": {"id": "7", "email": "jane@example.com", "name": "Jane"},
                            "accessToken": "backend-token",
                            "expiresIn": 3600
                        })),
                    ),
                    ("broken@example.com", _) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(serde_json::json!({"message": "database down"})),
                    ),
                    _ => (
                        StatusCode::UNAUTHORIZED,
                        Json(serde_json::json!({"message": "Invalid credentials"})),
                    ),
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/api", addr)
    }

    fn http_verifier(base: &str) -> HttpCredentialVerifier {
        HttpCredentialVerifier::new(ApiClient::new(base, Duration::from_secs(5)).unwrap())
    }

    #[tokio::test]
    async fn test_http_verifier_success() {
        let base = spawn_backend().await;
        let response = http_verifier(&base)
            .verify(&credentials("jane@example.com", "secret1"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(response.user.name, "Jane");
        assert_eq!(response.access_token, "backend-token");
        assert_eq!(response.expires_in, 3600);
    }

    #[tokio::test]
    async fn test_http_verifier_unauthorized_is_rejection() {
        let base = spawn_backend().await;
        let response = http_verifier(&base)
            .verify(&credentials("jane@example.com", "nope"))
            .await
            .unwrap();
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_http_verifier_server_error_is_error() {
        let base = spawn_backend().await;
        let err = http_verifier(&base)
            .verify(&credentials("broken@example.com", "whatever"))
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::Backend(ref e) if e.is_server_error()));
    }
}
