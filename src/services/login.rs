//! Login action
//!
//! Validates the submitted form, runs the credential verifier and decides
//! what the user sees. Session issuance is left to the caller, which owns the
//! request's cookie jar.
//!
//! Failure taxonomy:
//! - field validation errors are returned per field, the verifier is not called
//! - rejected credentials become "Invalid email or password"
//! - verifier failures are logged and become a generic message

use std::sync::Arc;

use crate::models::{AuthResponse, LoginCredentials, LoginFieldErrors, LoginFormState};
use crate::services::credentials::CredentialVerifier;

pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password";
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred. Please try again.";
/// Unexpected-failure message of the programmatic login
pub const API_UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred";
pub const MISSING_CREDENTIALS_MESSAGE: &str = "Email and password are required";

/// Minimum accepted password length
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Why a login attempt did not authenticate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFailure {
    Validation,
    InvalidCredentials,
    Unexpected,
}

/// Result of a login attempt
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    Authenticated(AuthResponse),
    Rejected {
        failure: LoginFailure,
        state: LoginFormState,
    },
}

impl LoginOutcome {
    fn rejected(failure: LoginFailure, state: LoginFormState) -> Self {
        Self::Rejected { failure, state }
    }
}

pub struct LoginService {
    verifier: Arc<dyn CredentialVerifier>,
}

impl LoginService {
    pub fn new(verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self { verifier }
    }

    /// Field-level validation of the login form
    pub fn validate(credentials: &LoginCredentials) -> LoginFieldErrors {
        let mut errors = LoginFieldErrors::default();

        if credentials.email.is_empty() {
            errors.email = Some("Email is required".to_string());
        } else if !credentials.email.contains('@') {
            errors.email = Some("Please enter a valid email".to_string());
        }

        if credentials.password.is_empty() {
            errors.password = Some("Password is required".to_string());
        } else if credentials.password.chars().count() < MIN_PASSWORD_LENGTH {
            errors.password = Some(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            ));
        }

        errors
    }

    /// Login form submission
    pub async fn submit(&self, credentials: &LoginCredentials) -> LoginOutcome {
        let errors = Self::validate(credentials);
        if !errors.is_empty() {
            return LoginOutcome::rejected(LoginFailure::Validation, LoginFormState::with_errors(errors));
        }

        self.authenticate(credentials, UNEXPECTED_ERROR_MESSAGE).await
    }

    /// Programmatic login: only checks that both fields are present
    pub async fn login(&self, credentials: &LoginCredentials) -> LoginOutcome {
        if credentials.email.is_empty() || credentials.password.is_empty() {
            return LoginOutcome::rejected(
                LoginFailure::Validation,
                LoginFormState::with_message(MISSING_CREDENTIALS_MESSAGE),
            );
        }

        self.authenticate(credentials, API_UNEXPECTED_ERROR_MESSAGE).await
    }

    async fn authenticate(&self, credentials: &LoginCredentials, unexpected: &str) -> LoginOutcome {
        match self.verifier.verify(credentials).await {
            Ok(Some(response)) => {
                tracing::info!(user_id = %response.user.id, "login succeeded");
                LoginOutcome::Authenticated(response)
            }
            Ok(None) => {
                tracing::info!("login rejected: invalid credentials");
                LoginOutcome::rejected(
                    LoginFailure::InvalidCredentials,
                    LoginFormState::with_message(INVALID_CREDENTIALS_MESSAGE),
                )
            }
            Err(e) => {
                tracing::error!("Login error: {}", e);
                LoginOutcome::rejected(
                    LoginFailure::Unexpected,
                    LoginFormState::with_message(unexpected),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::api_client::ApiClientError;
    use crate::services::credentials::{CredentialError, DemoCredentialVerifier};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Verifier that counts calls and always fails
    #[derive(Default)]
    struct FailingVerifier {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CredentialVerifier for FailingVerifier {
        async fn verify(
            &self,
            _credentials: &LoginCredentials,
        ) -> Result<Option<AuthResponse>, CredentialError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ApiClientError::network("connection refused").into())
        }
    }

    fn credentials(email: &str, password: &str) -> LoginCredentials {
        LoginCredentials {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    fn demo_service() -> LoginService {
        LoginService::new(Arc::new(DemoCredentialVerifier::new()))
    }

    #[test]
    fn test_validate_required_fields() {
        let errors = LoginService::validate(&credentials("", ""));
        assert_eq!(errors.email.as_deref(), Some("Email is required"));
        assert_eq!(errors.password.as_deref(), Some("Password is required"));
    }

    #[test]
    fn test_validate_formats() {
        let errors = LoginService::validate(&credentials("not-an-email", "12345"));
        assert_eq!(errors.email.as_deref(), Some("Please enter a valid email"));
        assert_eq!(
            errors.password.as_deref(),
            Some("Password must be at least 6 characters")
        );
    }

    #[test]
    fn test_validate_ok() {
        assert!(LoginService::validate(&credentials("a@b.c", "123456")).is_empty());
    }

    #[tokio::test]
    async fn test_submit_success() {
        let outcome = demo_service()
            .submit(&credentials("demo@example.com", "password"))
            .await;
        match outcome {
            LoginOutcome::Authenticated(response) => assert_eq!(response.user.name, "Demo User"),
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_submit_invalid_credentials_message() {
        let outcome = demo_service()
            .submit(&credentials("demo@example.com", "wrong-password"))
            .await;
        match outcome {
            LoginOutcome::Rejected { failure, state } => {
                assert_eq!(failure, LoginFailure::InvalidCredentials);
                assert_eq!(state.message.as_deref(), Some(INVALID_CREDENTIALS_MESSAGE));
                assert!(state.errors.is_none());
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_submit_validation_skips_verifier() {
        let verifier = Arc::new(FailingVerifier::default());
        let service = LoginService::new(verifier.clone());

        let outcome = service.submit(&credentials("bad", "x")).await;

        assert!(matches!(
            outcome,
            LoginOutcome::Rejected { failure: LoginFailure::Validation, .. }
        ));
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_submit_verifier_error_is_generic_message() {
        let verifier = Arc::new(FailingVerifier::default());
        let service = LoginService::new(verifier.clone());

        let outcome = service.submit(&credentials("a@b.c", "123456")).await;

        match outcome {
            LoginOutcome::Rejected { failure, state } => {
                assert_eq!(failure, LoginFailure::Unexpected);
                assert_eq!(state.message.as_deref(), Some(UNEXPECTED_ERROR_MESSAGE));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_programmatic_login_verifier_error_message() {
        let verifier = Arc::new(FailingVerifier::default());
        let service = LoginService::new(verifier);

        match service.login(&credentials("a@b.c", "123456")).await {
            LoginOutcome::Rejected { failure, state } => {
                assert_eq!(failure, LoginFailure::Unexpected);
                assert_eq!(state.message.as_deref(), Some(API_UNEXPECTED_ERROR_MESSAGE));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_programmatic_login_requires_both_fields() {
        let outcome = demo_service().login(&credentials("demo@example.com", "")).await;
        match outcome {
            LoginOutcome::Rejected { failure, state } => {
                assert_eq!(failure, LoginFailure::Validation);
                assert_eq!(state.message.as_deref(), Some(MISSING_CREDENTIALS_MESSAGE));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_programmatic_login_skips_format_rules() {
        // Short passwords are only a form-level rule
        let outcome = demo_service().login(&credentials("x@y.z", "abc")).await;
        assert!(matches!(
            outcome,
            LoginOutcome::Rejected { failure: LoginFailure::InvalidCredentials, .. }
        ));
    }
}
