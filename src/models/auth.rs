//! Login request and response types

use serde::{Deserialize, Serialize};

use super::session::SessionUser;

/// Credentials submitted to the credential verifier
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginCredentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Successful answer of the credential verifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: SessionUser,
    pub access_token: String,
    /// Token lifetime in seconds as reported by the backend
    pub expires_in: i64,
}

/// Login form submission
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Where to go after a successful login
    #[serde(default, rename = "callbackUrl")]
    pub callback_url: Option<String>,
}

impl LoginForm {
    pub fn credentials(&self) -> LoginCredentials {
        LoginCredentials {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        }
    }
}

/// Per-field validation messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoginFieldErrors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl LoginFieldErrors {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.password.is_none()
    }
}

/// State handed back to the login page after a submission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoginFormState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<LoginFieldErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LoginFormState {
    pub fn with_errors(errors: LoginFieldErrors) -> Self {
        Self {
            errors: Some(errors),
            ..Self::default()
        }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }
}
