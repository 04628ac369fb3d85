//! Data models
//!
//! - Session and the identity embedded in it
//! - Login credentials, verifier responses and login form state

mod auth;
mod session;

pub use auth::{AuthResponse, LoginCredentials, LoginFieldErrors, LoginForm, LoginFormState};
pub use session::{now_millis, Session, SessionUser};
