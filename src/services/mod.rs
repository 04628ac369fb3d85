//! Services layer - business logic
//!
//! - Session cookie codec and store
//! - Credential verification and the login action
//! - Backend API client

pub mod api_client;
pub mod credentials;
pub mod login;
pub mod session;

pub use api_client::{ApiClient, ApiClientError, ApiResponse};
pub use credentials::{
    CredentialError, CredentialVerifier, DemoCredentialVerifier, HttpCredentialVerifier,
};
pub use login::{LoginFailure, LoginOutcome, LoginService};
pub use session::{SessionCodec, SessionError, SessionStore};
