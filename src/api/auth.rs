//! Authentication API endpoints
//!
//! - POST /api/auth/login   - Programmatic login, sets the session cookie
//! - POST /api/auth/logout  - Clears the session cookie
//! - GET  /api/auth/session - Current session user

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::api::guard::AuthContext;
use crate::api::middleware::{ApiError, AppState};
use crate::models::{LoginCredentials, SessionUser};
use crate::services::login::{LoginFailure, LoginOutcome, API_UNEXPECTED_ERROR_MESSAGE};

/// Body of `POST /api/auth/login`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<LoginRedirect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<LoginResultError>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRedirect {
    pub redirect_to: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResultError {
    pub message: String,
}

/// Body of `GET /api/auth/session`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: SessionUser,
    /// Milliseconds since the Unix epoch
    pub expires_at: i64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/session", get(session))
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(credentials): Json<LoginCredentials>,
) -> Response {
    match state.login_service.login(&credentials).await {
        LoginOutcome::Authenticated(response) => {
            auth.create_session(response.access_token, response.user);
            Json(LoginResult {
                success: true,
                data: Some(LoginRedirect {
                    redirect_to: state.auth_routes.dashboard.clone(),
                }),
                error: None,
            })
            .into_response()
        }
        LoginOutcome::Rejected { failure, state: form_state } => {
            let status = match failure {
                LoginFailure::Validation => StatusCode::BAD_REQUEST,
                LoginFailure::InvalidCredentials => StatusCode::UNAUTHORIZED,
                LoginFailure::Unexpected => StatusCode::INTERNAL_SERVER_ERROR,
            };
            let message = form_state
                .message
                .unwrap_or_else(|| API_UNEXPECTED_ERROR_MESSAGE.to_string());

            (
                status,
                Json(LoginResult {
                    success: false,
                    data: None,
                    error: Some(LoginResultError { message }),
                }),
            )
                .into_response()
        }
    }
}

/// POST /api/auth/logout
async fn logout(auth: AuthContext) -> StatusCode {
    auth.logout();
    StatusCode::NO_CONTENT
}

/// GET /api/auth/session
async fn session(auth: AuthContext) -> Result<Json<SessionResponse>, ApiError> {
    let session = auth
        .session()
        .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;

    Ok(Json(SessionResponse {
        user: session.user.clone(),
        expires_at: session.expires_at,
    }))
}
