//! HTML pages
//!
//! - GET  /           - Home, member or guest variant
//! - GET  /login      - Sign-in form (guests only)
//! - POST /login      - Sign-in form submission (guests only)
//! - POST /logout     - Sign out
//! - GET  /dashboard, /settings, /profile - Signed-in users only
//! - Fallback 404 page

use axum::{
    extract::{Query, State},
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use tera::Context as TeraContext;

use crate::api::guard::{AuthContext, AuthRedirect, Authenticated, Guest};
use crate::api::middleware::AppState;
use crate::models::{LoginForm, LoginFormState, SessionUser};
use crate::render::RenderError;
use crate::services::login::LoginOutcome;

/// Failure of a page handler
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("Redirect to {}", .0.location())]
    Redirect(AuthRedirect),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl From<AuthRedirect> for PageError {
    fn from(redirect: AuthRedirect) -> Self {
        Self::Redirect(redirect)
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        match self {
            PageError::Redirect(redirect) => redirect.into_response(),
            PageError::Render(e) => {
                tracing::error!("Page render failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Html("<h1>Internal Server Error</h1>"),
                )
                    .into_response()
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    #[serde(rename = "callbackUrl")]
    pub callback_url: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/login", get(login_page).post(login_submit))
        .route("/logout", post(logout))
        .route("/dashboard", get(dashboard))
        .route("/settings", get(settings))
        .route("/profile", get(profile))
}

/// `callbackUrl` if it stays on this site
pub fn local_callback(callback_url: Option<&str>) -> Option<&str> {
    callback_url.filter(|url| {
        url.starts_with('/') && !url.starts_with("//") && !url.starts_with("/\\")
    })
}

fn page_context(user: Option<&SessionUser>) -> TeraContext {
    let mut context = TeraContext::new();
    context.insert("user", &user);
    context
}

/// GET /
async fn home(State(state): State<AppState>, auth: AuthContext) -> Result<Html<String>, PageError> {
    let context = page_context(auth.check_optional());
    Ok(Html(state.renderer.render("home.html", &context)?))
}

fn render_login(
    state: &AppState,
    form: &LoginFormState,
    email: &str,
    callback_url: Option<&str>,
) -> Result<String, RenderError> {
    let mut context = page_context(None);
    context.insert("form", form);
    context.insert("email", email);
    context.insert("callback_url", &local_callback(callback_url));
    state.renderer.render("login.html", &context)
}

/// GET /login
async fn login_page(
    State(state): State<AppState>,
    _guest: Guest,
    Query(query): Query<LoginQuery>,
) -> Result<Html<String>, PageError> {
    let html = render_login(
        &state,
        &LoginFormState::default(),
        "",
        query.callback_url.as_deref(),
    )?;
    Ok(Html(html))
}

/// POST /login
async fn login_submit(
    State(state): State<AppState>,
    auth: AuthContext,
    Form(form): Form<LoginForm>,
) -> Result<Response, PageError> {
    auth.require_guest()?;

    let credentials = form.credentials();
    match state.login_service.submit(&credentials).await {
        LoginOutcome::Authenticated(response) => {
            auth.create_session(response.access_token, response.user);
            let target = local_callback(form.callback_url.as_deref())
                .unwrap_or(&state.auth_routes.dashboard);
            Ok(Redirect::to(target).into_response())
        }
        LoginOutcome::Rejected { state: form_state, .. } => {
            let html = render_login(
                &state,
                &form_state,
                &credentials.email,
                form.callback_url.as_deref(),
            )?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(html)).into_response())
        }
    }
}

/// POST /logout
async fn logout(State(state): State<AppState>, auth: AuthContext) -> Redirect {
    auth.logout();
    Redirect::to(&state.auth_routes.login)
}

fn member_page(state: &AppState, auth: &AuthContext, template: &str) -> Result<Html<String>, PageError> {
    let user = auth.require_authenticated()?;
    let mut context = page_context(Some(user));
    let expires_at = auth
        .session()
        .and_then(|s| chrono::DateTime::from_timestamp_millis(s.expires_at))
        .map(|t| t.to_rfc3339());
    context.insert("expires_at", &expires_at);
    Ok(Html(state.renderer.render(template, &context)?))
}

/// GET /dashboard
async fn dashboard(State(state): State<AppState>, auth: AuthContext) -> Result<Html<String>, PageError> {
    member_page(&state, &auth, "dashboard.html")
}

/// GET /settings
async fn settings(State(state): State<AppState>, auth: AuthContext) -> Result<Html<String>, PageError> {
    member_page(&state, &auth, "settings.html")
}

/// GET /profile
async fn profile(
    State(state): State<AppState>,
    Authenticated(user): Authenticated,
) -> Result<Html<String>, PageError> {
    let context = page_context(Some(&user));
    Ok(Html(state.renderer.render("profile.html", &context)?))
}

/// Fallback for unknown paths
pub async fn not_found(
    State(state): State<AppState>,
    auth: AuthContext,
    uri: Uri,
) -> Result<Response, PageError> {
    let mut context = page_context(auth.check_optional());
    context.insert("request_path", uri.path());
    let html = state.renderer.render("not_found.html", &context)?;
    Ok((StatusCode::NOT_FOUND, Html(html)).into_response())
}
