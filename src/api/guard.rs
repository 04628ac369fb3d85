//! Request-scoped authentication guard
//!
//! The `session_context` middleware attaches one [`AuthContext`] to every
//! request. All guards and accessors for that request share it, so the
//! session cookie is decoded at most once no matter how many handlers or
//! extractors ask for it. Cookie changes made through the context are
//! written to the response when the middleware unwinds.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use crate::api::middleware::{ApiError, AppState};
use crate::config::AuthRoutes;
use crate::models::{Session, SessionUser};
use crate::services::session::SessionStore;

/// Redirect issued by a failed guard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRedirect {
    location: String,
}

impl AuthRedirect {
    pub fn to(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

impl IntoResponse for AuthRedirect {
    fn into_response(self) -> Response {
        Redirect::to(&self.location).into_response()
    }
}

struct Inner {
    store: Arc<SessionStore>,
    routes: Arc<AuthRoutes>,
    /// Request cookies plus pending response cookies
    jar: Mutex<CookieJar>,
    session: OnceLock<Option<Session>>,
    decodes: AtomicUsize,
}

/// Per-request view of the session
#[derive(Clone)]
pub struct AuthContext {
    inner: Arc<Inner>,
}

impl AuthContext {
    pub fn new(store: Arc<SessionStore>, routes: Arc<AuthRoutes>, jar: CookieJar) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                routes,
                jar: Mutex::new(jar),
                session: OnceLock::new(),
                decodes: AtomicUsize::new(0),
            }),
        }
    }

    fn jar(&self) -> MutexGuard<'_, CookieJar> {
        self.inner.jar.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The live session, decoded on first use
    pub fn session(&self) -> Option<&Session> {
        self.inner
            .session
            .get_or_init(|| {
                self.inner.decodes.fetch_add(1, Ordering::SeqCst);
                let mut jar = self.jar();
                let (next, session) = self.inner.store.read(jar.clone());
                *jar = next;
                session
            })
            .as_ref()
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.session().map(|s| &s.user)
    }

    pub fn access_token(&self) -> Option<&str> {
        self.session().map(|s| s.access_token.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }

    /// Session user, or a redirect to the login page
    pub fn require_authenticated(&self) -> Result<&SessionUser, AuthRedirect> {
        self.user()
            .ok_or_else(|| AuthRedirect::to(self.inner.routes.login.clone()))
    }

    /// Session user if there is one; never redirects
    pub fn check_optional(&self) -> Option<&SessionUser> {
        self.user()
    }

    /// Redirect signed-in users to the dashboard
    pub fn require_guest(&self) -> Result<(), AuthRedirect> {
        match self.session() {
            Some(_) => Err(AuthRedirect::to(self.inner.routes.dashboard.clone())),
            None => Ok(()),
        }
    }

    /// Issue a session cookie on the response.
    ///
    /// The session already read for this request is left as is; callers
    /// redirect after signing in.
    pub fn create_session(&self, access_token: impl Into<String>, user: SessionUser) -> Session {
        let mut jar = self.jar();
        let (next, session) = self.inner.store.create(jar.clone(), access_token, user);
        *jar = next;
        session
    }

    /// Remove the session cookie on the response
    pub fn logout(&self) {
        let mut jar = self.jar();
        let next = self.inner.store.delete(jar.clone());
        *jar = next;
        tracing::debug!("session cookie removed");
    }

    /// How many times the session cookie was decoded for this request
    pub fn decode_count(&self) -> usize {
        self.inner.decodes.load(Ordering::SeqCst)
    }

    /// Current jar, including pending response cookies
    pub fn cookie_jar(&self) -> CookieJar {
        self.jar().clone()
    }
}

/// Attach an [`AuthContext`] to the request and flush its cookie changes
pub async fn session_context(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let jar = CookieJar::from_headers(request.headers());
    let context = AuthContext::new(state.session_store.clone(), state.auth_routes.clone(), jar);
    request.extensions_mut().insert(context.clone());

    let response = next.run(request).await;
    (context.cookie_jar(), response).into_response()
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or_else(|| ApiError::internal_error("Session context is not installed"))
    }
}

/// Extractor for handlers that need a signed-in user
#[derive(Debug, Clone)]
pub struct Authenticated(pub SessionUser);

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let context = AuthContext::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        let user = context
            .require_authenticated()
            .map_err(IntoResponse::into_response)?;
        Ok(Self(user.clone()))
    }
}

/// Extractor for guest-only handlers
#[derive(Debug, Clone, Copy)]
pub struct Guest;

impl<S> FromRequestParts<S> for Guest
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let context = AuthContext::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        context
            .require_guest()
            .map_err(IntoResponse::into_response)?;
        Ok(Self)
    }
}
