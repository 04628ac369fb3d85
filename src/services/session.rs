//! Cookie-backed session store
//!
//! The session cookie is the only persistence medium: there is no server-side
//! session table, so a session cannot be revoked before it expires. Every
//! read treats the cookie as untrusted input and re-validates shape and
//! expiry.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use crate::config::{AuthConfig, Environment};
use crate::models::{now_millis, Session, SessionUser};

/// Default session lifetime (7 days)
pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 60 * 60 * 24 * 7;

/// Default session cookie name
pub const DEFAULT_COOKIE_NAME: &str = "session";

/// Reasons a cookie value does not yield a live session
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Value is not a session-shaped JSON document
    #[error("Malformed session cookie: {0}")]
    Malformed(String),

    /// Well-formed session whose expiry has passed
    #[error("Session expired")]
    Expired,
}

/// Converts sessions to and from a single cookie value.
///
/// The value is the session JSON itself. Percent-encoding for the wire is
/// left to the cookie jar, which encodes on `Set-Cookie` and decodes on read.
pub struct SessionCodec;

impl SessionCodec {
    pub fn encode(session: &Session) -> String {
        serde_json::to_string(session).unwrap_or_default()
    }

    pub fn decode(raw: &str) -> Result<Session, SessionError> {
        serde_json::from_str(raw).map_err(|e| SessionError::Malformed(e.to_string()))
    }

    /// Decode and reject sessions that are expired at `now_ms`
    pub fn decode_live(raw: &str, now_ms: i64) -> Result<Session, SessionError> {
        let session = Self::decode(raw)?;
        if session.is_expired_at(now_ms) {
            return Err(SessionError::Expired);
        }
        Ok(session)
    }
}

/// Create, read and delete the session cookie on a cookie jar.
///
/// Operations take the request's jar by value and hand back the jar with the
/// pending response cookies recorded in it, following the `axum-extra`
/// jar style.
#[derive(Debug, Clone)]
pub struct SessionStore {
    cookie_name: String,
    ttl_seconds: i64,
    secure: bool,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_COOKIE_NAME, DEFAULT_SESSION_TTL_SECONDS, false)
    }
}

impl SessionStore {
    pub fn new(cookie_name: impl Into<String>, ttl_seconds: i64, secure: bool) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            ttl_seconds,
            secure,
        }
    }

    pub fn from_config(auth: &AuthConfig, environment: Environment) -> Self {
        Self::new(
            auth.cookie_name.clone(),
            auth.session_ttl_seconds,
            auth.cookie_secure(environment),
        )
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// Issue a new session and record the cookie in the jar
    pub fn create(
        &self,
        jar: CookieJar,
        access_token: impl Into<String>,
        user: SessionUser,
    ) -> (CookieJar, Session) {
        let session = Session::new(user, access_token, self.ttl_seconds);
        let cookie = self.session_cookie(SessionCodec::encode(&session));
        tracing::debug!(user_id = %session.user.id, "session cookie issued");
        (jar.add(cookie), session)
    }

    /// Read the live session, if any
    ///
    /// Missing and malformed cookies both read as "no session". An expired
    /// session also reads as "no session" and its cookie is removed.
    pub fn read(&self, jar: CookieJar) -> (CookieJar, Option<Session>) {
        self.read_at(jar, now_millis())
    }

    pub fn read_at(&self, jar: CookieJar, now_ms: i64) -> (CookieJar, Option<Session>) {
        let raw = match jar.get(&self.cookie_name) {
            Some(cookie) if !cookie.value().is_empty() => cookie.value().to_owned(),
            _ => return (jar, None),
        };

        match SessionCodec::decode_live(&raw, now_ms) {
            Ok(session) => (jar, Some(session)),
            Err(SessionError::Expired) => {
                tracing::debug!("session cookie expired, clearing");
                (self.delete(jar), None)
            }
            Err(e) => {
                tracing::debug!("ignoring session cookie: {}", e);
                (jar, None)
            }
        }
    }

    /// Remove the session cookie
    ///
    /// A jar that never carried the cookie is returned unchanged, so no
    /// removal cookie is sent.
    pub fn delete(&self, jar: CookieJar) -> CookieJar {
        jar.remove(Cookie::build(self.cookie_name.clone()).path("/"))
    }

    fn session_cookie(&self, value: String) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(Duration::seconds(self.ttl_seconds))
            .build()
    }
}
