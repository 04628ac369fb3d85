//! Session model

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Identity projection carried inside a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub name: String,
}

/// Session record stored in the session cookie.
///
/// Field names follow the cookie's JSON layout:
/// `{"user":{...},"accessToken":"...","expiresAt":<epoch millis>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Authenticated user
    pub user: SessionUser,
    /// Bearer token for the backend API
    pub access_token: String,
    /// Expiration timestamp in epoch milliseconds
    pub expires_at: i64,
}

impl Session {
    /// Build a session that expires `ttl_seconds` from now
    pub fn new(user: SessionUser, access_token: impl Into<String>, ttl_seconds: i64) -> Self {
        Self {
            user,
            access_token: access_token.into(),
            expires_at: now_millis().saturating_add(ttl_seconds.saturating_mul(1000)),
        }
    }

    /// A session is live only while its expiry is strictly in the future
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expires_at <= now_ms
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_millis())
    }
}

/// Current time in epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_user() -> SessionUser {
        SessionUser {
            id: "1".to_string(),
            email: "demo@example.com".to_string(),
            name: "Demo User".to_string(),
        }
    }

    #[test]
    fn test_new_session_expiry() {
        let before = now_millis();
        let session = Session::new(demo_user(), "token", 60);
        let after = now_millis();

        assert!(session.expires_at >= before + 60_000);
        assert!(session.expires_at <= after + 60_000);
        assert!(!session.is_expired());
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let session = Session::new(demo_user(), "token", i64::MAX / 100);
        assert_eq!(session.expires_at, i64::MAX);
        assert!(!session.is_expired());
    }

    #[test]
    fn test_expiry_boundary_is_expired() {
        let session = Session {
            user: demo_user(),
            access_token: "t".to_string(),
            expires_at: 1_000,
        };
        assert!(session.is_expired_at(1_000));
        assert!(session.is_expired_at(1_001));
        assert!(!session.is_expired_at(999));
    }

    #[test]
    fn test_json_layout_uses_camel_case() {
        let session = Session {
            user: demo_user(),
            access_token: "abc".to_string(),
            expires_at: 42,
        };
        let value = serde_json::to_value(&session).unwrap();

        assert_eq!(value["accessToken"], "abc");
        assert_eq!(value["expiresAt"], 42);
        assert_eq!(value["user"]["name"], "Demo User");
        assert!(value.get("access_token").is_none());
    }
}
