//! Edge route filter
//!
//! Coarse, presence-only gate that runs before any page handler:
//!
//! | path class | cookie  | action                                      |
//! |------------|---------|---------------------------------------------|
//! | protected  | absent  | redirect to login with `?callbackUrl=<path>` |
//! | protected  | present | allow                                       |
//! | guest-only | present | redirect to dashboard                       |
//! | guest-only | absent  | allow                                       |
//! | other      | any     | allow                                       |
//!
//! The cookie value is not decoded here. An expired or garbled cookie still
//! counts as present and is rejected later by the page guard.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use std::path::Path;

use crate::api::middleware::AppState;
use crate::config::AuthConfig;

/// Image extensions served without going through the filter
const IMAGE_EXTENSIONS: &[&str] = &["svg", "png", "jpg", "jpeg", "gif", "webp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Protected,
    GuestOnly,
    Public,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    Allow,
    Redirect(String),
}

/// `path` equals `prefix` or continues it at a segment boundary
pub fn matches_route(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

#[derive(Debug, Clone)]
pub struct RouteFilter {
    cookie_name: String,
    protected: Vec<String>,
    guest_only: Vec<String>,
    login_route: String,
    dashboard_route: String,
}

impl RouteFilter {
    pub fn new(
        cookie_name: impl Into<String>,
        protected: Vec<String>,
        guest_only: Vec<String>,
        login_route: impl Into<String>,
        dashboard_route: impl Into<String>,
    ) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            protected,
            guest_only,
            login_route: login_route.into(),
            dashboard_route: dashboard_route.into(),
        }
    }

    pub fn from_config(auth: &AuthConfig) -> Self {
        Self::new(
            auth.cookie_name.clone(),
            auth.protected_routes.clone(),
            auth.guest_routes.clone(),
            auth.routes.login.clone(),
            auth.routes.dashboard.clone(),
        )
    }

    /// Paths the filter never looks at: API routes, static assets,
    /// internals (`/_...`), the favicon and images
    pub fn is_excluded(path: &str) -> bool {
        if matches_route(path, "/api")
            || path.starts_with("/static/")
            || path.starts_with("/_")
            || path == "/favicon.ico"
        {
            return true;
        }

        Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| IMAGE_EXTENSIONS.iter().any(|img| ext.eq_ignore_ascii_case(img)))
            .unwrap_or(false)
    }

    pub fn classify(&self, path: &str) -> RouteClass {
        if self.protected.iter().any(|p| matches_route(path, p)) {
            RouteClass::Protected
        } else if self.guest_only.iter().any(|p| matches_route(path, p)) {
            RouteClass::GuestOnly
        } else {
            RouteClass::Public
        }
    }

    pub fn decide(&self, path: &str, cookie_present: bool) -> FilterDecision {
        if Self::is_excluded(path) {
            return FilterDecision::Allow;
        }

        match (self.classify(path), cookie_present) {
            (RouteClass::Protected, false) => FilterDecision::Redirect(format!(
                "{}?callbackUrl={}",
                self.login_route,
                encode_callback(path)
            )),
            (RouteClass::GuestOnly, true) => {
                FilterDecision::Redirect(self.dashboard_route.clone())
            }
            _ => FilterDecision::Allow,
        }
    }

    /// Whether the request carries a non-empty session cookie
    pub fn cookie_present(&self, headers: &HeaderMap) -> bool {
        CookieJar::from_headers(headers)
            .get(&self.cookie_name)
            .is_some_and(|cookie| !cookie.value().is_empty())
    }
}

/// Percent-encode a path for use as a query value, keeping `/` readable
fn encode_callback(path: &str) -> String {
    urlencoding::encode(path).replace("%2F", "/")
}

/// Edge route filter middleware
pub async fn edge_route_filter(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    let present = state.route_filter.cookie_present(request.headers());

    match state.route_filter.decide(path, present) {
        FilterDecision::Allow => next.run(request).await,
        FilterDecision::Redirect(location) => {
            tracing::debug!(path = %path, location = %location, "edge filter redirect");
            Redirect::temporary(&location).into_response()
        }
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use axum::http::header;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn protected_paths_never_pass_without_cookie(rest in "(/[a-z0-9]{1,8}){0,3}") {
            let filter = RouteFilter::from_config(&AuthConfig::default());
            let path = format!("/dashboard{}", rest);
            let decision = filter.decide(&path, false);
            let expected = format!("/login?callbackUrl={}", path);
            prop_assert_eq!(decision, FilterDecision::Redirect(expected));
        }

        #[test]
        fn present_cookie_always_passes_protected(
            rest in "(/[a-z0-9]{1,8}){0,3}",
            value in "[A-Za-z0-9._-]{1,32}",
        ) {
            let filter = RouteFilter::from_config(&AuthConfig::default());
            let mut headers = HeaderMap::new();
            headers.insert(
                header::COOKIE,
                axum::http::HeaderValue::from_str(&format!("session={}", value)).unwrap(),
            );
            let path = format!("/profile{}", rest);
            prop_assert!(filter.cookie_present(&headers));
            prop_assert_eq!(filter.decide(&path, true), FilterDecision::Allow);
        }
    }
}
