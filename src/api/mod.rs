//! HTTP layer - handlers, middleware and routing
//!
//! - HTML pages (home, login, member pages)
//! - Auth JSON endpoints under /api/auth
//! - Health check
//! - Edge route filter and request-scoped session guard

pub mod auth;
pub mod guard;
pub mod health;
pub mod middleware;
pub mod pages;
pub mod route_filter;


use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use guard::{AuthContext, AuthRedirect, Authenticated, Guest};
pub use middleware::{ApiError, AppState, RequestStats};
pub use route_filter::{FilterDecision, RouteClass, RouteFilter};

/// Build the JSON API router
pub fn build_api_router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/auth", auth::router())
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);
    match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(e) => tracing::warn!("Ignoring invalid CORS origin '{}': {}", cors_origin, e),
    }

    Router::new()
        .merge(pages::router())
        .nest("/api", build_api_router())
        .fallback(pages::not_found)
        // Outermost first: trace, stats, cors, session context, edge filter
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            route_filter::edge_route_filter,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            guard::session_context,
        ))
        .layer(cors)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::request_stats_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
