//! Portico - session-cookie authentication starter
//!
//! Cookie-backed sessions, a request-scoped auth guard and an edge route
//! filter in front of a small set of server-rendered pages.

pub mod api;
pub mod config;
pub mod models;
pub mod render;
pub mod services;
