//! Transport layer for fleetd: HTTP/WebSocket routing, request
//! authentication, and JSON encoding over a [`fleetd_core::Registry`].
//!
//! Route handlers and JSON shapes live here so that `fleetd-core` stays
//! free of any notion of HTTP, matching the split spec.md draws between
//! the supervision core and its "external collaborators".

pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use fleetd_core::Registry;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::Config;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub config: Config,
}

/// Build the full router: every `/procs*` route behind [`auth::enforce_auth`],
/// plus an unauthenticated `/health` per SPEC_FULL.md.
pub fn build_router(registry: Arc<Registry>, config: Config) -> Router {
    let state = AppState { registry, config };

    let procs = routes::procs_router()
        .merge(routes::ws_router())
        .layer(axum::middleware::from_fn_with_state(state.clone(), auth::enforce_auth));

    Router::new()
        .route("/health", axum::routing::get(routes::health))
        .merge(procs)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
