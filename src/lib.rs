//! ZIP Comparison Tool
//!
//! Reconciles two uploaded ZIP archives of per-user PDFs into a single
//! deduplicated archive plus an audit report.
//!
//! # Modules
//!
//! - `reconcile`: the reconciliation engine (unpack, index, merge, report)
//! - `routes`: thin HTTP adapters over the engine
//! - `config` / `state`: server configuration and shared state

use axum::{extract::DefaultBodyLimit, routing::get, Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod reconcile;
pub mod routes;
pub mod state;

use state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct RootResponse {
    message: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "ZIP Comparison Tool API",
    })
}

/// Build the application router
pub fn app(state: AppState) -> Router {
    // Uploads come from a browser frontend on another origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(routes::compare::router())
        .layer(DefaultBodyLimit::max(state.config().limits.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
