// src/lib.rs
pub mod config;
pub mod database;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod models;
pub mod notify;
pub mod pricing;
pub mod routes;
pub mod state;
pub mod store;
pub mod submission;
pub mod wizard;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use http::{header, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

// Room for the JSON part and multipart framing on top of the photo itself.
const MULTIPART_OVERHEAD: usize = 256 * 1024;

/// Builds the application with every route nested under `/api`.
pub fn app(state: AppState) -> Router {
    let body_limit = state.pipeline.photos().max_bytes() + MULTIPART_OVERHEAD;

    let api = routes::create_router()
        .route("/", get(|| async { "SunQuote API" }))
        .route("/health", get(health_check));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
