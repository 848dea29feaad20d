//! Build Service
//!
//! Accepts build requests over HTTP, generates a small static app from the
//! brief, publishes it to a new GitHub repository and reports the result to
//! the caller's evaluation endpoint. Builds run on a bounded worker pool and
//! their progress is kept in an in-memory status store.
//!
//! ## Endpoints
//!
//! - `POST /build` - Queue a build
//! - `POST /revise` - Queue a round 2 revision
//! - `GET /status/{task}` - Build status for a task
//! - `GET /health` - Health check
//! - `GET /test` - Configuration check

pub mod auth;
pub mod config;
pub mod github;
pub mod handlers;
pub mod models;
pub mod notifier;
pub mod publisher;
pub mod shutdown;
pub mod storage;
pub mod worker;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use github::{GitHubClient, RemoteRepository, RepositoryHost};
pub use handlers::AppState;
pub use models::{BuildRequest, BuildStatus, BuildStatusRecord};
pub use notifier::{EvaluationClient, RetryPolicy};
pub use publisher::Publisher;
pub use shutdown::shutdown_signal;
pub use storage::{RetentionPolicy, StatusStore};
pub use worker::{Dispatcher, Pipeline, WorkerConfig, WorkerPool};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/test", get(handlers::test_handler))
        .route("/build", post(handlers::build_handler))
        .route("/revise", post(handlers::revise_handler))
        .route("/status/{task}", get(handlers::status_handler))
        .with_state(shared_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
