//! API handlers for Build Service

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use autobuild_common::Error;
use chrono::Utc;
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::{
    auth,
    config::Config,
    models::{AcceptedResponse, BuildRequest, REVISION_ROUND},
    storage::StatusStore,
    worker::Dispatcher,
};

/// Service name reported by `/health`
pub const SERVICE_NAME: &str = "autobuild";

/// Shared application state
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<StatusStore>,
    pub dispatcher: Dispatcher,
}

/// API Error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message
        });

        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            Error::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Error::QueueFull | Error::Cancelled(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("Error handling request: {}", err);
        }

        ApiError {
            status,
            message: err.to_string(),
        }
    }
}

/// Email from a raw body for logging before validation
fn claimed_email(body: &serde_json::Value) -> &str {
    body.get("email")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("unknown")
}

fn authenticate(config: &Config, request: &BuildRequest) -> Result<(), Error> {
    if auth::verify_secret(config, &request.email, request.secret.expose_secret()) {
        Ok(())
    } else {
        warn!("Rejected credentials for: {}", request.email);
        Err(Error::InvalidCredentials)
    }
}

/// Health check
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "timestamp": Utc::now().to_rfc3339()
    }))
}

/// Report which credentials are configured
pub async fn test_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Build service is working!",
        "github_configured": state.config.github_configured(),
        "openai_configured": state.config.openai_configured(),
        "environment": state.config.environment()
    }))
}

/// Accept an initial build request
pub async fn build_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<AcceptedResponse>, ApiError> {
    info!("Received build request for: {}", claimed_email(&payload));

    let request = BuildRequest::from_json(&payload)?;
    authenticate(&state.config, &request)?;

    let task = request.task.clone();
    state.dispatcher.submit(request).await?;

    Ok(Json(AcceptedResponse {
        status: "accepted",
        message: "Build request queued for processing",
        task,
        round: None,
    }))
}

/// Accept a round 2 revision request
pub async fn revise_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<AcceptedResponse>, ApiError> {
    info!("Received revision request for: {}", claimed_email(&payload));

    let request = BuildRequest::from_json(&payload)?;
    if request.round != REVISION_ROUND {
        return Err(Error::NotRevision.into());
    }
    authenticate(&state.config, &request)?;

    let task = request.task.clone();
    state.dispatcher.submit(request).await?;

    Ok(Json(AcceptedResponse {
        status: "accepted",
        message: "Revision request queued",
        task,
        round: Some(REVISION_ROUND),
    }))
}

/// Current status for a task, or an `unknown` placeholder
pub async fn status_handler(
    State(state): State<Arc<AppState>>,
    Path(task): Path<String>,
) -> Response {
    match state.store.get(&task).await {
        Some(record) => Json(record).into_response(),
        None => Json(serde_json::json!({ "status": "unknown" })).into_response(),
    }
}
