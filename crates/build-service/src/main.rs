//! Build Service
//!
//! REST API for accepting builds + background workers for running them

use anyhow::{Context, Result};
use app_generator::TemplateGenerator;
use build_service::{
    create_router, shutdown_signal, AppState, Config, EvaluationClient, GitHubClient, Pipeline,
    Publisher, RetryPolicy, StatusStore, WorkerPool,
};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "build_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Build Service");

    let config = Arc::new(Config::from_env().context("Failed to load configuration")?);

    if !config.github_configured() {
        warn!("GITHUB_TOKEN not configured");
    }
    if !config.openai_configured() {
        warn!("OPENAI_API_KEY not configured");
    }
    if config.student_email.is_empty() || config.student_secret.expose_secret().is_empty() {
        warn!("STUDENT_EMAIL or STUDENT_SECRET not configured, every request will be rejected");
    }

    info!("GitHub API: {}", config.github_api_url);
    info!("GitHub account: {}", config.github_username);
    info!("Model: {} (not invoked)", config.llm_model);
    info!("Max build time: {}s (not enforced)", config.max_build_time_secs);

    let store = Arc::new(StatusStore::new(config.retention_policy()));

    let host = GitHubClient::new(
        config.github_api_url.clone(),
        config.github_username.clone(),
        SecretString::from(config.github_token.expose_secret().to_string()),
    );
    let notifier =
        EvaluationClient::new(RetryPolicy::default()).context("Failed to create evaluation client")?;

    let pipeline = Arc::new(Pipeline::new(
        Arc::new(TemplateGenerator::new()),
        Publisher::new(Arc::new(host)),
        notifier,
        store.clone(),
    ));

    let pool = WorkerPool::start(config.worker_config(), pipeline);

    // Create application state
    let state = AppState {
        config: config.clone(),
        store,
        dispatcher: pool.dispatcher(),
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.api_address())
        .await
        .with_context(|| format!("Failed to bind to {}", config.api_address()))?;

    info!("Build Service API running on http://{}", config.api_address());
    info!("API endpoints:");
    info!("  POST /build - Build new application");
    info!("  POST /revise - Revise application (round 2)");
    info!("  GET /status/{{task}} - Check build status");
    info!("  GET /health - Health check");
    info!("  GET /test - Test configuration");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    pool.shutdown().await;

    Ok(())
}
