pub mod handlers;
pub mod middleware;
pub mod extractors;
pub mod ui;
pub mod uploads;

use crate::{models::ModelHost, utils::error::ClassifierError, Config, Result};
use axum::{
    extract::{DefaultBodyLimit, State},
    middleware::from_fn,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    services::ServeDir,
    timeout::TimeoutLayer,
};

/// Shared by every handler; the model host is loaded once and only read afterwards.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub host: Arc<ModelHost>,
}

impl AppState {
    pub fn new(config: Config, host: ModelHost) -> Self {
        Self {
            config: Arc::new(config),
            host: Arc::new(host),
        }
    }
}

pub async fn serve(config: Config) -> Result<()> {
    // load before binding so the first request never waits on the model
    let host = ModelHost::load(&config);
    if !host.is_available() {
        tracing::warn!("Serving without a model; every prediction will report an error");
    }

    tokio::fs::create_dir_all(&config.upload_dir).await.map_err(|e| {
        ClassifierError::Config(format!(
            "Failed to create upload directory {}: {}",
            config.upload_dir.display(),
            e
        ))
    })?;

    if let Some(retention) = config.server_config.upload_retention {
        tracing::info!("Uploads older than {}s will be removed", retention);
        uploads::spawn_upload_sweeper(
            config.upload_dir.clone(),
            Duration::from_secs(retention),
            Duration::from_secs(config.server_config.upload_sweep_interval),
        );
    }

    let addr = config.bind_addr;
    let app = create_app(AppState::new(config, host));

    tracing::info!("Server starting on http://{}", addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /            - Upload form");
    tracing::info!("  POST /            - Multipart upload, renders the prediction");
    tracing::info!("  POST /api/predict - Raw image body, JSON prediction");
    tracing::info!("  GET  /health      - Health check");
    tracing::info!("  GET  /api/info    - Service information");

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| ClassifierError::Internal(format!("Failed to bind to address {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| ClassifierError::Internal(format!("Server failed to start: {}", e)))?;

    Ok(())
}

pub fn create_app(state: AppState) -> Router {
    let max_request_size = state.config.server_config.max_request_size;
    let request_timeout = Duration::from_secs(state.config.server_config.request_timeout);
    let uploads = ServeDir::new(&state.config.upload_dir);

    Router::new()
        .route("/", get(ui::index_handler).post(handlers::upload_handler))
        .route("/api/predict", post(handlers::predict_handler))
        .route("/health", get(health_handler))
        .route("/api/info", get(info_handler))
        .nest_service("/uploads", uploads)
        .layer(from_fn(middleware::security_headers))
        .layer(from_fn(middleware::request_logging))
        .layer(DefaultBodyLimit::max(max_request_size))
        .layer(RequestBodyLimitLayer::new(max_request_size))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let model_loaded = state.host.health_check().is_ok();
    let status = if model_loaded { "healthy" } else { "degraded" };

    Json(json!({
        "status": status,
        "model_loaded": model_loaded,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Service info endpoint
async fn info_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let stats = state.host.stats();

    Json(json!({
        "service": "Pet Classifier Service",
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "model": stats,
        "upload": {
            "allowed_extensions": state.config.server_config.allowed_extensions,
            "max_request_size": state.config.server_config.max_request_size,
        }
    }))
}
