pub mod extractors;
pub mod handlers;
pub mod middleware;

use crate::{
    config::ServerConfig,
    digit::PredictionPipeline,
    models::{DigitClassifier, OnnxDigitModel},
    utils::error::DigitError,
    Config, Result,
};
use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::post,
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer};

/// 请求处理器共享的状态
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<PredictionPipeline>,
}

impl AppState {
    pub fn new(classifier: DigitClassifier, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            pipeline: Arc::new(PredictionPipeline::new(Arc::new(classifier), upload_dir)),
        }
    }
}

pub async fn serve(config: Config) -> Result<()> {
    if config.dev_mode {
        tracing::info!(
            "Development mode enabled (request timeout {}s)",
            config.server_config.request_timeout
        );
    }

    // 创建上传目录
    tokio::fs::create_dir_all(&config.upload_dir).await?;
    tracing::info!("Upload directory: {}", config.upload_dir.display());

    // 启动时加载一次模型，之后只读共享
    let model = OnnxDigitModel::new(&config)?;
    let state = AppState::new(DigitClassifier::new(model), config.upload_dir.clone());

    let app = create_app(state, &config.server_config);

    let addr: SocketAddr = config.bind_addr.parse().map_err(|e| {
        DigitError::Config(format!("Invalid bind address {}: {}", config.bind_addr, e))
    })?;

    tracing::info!("Server starting on http://{}", addr);
    tracing::info!("API endpoints:");
    tracing::info!("  POST /predict   - Multipart image upload");

    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        DigitError::Internal(format!("Failed to bind to address {}: {}", addr, e))
    })?;

    axum::serve(listener, app)
        .await
        .map_err(|e| DigitError::Internal(format!("Server failed: {}", e)))?;

    Ok(())
}

pub fn create_app(state: AppState, server_config: &ServerConfig) -> Router {
    Router::new()
        .route(
            "/predict",
            post(handlers::predict_handler).fallback(handlers::not_found),
        )
        .fallback(handlers::not_found)
        // multipart默认2MB上限由下面的RequestBodyLimitLayer取代
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(server_config.max_request_size))
        .layer(TimeoutLayer::new(Duration::from_secs(server_config.request_timeout)))
        .layer(from_fn(middleware::request_logging))
        .with_state(state)
}
