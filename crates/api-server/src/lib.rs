//! The API façade: owns process startup, constructs the HYDRA worker
//! handles, spawns the background workers, and serves the REST/WS surface
//! over the same `Arc<WorkerHandles>` the workers run against (§9).

mod calibration_routes;
mod health_routes;
mod intelligence_routes;
mod request_id;
mod security_headers;
mod signals_routes;
mod ws_routes;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{middleware, Router};
use hydra_worker::{Config, WorkerHandles};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub handles: Arc<WorkerHandles>,
    pub started_at: Arc<Instant>,
}

/// The envelope every HYDRA endpoint responds with. Per §6.1/§7 errors are
/// HTTP 200 with `success=false` and a populated `error`, except where the
/// request is structurally malformed (axum's own extractor rejections).
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(message.into()) }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health_routes::routes())
        .merge(signals_routes::routes())
        .merge(intelligence_routes::routes())
        .merge(calibration_routes::routes())
        .merge(ws_routes::routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(security_headers::security_headers_middleware))
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .with_state(state)
}

pub async fn run_server() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .json()
        .init();

    let config = Config::from_env();
    let bind_addr: SocketAddr = config.bind_addr.parse()?;
    let handles = WorkerHandles::bootstrap(config).await?;

    let worker_tasks = hydra_worker::spawn_workers(handles.clone());
    tracing::info!(count = worker_tasks.len(), "spawned background workers");

    let state = AppState { handles, started_at: Arc::new(Instant::now()) };
    let app = build_router(state);

    tracing::info!(%bind_addr, "hydra api-server listening");
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
