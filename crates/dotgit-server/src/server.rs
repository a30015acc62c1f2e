use std::net::SocketAddr;

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;

use crate::handlers::{
    health::health_check,
    jobs::{cancel_job, job_status, list_jobs, submit_job},
    metrics::metrics_handler,
};
use crate::middleware::{LoggingLayer, RequestIdLayer, require_token};
use crate::state::AppState;

/// Prefix of the job API.
pub const API_PREFIX: &str = "/api/v1";

/// Creates a router with the given application state and metrics handle.
pub fn create_router_with_state(state: AppState, prometheus_handle: PrometheusHandle) -> Router {
    let middleware_stack = ServiceBuilder::new()
        .layer(RequestIdLayer)
        .layer(LoggingLayer);

    let metrics_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(prometheus_handle);

    let health_router = Router::new()
        .route("/health", get(health_check))
        .with_state(state.clone());

    // Every job route requires a token
    let api_router = Router::new()
        .route("/git", post(submit_job))
        .route("/git/status/{id}", get(job_status))
        .route("/git/tasks", get(list_jobs))
        .route("/git/{id}", delete(cancel_job))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token))
        .with_state(state);

    Router::new()
        .merge(health_router)
        .nest(API_PREFIX, api_router)
        .merge(metrics_router)
        .layer(middleware::from_fn(
            crate::metrics::http::http_metrics_middleware,
        ))
        .layer(middleware_stack)
}

/// Runs the server with the given state and metrics handle.
pub async fn run_server_with_state(
    addr: SocketAddr,
    state: AppState,
    prometheus_handle: PrometheusHandle,
) -> Result<(), std::io::Error> {
    let app = create_router_with_state(state, prometheus_handle);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
