//! Router assembly, liveness/readiness probes and the serve loop.

use crate::api;
use crate::config::file::StorageBackend;
use crate::shutdown::shutdown_signal;
use crate::state::AppState;
use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use boxoffice_core::entities::OrderId;
use serde::Serialize;
use std::net::SocketAddr;
use tokio::net::TcpListener;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .merge(api::router())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    storage: StorageBackend,
}

/// Liveness: OK whenever the process can answer.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        storage: state.backend,
    })
}

#[derive(Serialize)]
struct ReadyResponse {
    status: &'static str,
    storage: StorageBackend,
}

/// Readiness: probes the order journal with a lookup that never matches.
async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.engine.get_order(OrderId::UNRECORDED).await {
        Ok(_) => (
            StatusCode::OK,
            Json(ReadyResponse {
                status: "ready",
                storage: state.backend,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadyResponse {
                    status: "unavailable",
                    storage: state.backend,
                }),
            )
        }
    }
}

/// Serve until SIGTERM or SIGINT, then drain in-flight requests.
pub async fn run_server(router: Router, addr: SocketAddr) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}
