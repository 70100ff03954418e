//! HTTP trigger server
//!
//! Exposes the pipeline over HTTP so that an external scheduler can start a
//! run:
//! - `POST /webhook` runs one crawl-and-deliver cycle
//! - `GET /health` reports liveness
//! - `GET /` describes the endpoints
//!
//! Runs are serialized: a trigger that arrives while another run is in flight
//! waits for it to finish, so two crawls never write the same output file.

mod routes;

pub use routes::{router, AppState, TriggerRequest};

use crate::config::RuntimeConfig;
use std::net::SocketAddr;

pub const SERVICE_NAME: &str = "eSIM Crawler Webhook";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

/// Binds the trigger server and serves until Ctrl+C
pub async fn serve(config: RuntimeConfig, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Trigger server listening on http://{}", listener.local_addr()?);
    tracing::info!("Webhook endpoint: POST /webhook, health check: GET /health");

    axum::serve(listener, router(config))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping trigger server");
}
