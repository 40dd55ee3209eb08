use crate::agent::handlers::{healthz, index, log_stream, log_summary};
use axum::{routing::get, Router};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("agent server error: {0}")]
    Serve(#[from] std::io::Error),
}

pub async fn run_agent(listen_addr: SocketAddr) -> Result<(), AgentError> {
    let app = Router::new()
        .route("/", get(index))
        .route("/log/stream", get(log_stream))
        .route("/log/summary", get(log_summary))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(listen_addr)
        .await
        .map_err(|source| AgentError::Bind {
            addr: listen_addr,
            source,
        })?;

    info!(addr = %listen_addr, "hblog agent listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("hblog agent shutting down");
}
