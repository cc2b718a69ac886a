//! Webhook HTTP server.
//!
//! Every documented outcome, failures included, is answered with 200 and a
//! JSON body; the master reads `status` or `error` to decide what to do.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::models::SignalMessage;
use crate::relay::{GateState, RelayError, SignalRelay};

/// Shared state for the HTTP server.
#[derive(Clone)]
pub struct RelayServer {
    relay: Arc<SignalRelay>,
}

impl RelayServer {
    pub fn new(relay: Arc<SignalRelay>) -> Self {
        Self { relay }
    }
}

/// Create the router with all endpoints.
pub fn create_router(server: RelayServer) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/webhook", post(webhook))
        .with_state(server)
}

/// Serve until Ctrl+C.
pub async fn serve(server: RelayServer, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(addr = %addr, "Webhook server listening");

    axum::serve(listener, create_router(server))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Webhook server failed")
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    connection: GateState,
    mapped_tickets: usize,
}

async fn health_check(State(server): State<RelayServer>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        connection: server.relay.gate().state(),
        mapped_tickets: server.relay.tickets().len().await,
    })
}

/// Signal endpoint. The body is parsed by hand so a malformed payload gets
/// the same error-shaped answer as every other failure.
async fn webhook(State(server): State<RelayServer>, body: Bytes) -> Response {
    let request_id = Uuid::new_v4();

    let signal: SignalMessage = match serde_json::from_slice(&body) {
        Ok(signal) => signal,
        Err(e) => {
            warn!(request_id = %request_id, error = %e, "Malformed signal payload");
            let err = RelayError::Exception(format!("invalid payload: {}", e));
            return Json(err.to_body()).into_response();
        }
    };

    let span = info_span!(
        "signal",
        request_id = %request_id,
        action = signal.action.as_deref().unwrap_or("-")
    );

    match server.relay.handle(&signal).instrument(span).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(err) => {
            info!(request_id = %request_id, error = %err, "Signal failed");
            Json(err.to_body()).into_response()
        }
    }
}
