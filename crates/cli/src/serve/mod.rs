//! `rolltreppe serve` -- HTTP JSON API over the chaincode.
//!
//! Endpoints:
//! - GET  /health   - Server status
//! - POST /invoke   - Run a mutating command, then save the ledger
//! - POST /query    - Run a read-only command
//!
//! Request bodies are `{"function": "...", "args": ["..."]}`. Responses are
//! `{"payload": ...}` on success and `{"error": "..."}` otherwise.

mod handlers;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use rolltreppe_chaincode::Chaincode;
use rolltreppe_ledger::MemoryLedger;
use tower_http::cors::{Any, CorsLayer};

use self::handlers::{handle_health, handle_invoke, handle_not_found, handle_query};
use self::state::AppState;

/// Maximum request body size: 1 MB.
const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/invoke", post(handle_invoke))
        .route("/query", post(handle_query))
        .fallback(handle_not_found)
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}

/// Serve the chaincode on `port` until Ctrl+C.
pub(crate) async fn start_server(
    port: u16,
    chaincode: Chaincode<MemoryLedger>,
    state_file: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::new(chaincode, state_file));
    let app = router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");
    eprintln!("Rolltreppe chaincode listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    eprintln!("\nServer shut down.");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "could not listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    eprintln!("\nReceived shutdown signal...");
}
