//! HTTP route handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rolltreppe_chaincode::ChaincodeError;
use rolltreppe_ledger::StorageError;
use serde::Deserialize;

use super::json_error;
use super::state::AppState;
use crate::payload;

/// Body of `POST /invoke` and `POST /query`.
#[derive(Debug, Deserialize)]
pub(crate) struct CallRequest {
    pub(crate) function: String,
    #[serde(default)]
    pub(crate) args: Vec<String>,
}

/// HTTP status for a chaincode error.
pub(crate) fn status_for(err: &ChaincodeError) -> StatusCode {
    match err {
        ChaincodeError::InvalidArguments { .. }
        | ChaincodeError::UnknownFunction(_)
        | ChaincodeError::InvalidAllocatorKind { .. }
        | ChaincodeError::Storage(StorageError::InvalidRange { .. }) => StatusCode::BAD_REQUEST,
        ChaincodeError::NotFound { .. } => StatusCode::NOT_FOUND,
        ChaincodeError::AlreadyExists { .. }
        | ChaincodeError::IllegalTransition { .. }
        | ChaincodeError::Storage(StorageError::ConcurrentConflict { .. }) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn chaincode_error(function: &str, err: &ChaincodeError) -> Response {
    let status = status_for(err);
    if status.is_server_error() {
        tracing::error!(function, error = %err, "request failed");
    } else {
        tracing::debug!(function, error = %err, "request rejected");
    }
    json_error(status, &payload::error_message(err)).into_response()
}

fn ok_payload(bytes: &[u8]) -> Response {
    let body = serde_json::json!({ "payload": payload::to_json(bytes) });
    (StatusCode::OK, Json(body)).into_response()
}

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health() -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(response))
}

/// POST /invoke
pub(crate) async fn handle_invoke(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CallRequest>,
) -> Response {
    let result = state
        .chaincode
        .invoke(&request.function, &request.args)
        .await;
    match result {
        Ok(bytes) => {
            if let Err(e) = state.save().await {
                tracing::error!(function = %request.function, error = %e, "state not saved");
                return json_error(StatusCode::INTERNAL_SERVER_ERROR, &e).into_response();
            }
            ok_payload(&bytes)
        }
        Err(e) => chaincode_error(&request.function, &e),
    }
}

/// POST /query
pub(crate) async fn handle_query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CallRequest>,
) -> Response {
    match state.chaincode.query(&request.function, &request.args).await {
        Ok(bytes) => ok_payload(&bytes),
        Err(e) => chaincode_error(&request.function, &e),
    }
}
