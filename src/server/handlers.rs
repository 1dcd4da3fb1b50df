use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::AppState;
use crate::catalog::{Action, CatalogError, Manifest, PollResult, Trigger};
use crate::connection::ConnectionState;
use crate::RpcError;

/// Error body returned by every failing route: `{ "error": message }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        // ---
        let status = match &err {
            CatalogError::UnknownAction(_) | CatalogError::UnknownTrigger(_) => {
                StatusCode::NOT_FOUND
            }
            CatalogError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            CatalogError::Encode(_) => StatusCode::BAD_GATEWAY,
            CatalogError::Huly(huly) => match huly.rpc_error() {
                Some(RpcError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
                Some(RpcError::Connect(_)) | Some(RpcError::ConnectionLost) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                _ => StatusCode::BAD_GATEWAY,
            },
        };

        if status.is_server_error() {
            log_warn!("request failed: {err}");
        }

        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct PollRequest {
    #[serde(default)]
    props: Value,
    #[serde(default)]
    cursor: Option<i64>,
}

pub(super) async fn health(State(state): State<AppState>) -> Json<Value> {
    // ---
    let backend = match state.api.client().connection_state() {
        ConnectionState::Open => "open",
        ConnectionState::Connecting => "connecting",
        ConnectionState::Closing => "closing",
        ConnectionState::Disconnected => "disconnected",
    };

    Json(json!({
        "status": "ok",
        "backend": backend,
        "endpoint": state.api.client().endpoint(),
        "pendingRequests": state.api.client().pending_requests(),
    }))
}

pub(super) async fn manifest(State(state): State<AppState>) -> Json<Manifest> {
    Json(state.manifest.as_ref().clone())
}

pub(super) async fn run_action(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    // ---
    let action = Action::from_name(&name).ok_or(CatalogError::UnknownAction(name))?;

    let props = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(&body).map_err(|err| CatalogError::InvalidInput(err.to_string()))?
    };

    let result = action.invoke(&state.api, props).await?;
    Ok(Json(result))
}

pub(super) async fn poll_trigger(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<PollRequest>,
) -> Result<Json<PollResult>, ApiError> {
    // ---
    let trigger = Trigger::from_name(&name).ok_or(CatalogError::UnknownTrigger(name))?;

    let result = trigger
        .poll(&state.api, request.props, request.cursor)
        .await?;
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_status_mapping() {
        // ---
        let encode = serde_json::from_str::<Value>("{").unwrap_err();
        let cases = [
            (CatalogError::UnknownAction("x".into()), StatusCode::NOT_FOUND),
            (CatalogError::InvalidInput("bad".into()), StatusCode::BAD_REQUEST),
            (CatalogError::Encode(encode), StatusCode::BAD_GATEWAY),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }
}
