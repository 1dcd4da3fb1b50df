use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{CorrelationId, Result, RpcError};

/// Outbound request frame.
#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub method: &'a str,
    pub params: &'a Value,
    pub id: &'a CorrelationId,
}

/// Inbound response frame.
///
/// `id` is optional at parse time so that frames without one can be
/// reported as malformed instead of failing deserialization silently.
#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: Option<CorrelationId>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<ErrorBody>,
}

/// Backend-reported failure.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

impl RpcResponse {
    /// Convert into what the waiting caller receives.
    ///
    /// An `error` member wins over `result`; a frame with neither resolves
    /// to `null`.
    pub fn into_outcome(self) -> Result<Value> {
        match self.error {
            Some(err) => Err(RpcError::Backend {
                message: err.message,
            }),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}
