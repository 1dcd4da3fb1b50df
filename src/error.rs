use thiserror::Error;

/// Errors that can occur during RPC operations.
///
/// Every variant is local to a single `send` call; none of them tear down
/// the shared connection.
#[derive(Error, Debug)]
pub enum RpcError {
    /// No matching response arrived within the request timeout.
    #[error("request timed out")]
    Timeout,

    /// The transport session could not be established.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The session dropped before the response arrived, or the outbound
    /// channel is gone.
    #[error("connection lost")]
    ConnectionLost,

    /// The backend answered with an `error` payload.
    #[error("{message}")]
    Backend { message: String },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A response was received but did not have the expected shape.
    #[error("invalid response format")]
    InvalidResponse,
}

impl RpcError {
    /// True for the timeout failure kind.
    pub fn is_timeout(&self) -> bool {
        matches!(self, RpcError::Timeout)
    }

    /// Message reported by the backend, if this is a backend error.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            RpcError::Backend { message } => Some(message),
            _ => None,
        }
    }
}

/// Result type alias for RPC operations
pub type Result<T> = std::result::Result<T, RpcError>;
