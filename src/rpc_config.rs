//! Client configuration.
//!
//! This type carries no transport-specific concepts. The endpoint is an
//! opaque connection string that the configured transport interprets
//! (`wss://…` for the WebSocket transport, anything for the memory one).

use std::time::Duration;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection parameters for one [`RpcClient`](crate::RpcClient).
#[derive(Debug, Clone)]
pub struct RpcConfig {
    // ---
    /// Connection string handed to the transport on every connect.
    ///
    /// Supplied by the caller; the client never falls back to a built-in
    /// address.
    pub endpoint: String,

    /// How long a request waits for its response once it is on the wire.
    ///
    /// Default: 30 seconds
    pub request_timeout: Duration,

    /// How long one connect attempt may take before it is abandoned.
    ///
    /// `None` means the request timeout.
    pub connect_timeout: Option<Duration>,
}

impl RpcConfig {
    /// Create a config for the given endpoint with default timeouts.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: None,
        }
    }

    /// Effective bound on a connect attempt.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout.unwrap_or(self.request_timeout)
    }

    /// Set the per-request timeout.
    ///
    /// # Example
    ///
    /// ```
    /// use huly_rpc::RpcConfig;
    /// use std::time::Duration;
    ///
    /// let config = RpcConfig::new("wss://api.huly.io")
    ///     .with_request_timeout(Duration::from_secs(10));
    /// assert_eq!(config.request_timeout, Duration::from_secs(10));
    /// ```
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Bound each connect attempt separately from the request timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_defaults() {
        // ---
        let config = RpcConfig::new("memory://test");
        assert_eq!(config.endpoint, "memory://test");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_connect_timeout_follows_request_timeout() {
        // ---
        let config = RpcConfig::new("memory://test").with_request_timeout(Duration::from_secs(5));
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));

        let config = config.with_connect_timeout(Duration::from_secs(2));
        assert_eq!(config.connect_timeout(), Duration::from_secs(2));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }
}
