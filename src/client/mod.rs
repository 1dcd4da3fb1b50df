// src/client/mod.rs
//! RPC client implementation.
//!
//! This module contains the core [`RpcClient`] type which multiplexes many
//! concurrent requests over one shared [`Connection`].
//!
//! # Architecture
//!
//! Each `send` lazily opens the connection, registers a pending entry under
//! a fresh correlation ID, writes exactly one frame and waits on a oneshot
//! channel. The connection hands every inbound frame back to the client via
//! the [`FrameHandler`] capability; the client parses it and settles the
//! entry whose ID it carries. Responses may arrive in any order.
//!
//! # Concurrency
//!
//! The pending map sits behind a mutex. Response dispatch, the per-request
//! timer and session-loss cleanup each remove the entry in a single critical
//! section, so whichever path gets there first wins and the others find
//! nothing.

mod pending;

use std::sync::{Arc, Weak};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::connection::{Connection, ConnectionState, FrameHandler};
use crate::protocol::{RpcRequest, RpcResponse};
use crate::{
    // ---
    Result,
    RpcConfig,
    RpcError,
    TransportPtr,
};

use pending::PendingRequests;

/// RPC client bound to one endpoint.
///
/// Cheap to clone (internally `Arc`-backed); clones share the connection
/// and the pending map.
///
/// # Example
///
/// ```no_run
/// use huly_rpc::{create_websocket_transport, RpcClient, RpcConfig};
/// use serde_json::json;
///
/// # async fn example() -> huly_rpc::Result<()> {
/// let client = RpcClient::new(
///     RpcConfig::new("wss://api.huly.io"),
///     create_websocket_transport(),
/// );
///
/// let people = client.send("person.find", json!({ "query": "Ada" })).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RpcClient {
    inner: Arc<Inner>,
}

struct Inner {
    // ---
    connection: Connection,
    pending: PendingRequests,
    config: RpcConfig,
}

impl RpcClient {
    // ---
    /// Create a client. No connection is made until the first request.
    pub fn new(config: RpcConfig, transport: TransportPtr) -> Self {
        // ---
        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let handler: Weak<dyn FrameHandler> = weak.clone();

            Inner {
                connection: Connection::new(
                    config.endpoint.clone(),
                    transport,
                    config.connect_timeout(),
                    handler,
                ),
                pending: PendingRequests::new(),
                config,
            }
        });

        Self { inner }
    }

    /// Endpoint this client talks to.
    pub fn endpoint(&self) -> &str {
        &self.inner.config.endpoint
    }

    /// Per-request timeout in effect.
    pub fn request_timeout(&self) -> Duration {
        self.inner.config.request_timeout
    }

    /// Send one request and wait for its outcome.
    ///
    /// Opens the connection first if it is not open (joining an attempt
    /// already in flight). Exactly one frame is written per call.
    ///
    /// # Errors
    ///
    /// - `RpcError::Connect` - the connection could not be established
    /// - `RpcError::ConnectionLost` - the session ended before a response
    /// - `RpcError::Backend` - the backend answered with an error payload
    /// - `RpcError::Timeout` - no response within the request timeout
    /// - `RpcError::Serialization` - `params` could not be serialized
    pub async fn send<P>(&self, method: &str, params: P) -> Result<Value>
    where
        P: Serialize,
    {
        // ---
        let params = serde_json::to_value(params)?;

        let link = self.inner.connection.open().await?;

        let (id, rx) = self
            .inner
            .pending
            .register(link.generation(), self.inner.config.request_timeout);

        let frame = match serde_json::to_string(&RpcRequest {
            method,
            params: &params,
            id: &id,
        }) {
            Ok(frame) => frame,
            Err(err) => {
                self.inner.pending.remove(&id);
                return Err(err.into());
            }
        };

        if let Err(err) = link.send(frame).await {
            self.inner.pending.remove(&id);
            return Err(err);
        }

        log_debug!("sent {method} (correlation_id: {id})");

        rx.await.map_err(|_| RpcError::ConnectionLost)?
    }

    /// Typed wrapper around [`send`](Self::send).
    ///
    /// # Errors
    ///
    /// As for `send`, plus `RpcError::Serialization` when the result does
    /// not deserialize into `R`.
    pub async fn call<P, R>(&self, method: &str, params: P) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let value = self.send(method, params).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Whether the underlying session is open.
    pub fn is_connected(&self) -> bool {
        self.inner.connection.is_open()
    }

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.inner.connection.state()
    }

    /// Number of requests waiting for a response.
    pub fn pending_requests(&self) -> usize {
        self.inner.pending.len()
    }

    /// Close the connection.
    ///
    /// Requests already on the wire are abandoned to their timeouts. The
    /// next `send` reconnects.
    pub fn disconnect(&self) {
        self.inner.connection.close();
    }

    /// Whether two handles refer to the same client instance.
    pub fn same_client(&self, other: &RpcClient) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Inner {
    // ---
    /// Route one inbound frame to its waiting caller.
    ///
    /// Malformed frames and unknown IDs are logged and dropped.
    fn dispatch(&self, frame: &str) {
        // ---
        let response: RpcResponse = match serde_json::from_str(frame) {
            Ok(response) => response,
            Err(_err) => {
                log_warn!("dropping malformed frame: {_err}");
                return;
            }
        };

        let Some(id) = response.id.clone() else {
            log_warn!("dropping frame without correlation id");
            return;
        };

        if !self.pending.complete(&id, response.into_outcome()) {
            log_debug!("discarding response for unknown or expired correlation_id: {id}");
        }
    }
}

impl FrameHandler for Inner {
    // ---
    fn on_frame(&self, _generation: u64, frame: String) {
        self.dispatch(&frame);
    }

    fn on_error(&self, _generation: u64, _error: String) {
        log_debug!("transport error on session {_generation}: {_error}");
    }

    fn on_close(&self, generation: u64) {
        // ---
        let _failed = self.pending.fail_generation(generation);
        log_debug!("session {generation} ended; failed {_failed} pending request(s)");
    }
}
