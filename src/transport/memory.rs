//! In-memory transport implementation.
//!
//! A pure in-process stand-in for the backend. Every `connect()` produces a
//! session whose far end is handed to the [`MemoryBackend`] as a
//! [`MemoryPeer`]; the holder of the backend plays the server by reading
//! request frames and writing whatever replies it likes, in any order.
//!
//! The backend also records connect attempts and can refuse or delay them,
//! which makes reconnect and single-flight behavior observable.
//!
//! # ⚠️  Testing Only - Subject to Change
//!
//! Intended for tests and local experiments. Production code should use
//! the WebSocket transport.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::{
    //
    Result,
    RpcError,
    Transport,
    TransportEvent,
    TransportPtr,
    TransportSession,
};

const CHANNEL_DEPTH: usize = 64;

fn lock_ignore_poison<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // ---
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[derive(Default)]
struct Behavior {
    refuse: Option<String>,
    connect_delay: Option<Duration>,
}

struct Shared {
    // ---
    connects: AtomicUsize,
    behavior: Mutex<Behavior>,
    accept_tx: mpsc::UnboundedSender<MemoryPeer>,
}

/// In-memory transport.
struct MemoryTransport {
    shared: Arc<Shared>,
}

#[async_trait::async_trait]
impl Transport for MemoryTransport {
    // ---
    async fn connect(&self, endpoint: &str) -> Result<TransportSession> {
        // ---
        self.shared.connects.fetch_add(1, Ordering::SeqCst);

        let (refuse, delay) = {
            let behavior = lock_ignore_poison(&self.shared.behavior);
            (behavior.refuse.clone(), behavior.connect_delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(reason) = refuse {
            return Err(RpcError::Connect(format!("{endpoint}: {reason}")));
        }

        let (out_tx, out_rx) = mpsc::channel(CHANNEL_DEPTH);
        let (in_tx, in_rx) = mpsc::channel(CHANNEL_DEPTH);

        let peer = MemoryPeer {
            endpoint: endpoint.to_string(),
            requests: out_rx,
            replies: in_tx,
        };

        self.shared
            .accept_tx
            .send(peer)
            .map_err(|_| RpcError::Connect(format!("{endpoint}: backend is gone")))?;

        log_debug!("memory: session opened to {endpoint}");

        Ok(TransportSession {
            outbox: out_tx,
            inbox: in_rx,
        })
    }
}

/// Server side of the in-memory transport.
///
/// Dropping the backend makes every later `connect()` fail.
pub struct MemoryBackend {
    // ---
    shared: Arc<Shared>,
    accept_rx: mpsc::UnboundedReceiver<MemoryPeer>,
}

impl MemoryBackend {
    /// Wait for the next session opened by a client.
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.accept_rx.recv().await
    }

    /// Number of `connect()` calls seen so far, successful or not.
    pub fn connect_attempts(&self) -> usize {
        self.shared.connects.load(Ordering::SeqCst)
    }

    /// Make subsequent connects fail with `reason` (or succeed again with `None`).
    pub fn refuse_connections(&self, reason: Option<&str>) {
        lock_ignore_poison(&self.shared.behavior).refuse = reason.map(str::to_string);
    }

    /// Hold every subsequent connect for `delay` before it resolves.
    pub fn set_connect_delay(&self, delay: Option<Duration>) {
        lock_ignore_poison(&self.shared.behavior).connect_delay = delay;
    }
}

/// One accepted session, seen from the backend side.
pub struct MemoryPeer {
    // ---
    endpoint: String,
    requests: mpsc::Receiver<String>,
    replies: mpsc::Sender<TransportEvent>,
}

impl MemoryPeer {
    /// Endpoint string the client connected with.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Next raw frame written by the client; `None` once the client closed.
    pub async fn recv_frame(&mut self) -> Option<String> {
        self.requests.recv().await
    }

    /// Next frame parsed as JSON. Frames that are not JSON are skipped.
    pub async fn recv_request(&mut self) -> Option<Value> {
        // ---
        loop {
            let frame = self.requests.recv().await?;
            match serde_json::from_str(&frame) {
                Ok(value) => return Some(value),
                Err(_err) => log_warn!("memory: skipping non-JSON request frame: {_err}"),
            }
        }
    }

    /// Send `{ id, result }`.
    pub async fn reply_result(&self, id: &str, result: Value) -> bool {
        self.send_json(serde_json::json!({ "id": id, "result": result }))
            .await
    }

    /// Send `{ id, error: { message } }`.
    pub async fn reply_error(&self, id: &str, message: &str) -> bool {
        self.send_json(serde_json::json!({ "id": id, "error": { "message": message } }))
            .await
    }

    /// Send an arbitrary JSON frame.
    pub async fn send_json(&self, frame: Value) -> bool {
        self.send_raw(frame.to_string()).await
    }

    /// Send a raw text frame, which need not be valid JSON.
    pub async fn send_raw(&self, frame: impl Into<String>) -> bool {
        self.replies
            .send(TransportEvent::Frame(frame.into()))
            .await
            .is_ok()
    }

    /// Report a transport error without ending the session.
    pub async fn send_error(&self, message: impl Into<String>) -> bool {
        self.replies
            .send(TransportEvent::Error(message.into()))
            .await
            .is_ok()
    }

    /// End the session from the backend side.
    pub fn disconnect(self) {
        drop(self);
    }
}

/// Create an in-memory transport and the backend that serves it.
pub fn create_transport() -> (TransportPtr, MemoryBackend) {
    // ---
    let (accept_tx, accept_rx) = mpsc::unbounded_channel();
    let shared = Arc::new(Shared {
        connects: AtomicUsize::new(0),
        behavior: Mutex::new(Behavior::default()),
        accept_tx,
    });

    let transport: TransportPtr = Arc::new(MemoryTransport {
        shared: Arc::clone(&shared),
    });

    (transport, MemoryBackend { shared, accept_rx })
}
