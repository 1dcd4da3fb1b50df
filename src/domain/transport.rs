// src/domain/transport.rs

//! Transport domain abstractions.
//!
//! A transport knows how to open one bidirectional text-frame session to an
//! endpoint. It does not know about correlation ids, pending requests or
//! timeouts; those live in the client. Concrete implementations live under
//! `src/transport/`.
use crate::Result;
use std::sync::Arc;

use tokio::sync::mpsc;

/// Something the session reports back to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// One complete inbound text frame.
    Frame(String),

    /// A transport-level error. The session may or may not survive it; the
    /// inbox closing is the authoritative end-of-session signal.
    Error(String),
}

/// A live session returned by [`Transport::connect`].
///
/// - Sending on `outbox` transmits one frame. Dropping every `outbox`
///   sender asks the transport to shut the session down.
/// - `inbox` yields inbound events and returns `None` once the session has
///   ended, whether closed by either side or dropped by the network.
#[derive(Debug)]
pub struct TransportSession {
    // ---
    pub outbox: mpsc::Sender<String>,
    pub inbox: mpsc::Receiver<TransportEvent>,
}

/// Transport abstraction.
///
/// Implementations must ensure that:
/// - `connect()` resolves only once the session is ready to carry frames,
///   and fails if the transport reports an error before that point.
/// - frames sent on the outbox are written in the order they were queued.
/// - the inbox closes when the session ends.
///
/// Reconnect policy is not part of this contract; the caller decides when
/// to call `connect()` again.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    // ---
    /// Establish one session to `endpoint`.
    async fn connect(&self, endpoint: &str) -> Result<TransportSession>;
}

/// Shared transport pointer.
///
/// Cheap to clone; one transport may serve any number of connections.
pub type TransportPtr = Arc<dyn Transport>;
