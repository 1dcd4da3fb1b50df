//! Multiplexed RPC over one persistent WebSocket to the Huly backend.
//!
//! Many concurrent requests share a single connection. Each request carries
//! a correlation ID, responses are matched back to callers in whatever order
//! they arrive, and every request has its own timeout.
//!
//! Around that core sit the typed [`huly`] API, the plugin [`catalog`] and
//! the manifest [`server`].
//!

// Logging macros must be declared before the modules that use them.
#[macro_use]
mod macros;

mod client;
mod domain;
mod protocol;
mod transport;

mod connection;
mod correlation;
mod error;
mod registry;
mod rpc_config;
mod settings;

pub mod catalog;
pub mod huly;
pub mod server;

// Re-export main types
pub use client::RpcClient;
pub use connection::{Connection, ConnectionState, FrameHandler, Link};
pub use registry::{shared_client, ClientRegistry};

pub use rpc_config::{RpcConfig, DEFAULT_REQUEST_TIMEOUT};
pub use settings::{Settings, DEFAULT_HULY_WS_URL};

pub use correlation::CorrelationId;
pub use error::{Result, RpcError};
pub use protocol::{ErrorBody, RpcRequest, RpcResponse};

pub use transport::memory::{MemoryBackend, MemoryPeer};
pub use transport::{create_memory_transport, create_websocket_transport};

// --- public re-exports
pub use domain::{
    //
    Transport,
    TransportEvent,
    TransportPtr,
    TransportSession,
};
