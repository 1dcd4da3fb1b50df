//! Transport implementations.
//!
//! Concrete implementations of the domain-level `Transport` trait, exposed
//! only through constructor functions. Domain code must not depend on
//! transport-specific types.

pub mod memory;
mod websocket;

pub use memory::create_transport as create_memory_transport;
pub use websocket::create_transport as create_websocket_transport;
