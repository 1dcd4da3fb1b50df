//! Domain layer public interface.
//!
//! Abstractions here are independent of any concrete protocol library.
//! All domain consumers import symbols via this module.

mod transport;

pub use transport::{
    //
    Transport,
    TransportEvent,
    TransportPtr,
    TransportSession,
};
