//! Wire envelope shared with the backend.
//!
//! Outbound frames carry `method`, `params` and `id`; inbound frames carry
//! `id` plus either `result` or `error.message`. Anything else the backend
//! sends alongside is ignored.
mod message;

pub use message::{ErrorBody, RpcRequest, RpcResponse};
