//! Client registry.
//!
//! Hands out one [`RpcClient`] per endpoint. The composition root normally
//! owns a `ClientRegistry` and passes clients (or the registry) down to
//! consumers; [`ClientRegistry::global`] exists for code that cannot be
//! handed one and lives for the whole process.
//!
//! Clients are keyed by endpoint: asking for a second, different endpoint
//! yields a second client rather than silently reusing the first.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, OnceLock};
use std::time::Duration;

use crate::{
    //
    create_websocket_transport,
    RpcClient,
    RpcConfig,
    TransportPtr,
    DEFAULT_REQUEST_TIMEOUT,
};

fn lock_ignore_poison<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // ---
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Lazily built, endpoint-keyed set of clients sharing one transport.
pub struct ClientRegistry {
    // ---
    transport: TransportPtr,
    request_timeout: Duration,
    clients: Mutex<HashMap<String, RpcClient>>,
}

impl ClientRegistry {
    /// Create an empty registry whose clients use `transport`.
    pub fn new(transport: TransportPtr, request_timeout: Duration) -> Self {
        Self {
            transport,
            request_timeout,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Return the client for `endpoint`, constructing it on first use.
    ///
    /// Construction does not connect.
    pub fn client(&self, endpoint: &str) -> RpcClient {
        // ---
        let mut clients = lock_ignore_poison(&self.clients);

        clients
            .entry(endpoint.to_string())
            .or_insert_with(|| {
                log_debug!("registry: creating client for {endpoint}");
                let config = RpcConfig::new(endpoint).with_request_timeout(self.request_timeout);
                RpcClient::new(config, self.transport.clone())
            })
            .clone()
    }

    /// Number of distinct endpoints with a client.
    pub fn len(&self) -> usize {
        lock_ignore_poison(&self.clients).len()
    }

    /// True when no client has been created yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close every client's connection. Clients stay registered and
    /// reconnect on their next request.
    pub fn close_all(&self) {
        // ---
        let clients: Vec<RpcClient> = lock_ignore_poison(&self.clients).values().cloned().collect();
        for client in clients {
            client.disconnect();
        }
    }

    /// Process-wide registry over the WebSocket transport with the default
    /// request timeout. Built on first use and never torn down.
    pub fn global() -> &'static ClientRegistry {
        static GLOBAL: OnceLock<ClientRegistry> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            ClientRegistry::new(create_websocket_transport(), DEFAULT_REQUEST_TIMEOUT)
        })
    }
}

/// Shorthand for `ClientRegistry::global().client(endpoint)`.
pub fn shared_client(endpoint: &str) -> RpcClient {
    ClientRegistry::global().client(endpoint)
}
