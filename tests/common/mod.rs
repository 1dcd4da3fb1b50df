#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use huly_rpc::{create_memory_transport, MemoryBackend, MemoryPeer, RpcClient, RpcConfig};
use serde_json::Value;
use tokio::task::JoinHandle;

pub const ENDPOINT: &str = "memory://huly";

/// Client over a fresh in-memory transport, plus the backend serving it.
pub fn memory_client(timeout: Duration) -> (RpcClient, MemoryBackend) {
    // ---
    let (transport, backend) = create_memory_transport();
    let config = RpcConfig::new(ENDPOINT).with_request_timeout(timeout);
    (RpcClient::new(config, transport), backend)
}

/// One request as the backend sees it.
#[derive(Debug, Clone)]
pub struct Seen {
    pub id: String,
    pub method: String,
    pub params: Value,
}

impl Seen {
    pub fn parse(frame: &Value) -> Self {
        // ---
        Self {
            id: frame["id"].as_str().unwrap().to_string(),
            method: frame["method"].as_str().unwrap().to_string(),
            params: frame["params"].clone(),
        }
    }
}

/// Read the next request from `peer` and parse it.
pub async fn next_request(peer: &mut MemoryPeer) -> Seen {
    Seen::parse(&peer.recv_request().await.unwrap())
}

type Reply = Arc<dyn Fn(&Seen) -> Result<Value, String> + Send + Sync>;

/// Scripted backend: answers every request on every session with `reply`.
///
/// Requests are recorded in arrival order and returned from the handle.
pub struct Scripted {
    pub log: Arc<std::sync::Mutex<Vec<Seen>>>,
    pub task: JoinHandle<()>,
}

impl Scripted {
    pub fn methods(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .map(|seen| seen.method.clone())
            .collect()
    }

    pub fn requests(&self) -> Vec<Seen> {
        self.log.lock().unwrap().clone()
    }
}

impl Drop for Scripted {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub fn scripted<F>(mut backend: MemoryBackend, reply: F) -> Scripted
where
    F: Fn(&Seen) -> Result<Value, String> + Send + Sync + 'static,
{
    // ---
    let reply: Reply = Arc::new(reply);
    let log = Arc::new(std::sync::Mutex::new(Vec::new()));
    let task_log = Arc::clone(&log);

    let task = tokio::spawn(async move {
        while let Some(mut peer) = backend.accept().await {
            let reply = Arc::clone(&reply);
            let log = Arc::clone(&task_log);
            tokio::spawn(async move {
                while let Some(frame) = peer.recv_request().await {
                    let seen = Seen::parse(&frame);
                    log.lock().unwrap().push(seen.clone());
                    match reply(&seen) {
                        Ok(result) => peer.reply_result(&seen.id, result).await,
                        Err(message) => peer.reply_error(&seen.id, &message).await,
                    };
                }
            });
        }
    });

    Scripted { log, task }
}
