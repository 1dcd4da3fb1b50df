use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

use crate::{CorrelationId, Result, RpcError};

/// What a waiting caller eventually receives.
pub(super) type Outcome = Result<Value>;

/// One outstanding request.
struct PendingEntry {
    // ---
    tx: oneshot::Sender<Outcome>,
    generation: u64,
    timer: AbortHandle,
}

/// Tracks requests waiting for responses.
///
/// Maps correlation IDs to the oneshot sender of the waiting caller plus
/// the abort handle of its timeout task. Every way out of the map (response,
/// timeout, session loss, explicit removal) goes through one lock
/// acquisition that removes the entry, cancels the timer and settles the
/// caller, so the paths are mutually exclusive and each caller is settled
/// at most once.
#[derive(Clone)]
pub(super) struct PendingRequests {
    // ---
    entries: Arc<Mutex<HashMap<CorrelationId, PendingEntry>>>,
}

fn lock_ignore_poison<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // ---
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl PendingRequests {
    // ---

    /// Create a new empty pending requests tracker
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a new pending request sent on session `generation`.
    ///
    /// Picks a correlation ID that is not currently live and arms a timer
    /// that settles the entry with `RpcError::Timeout` after `timeout`.
    /// Must be called inside a tokio runtime.
    pub fn register(
        &self,
        generation: u64,
        timeout: Duration,
    ) -> (CorrelationId, oneshot::Receiver<Outcome>) {
        // ---
        let mut entries = lock_ignore_poison(&self.entries);

        let id = loop {
            let candidate = CorrelationId::generate();
            if !entries.contains_key(&candidate) {
                break candidate;
            }
        };

        let (tx, rx) = oneshot::channel();

        // Spawned under the lock: the timer cannot observe the map before
        // the entry is in it.
        let weak = Arc::downgrade(&self.entries);
        let timer_id = id.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            expire(&weak, &timer_id);
        })
        .abort_handle();

        entries.insert(
            id.clone(),
            PendingEntry {
                tx,
                generation,
                timer,
            },
        );

        (id, rx)
    }

    /// Settle a pending request with the response outcome.
    ///
    /// Returns true if the correlation ID was live. Unknown or expired IDs
    /// are left alone.
    pub fn complete(&self, id: &CorrelationId, outcome: Outcome) -> bool {
        // ---
        let mut entries = lock_ignore_poison(&self.entries);

        match entries.remove(id) {
            Some(entry) => {
                entry.timer.abort();
                if entry.tx.send(outcome).is_err() {
                    log_debug!("response arrived after caller went away (correlation_id: {id})");
                }
                true
            }
            None => false,
        }
    }

    /// Remove a pending request without settling it.
    ///
    /// Used when the request never made it onto the wire.
    pub fn remove(&self, id: &CorrelationId) -> bool {
        // ---
        let mut entries = lock_ignore_poison(&self.entries);

        match entries.remove(id) {
            Some(entry) => {
                entry.timer.abort();
                true
            }
            None => false,
        }
    }

    /// Fail every request sent on session `generation` with `ConnectionLost`.
    ///
    /// Returns how many entries were failed.
    pub fn fail_generation(&self, generation: u64) -> usize {
        // ---
        let mut entries = lock_ignore_poison(&self.entries);

        let ids: Vec<CorrelationId> = entries
            .iter()
            .filter(|(_, entry)| entry.generation == generation)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &ids {
            if let Some(entry) = entries.remove(id) {
                entry.timer.abort();
                let _ = entry.tx.send(Err(RpcError::ConnectionLost));
            }
        }

        ids.len()
    }

    /// Whether `id` is still waiting.
    pub fn contains(&self, id: &CorrelationId) -> bool {
        lock_ignore_poison(&self.entries).contains_key(id)
    }

    /// Get the number of pending requests
    pub fn len(&self) -> usize {
        lock_ignore_poison(&self.entries).len()
    }
}

/// Timer path: settle with `Timeout` if the entry is still live.
fn expire(entries: &Weak<Mutex<HashMap<CorrelationId, PendingEntry>>>, id: &CorrelationId) {
    // ---
    let Some(entries) = entries.upgrade() else {
        return;
    };

    let entry = lock_ignore_poison(&entries).remove(id);

    if let Some(entry) = entry {
        log_debug!("request timed out (correlation_id: {id})");
        let _ = entry.tx.send(Err(RpcError::Timeout));
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use serde_json::json;

    const LONG: Duration = Duration::from_secs(30);

    #[tokio::test]
    async fn test_register_and_complete() {
        // ---
        let pending = PendingRequests::new();
        let (id, rx) = pending.register(1, LONG);
        assert_eq!(pending.len(), 1);

        assert!(pending.complete(&id, Ok(json!("done"))));

        // Should be removed after completion
        assert_eq!(pending.len(), 0);
        assert_eq!(rx.await.unwrap().unwrap(), json!("done"));
    }

    #[tokio::test]
    async fn test_remove() {
        // ---
        let pending = PendingRequests::new();
        let (id, _rx) = pending.register(1, LONG);

        assert!(pending.remove(&id));
        assert_eq!(pending.len(), 0);

        // Second remove should return false
        assert!(!pending.remove(&id));
    }

    #[tokio::test]
    async fn test_complete_unknown_id() {
        // ---
        let pending = PendingRequests::new();
        let unknown = CorrelationId::generate();
        assert!(!pending.complete(&unknown, Ok(Value::Null)));
    }

    #[tokio::test]
    async fn test_distinct_ids_for_concurrent_registrations() {
        // ---
        let pending = PendingRequests::new();
        let mut receivers = Vec::new();
        let mut ids = std::collections::HashSet::new();

        for _ in 0..50 {
            let (id, rx) = pending.register(1, LONG);
            ids.insert(id);
            receivers.push(rx);
        }

        assert_eq!(ids.len(), 50);
        assert_eq!(pending.len(), 50);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_settles_and_removes() {
        // ---
        let pending = PendingRequests::new();
        let (id, rx) = pending.register(1, Duration::from_secs(5));

        let started = tokio::time::Instant::now();
        let outcome = rx.await.unwrap();

        assert!(matches!(outcome, Err(RpcError::Timeout)));
        assert!(started.elapsed() >= Duration::from_secs(5));
        assert!(!pending.contains(&id));

        // Late completion is a no-op.
        assert!(!pending.complete(&id, Ok(Value::Null)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_cancels_timer() {
        // ---
        let pending = PendingRequests::new();
        let (id, rx) = pending.register(1, Duration::from_secs(5));

        assert!(pending.complete(&id, Ok(json!(1))));
        assert_eq!(rx.await.unwrap().unwrap(), json!(1));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(pending.len(), 0);
    }

    #[tokio::test]
    async fn test_fail_generation_only_touches_that_session() {
        // ---
        let pending = PendingRequests::new();
        let (_old, old_rx) = pending.register(1, LONG);
        let (new_id, _new_rx) = pending.register(2, LONG);

        assert_eq!(pending.fail_generation(1), 1);
        assert!(matches!(old_rx.await.unwrap(), Err(RpcError::ConnectionLost)));
        assert!(pending.contains(&new_id));
    }
}
