//! Connection management.
//!
//! A [`Connection`] keeps zero-or-one live transport session to a fixed
//! endpoint and reports inbound traffic to a [`FrameHandler`]. It never
//! reconnects on its own: after the session ends the state reverts to
//! `Disconnected` and the next [`Connection::open`] starts a fresh attempt.
//!
//! # Single-flight connect
//!
//! The attempt itself runs in a spawned task and publishes its outcome on a
//! `watch` channel. Every `open()` issued while the attempt is in flight
//! waits on that channel instead of starting another one, and a caller that
//! gives up waiting does not abort the attempt for the others.
//!
//! # Sessions and generations
//!
//! Each attempt gets a generation number. Handler callbacks carry the
//! generation of the session that produced them, so a late close event from
//! an old session cannot be mistaken for the current one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::AbortHandle;

use crate::{
    //
    Result,
    RpcError,
    TransportEvent,
    TransportPtr,
    TransportSession,
};

/// Observable connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    Closing,
}

/// Capability interface through which a connection reports inbound traffic.
///
/// The connection knows nothing about what the handler does with frames.
pub trait FrameHandler: Send + Sync {
    /// One inbound frame from session `generation`.
    fn on_frame(&self, generation: u64, frame: String);

    /// A transport error reported by session `generation`.
    fn on_error(&self, generation: u64, error: String);

    /// Session `generation` ended without being asked to.
    fn on_close(&self, generation: u64);
}

/// Write side of an open session.
#[derive(Debug, Clone)]
pub struct Link {
    generation: u64,
    outbox: mpsc::Sender<String>,
}

impl Link {
    /// Generation of the session this link writes to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Transmit one frame.
    ///
    /// # Errors
    ///
    /// `RpcError::ConnectionLost` if the session has already ended.
    pub async fn send(&self, frame: String) -> Result<()> {
        self.outbox
            .send(frame)
            .await
            .map_err(|_| RpcError::ConnectionLost)
    }

    fn is_closed(&self) -> bool {
        self.outbox.is_closed()
    }
}

type ConnectOutcome = std::result::Result<Link, String>;

enum State {
    Disconnected,
    Connecting {
        generation: u64,
        done: watch::Receiver<Option<ConnectOutcome>>,
    },
    Open {
        link: Link,
        reader: AbortHandle,
    },
    Closing,
}

struct Shared {
    // ---
    endpoint: String,
    transport: TransportPtr,
    connect_timeout: Duration,
    handler: Weak<dyn FrameHandler>,
    state: Mutex<State>,
    generations: AtomicU64,
}

/// Acquire a mutex guard, ignoring poisoning.
///
/// The state is a single enum; a panic while it is held leaves at worst a
/// stale value that the next open or close overwrites.
fn lock_ignore_poison<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // ---
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Zero-or-one live transport session to one endpoint.
pub struct Connection {
    shared: Arc<Shared>,
}

impl Connection {
    // ---
    /// Create a disconnected connection. Nothing is dialed until `open()`.
    ///
    /// Each connect attempt is abandoned after `connect_timeout`.
    pub fn new(
        endpoint: impl Into<String>,
        transport: TransportPtr,
        connect_timeout: Duration,
        handler: Weak<dyn FrameHandler>,
    ) -> Self {
        // ---
        Self {
            shared: Arc::new(Shared {
                endpoint: endpoint.into(),
                transport,
                connect_timeout,
                handler,
                state: Mutex::new(State::Disconnected),
                generations: AtomicU64::new(0),
            }),
        }
    }

    /// Endpoint this connection dials.
    pub fn endpoint(&self) -> &str {
        &self.shared.endpoint
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        // ---
        match &*lock_ignore_poison(&self.shared.state) {
            State::Disconnected => ConnectionState::Disconnected,
            State::Connecting { .. } => ConnectionState::Connecting,
            State::Open { link, .. } if link.is_closed() => ConnectionState::Disconnected,
            State::Open { .. } => ConnectionState::Open,
            State::Closing => ConnectionState::Closing,
        }
    }

    /// True iff a session exists and is open.
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Make sure a session is open and return its write side.
    ///
    /// Resolves immediately when already open. Otherwise starts a connect
    /// attempt, or joins the one already in flight, and resolves when the
    /// transport reports ready.
    ///
    /// # Errors
    ///
    /// `RpcError::Connect` if the transport fails before becoming ready, the
    /// attempt outlives the connect timeout, or it is cancelled by `close()`.
    pub async fn open(&self) -> Result<Link> {
        // ---
        let mut done = {
            let mut state = lock_ignore_poison(&self.shared.state);

            if let State::Open { link, .. } = &*state {
                if !link.is_closed() {
                    return Ok(link.clone());
                }
            }

            if let State::Connecting { done, .. } = &*state {
                done.clone()
            } else {
                let generation = self.shared.generations.fetch_add(1, Ordering::SeqCst) + 1;
                let (tx, rx) = watch::channel(None);

                *state = State::Connecting {
                    generation,
                    done: rx.clone(),
                };

                log_debug!("{}: connecting (generation {generation})", self.shared.endpoint);
                tokio::spawn(Shared::establish(Arc::clone(&self.shared), generation, tx));
                rx
            }
        };

        let outcome = done
            .wait_for(|outcome| outcome.is_some())
            .await
            .map_err(|_| RpcError::Connect("connect attempt abandoned".into()))?;

        match &*outcome {
            Some(Ok(link)) => Ok(link.clone()),
            Some(Err(reason)) => Err(RpcError::Connect(reason.clone())),
            None => Err(RpcError::Connect("connect attempt abandoned".into())),
        }
    }

    /// Shut the current session down, if any. Idempotent.
    ///
    /// Requests already on the wire are not failed here; they settle by
    /// response or timeout.
    pub fn close(&self) {
        // ---
        let previous = {
            let mut state = lock_ignore_poison(&self.shared.state);
            std::mem::replace(&mut *state, State::Closing)
        };

        match previous {
            State::Open { link, reader } => {
                log_info!("{}: closing session {}", self.shared.endpoint, link.generation);
                reader.abort();
                drop(link);
            }
            State::Connecting { generation, .. } => {
                log_debug!("{}: abandoning connect attempt {generation}", self.shared.endpoint);
            }
            State::Disconnected | State::Closing => {}
        }

        let mut state = lock_ignore_poison(&self.shared.state);
        if matches!(*state, State::Closing) {
            *state = State::Disconnected;
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

impl Shared {
    // ---
    async fn establish(
        shared: Arc<Shared>,
        generation: u64,
        done: watch::Sender<Option<ConnectOutcome>>,
    ) {
        // ---
        let connecting = shared.transport.connect(&shared.endpoint);
        let connected = match tokio::time::timeout(shared.connect_timeout, connecting).await {
            Ok(connected) => connected,
            Err(_elapsed) => Err(RpcError::Connect(format!(
                "{}: no session after {:?}",
                shared.endpoint, shared.connect_timeout
            ))),
        };

        let outcome = match connected {
            Ok(session) => shared.install(generation, session),
            Err(err) => {
                log_error!("{}: connect failed: {err}", shared.endpoint);
                shared.reset_if_connecting(generation);
                Err(match err {
                    RpcError::Connect(reason) => reason,
                    other => other.to_string(),
                })
            }
        };

        let _ = done.send(Some(outcome));
    }

    /// Move from `Connecting` to `Open` for this attempt, unless a `close()`
    /// got there first.
    fn install(self: &Arc<Self>, generation: u64, session: TransportSession) -> ConnectOutcome {
        // ---
        let TransportSession { outbox, inbox } = session;
        let link = Link { generation, outbox };

        let mut state = lock_ignore_poison(&self.state);

        let current = matches!(
            &*state,
            State::Connecting { generation: g, .. } if *g == generation
        );
        if !current {
            return Err("connection closed while connecting".into());
        }

        let reader = tokio::spawn(Self::read_loop(Arc::clone(self), generation, inbox));

        *state = State::Open {
            link: link.clone(),
            reader: reader.abort_handle(),
        };

        log_info!("{}: session {generation} open", self.endpoint);
        Ok(link)
    }

    fn reset_if_connecting(&self, generation: u64) {
        // ---
        let mut state = lock_ignore_poison(&self.state);
        if matches!(&*state, State::Connecting { generation: g, .. } if *g == generation) {
            *state = State::Disconnected;
        }
    }

    async fn read_loop(
        shared: Arc<Shared>,
        generation: u64,
        mut inbox: mpsc::Receiver<TransportEvent>,
    ) {
        // ---
        while let Some(event) = inbox.recv().await {
            let Some(handler) = shared.handler.upgrade() else {
                return;
            };

            match event {
                TransportEvent::Frame(frame) => handler.on_frame(generation, frame),
                TransportEvent::Error(error) => {
                    log_warn!("{}: transport error: {error}", shared.endpoint);
                    handler.on_error(generation, error);
                }
            }
        }

        let ended_current = {
            let mut state = lock_ignore_poison(&shared.state);
            let is_current = matches!(
                &*state,
                State::Open { link, .. } if link.generation == generation
            );
            if is_current {
                *state = State::Disconnected;
            }
            is_current
        };

        // A newer attempt may already have replaced this session; its
        // requests still have to be failed.
        if ended_current {
            log_warn!("{}: session {generation} closed by transport", shared.endpoint);
        } else {
            log_debug!("{}: superseded session {generation} ended", shared.endpoint);
        }

        if let Some(handler) = shared.handler.upgrade() {
            handler.on_close(generation);
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::create_memory_transport;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        frames: Mutex<Vec<(u64, String)>>,
        closes: Mutex<Vec<u64>>,
    }

    impl FrameHandler for Recorder {
        fn on_frame(&self, generation: u64, frame: String) {
            self.frames.lock().unwrap().push((generation, frame));
        }

        fn on_error(&self, _generation: u64, _error: String) {}

        fn on_close(&self, generation: u64) {
            self.closes.lock().unwrap().push(generation);
        }
    }

    fn connection(transport: TransportPtr, recorder: &Arc<Recorder>) -> Connection {
        // ---
        let weak: Weak<Recorder> = Arc::downgrade(recorder);
        let handler: Weak<dyn FrameHandler> = weak;
        Connection::new("memory://test", transport, Duration::from_secs(5), handler)
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        // ---
        let (transport, mut backend) = create_memory_transport();
        let recorder = Arc::new(Recorder::default());
        let conn = connection(transport, &recorder);

        assert_eq!(conn.state(), ConnectionState::Disconnected);

        let first = conn.open().await.unwrap();
        let _peer = backend.accept().await.unwrap();
        assert!(conn.is_open());

        let second = conn.open().await.unwrap();
        assert_eq!(first.generation(), second.generation());
        assert_eq!(backend.connect_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_open_shares_one_attempt() {
        // ---
        let (transport, backend) = create_memory_transport();
        backend.set_connect_delay(Some(Duration::from_millis(50)));

        let recorder = Arc::new(Recorder::default());
        let conn = connection(transport, &recorder);

        let (a, b) = tokio::join!(conn.open(), conn.open());
        assert_eq!(a.unwrap().generation(), b.unwrap().generation());
        assert_eq!(backend.connect_attempts(), 1);
    }

    #[tokio::test]
    async fn test_failed_connect_reverts_to_disconnected() {
        // ---
        let (transport, backend) = create_memory_transport();
        backend.refuse_connections(Some("refused"));

        let recorder = Arc::new(Recorder::default());
        let conn = connection(transport, &recorder);

        let err = conn.open().await.unwrap_err();
        assert!(matches!(err, RpcError::Connect(ref msg) if msg.contains("refused")));
        assert_eq!(conn.state(), ConnectionState::Disconnected);

        backend.refuse_connections(None);
        conn.open().await.unwrap();
        assert_eq!(backend.connect_attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_connect_is_abandoned() {
        // ---
        let (transport, backend) = create_memory_transport();
        backend.set_connect_delay(Some(Duration::from_secs(24 * 60 * 60)));

        let recorder = Arc::new(Recorder::default());
        let conn = connection(transport, &recorder);

        let started = tokio::time::Instant::now();
        let err = conn.open().await.unwrap_err();

        assert!(matches!(err, RpcError::Connect(ref msg) if msg.contains("no session after")));
        assert!(started.elapsed() >= Duration::from_secs(5));
        assert!(started.elapsed() < Duration::from_secs(6));
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_superseded_session_still_reports_close() {
        // ---
        let (transport, mut backend) = create_memory_transport();
        let recorder = Arc::new(Recorder::default());
        let conn = connection(transport, &recorder);

        let old = conn.open().await.unwrap();
        let peer = backend.accept().await.unwrap();
        peer.disconnect();

        // The dead link is noticed before the reader sees the end of stream.
        let new = conn.open().await.unwrap();
        assert_ne!(old.generation(), new.generation());
        let _peer = backend.accept().await.unwrap();

        for _ in 0..100 {
            if !recorder.closes.lock().unwrap().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert_eq!(*recorder.closes.lock().unwrap(), vec![old.generation()]);
        assert!(conn.is_open());
    }

    #[tokio::test]
    async fn test_frames_and_remote_close_reach_handler() {
        // ---
        let (transport, mut backend) = create_memory_transport();
        let recorder = Arc::new(Recorder::default());
        let conn = connection(transport, &recorder);

        let link = conn.open().await.unwrap();
        let peer = backend.accept().await.unwrap();

        assert!(peer.send_raw("hello").await);
        peer.disconnect();

        for _ in 0..100 {
            if !recorder.closes.lock().unwrap().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert_eq!(
            *recorder.frames.lock().unwrap(),
            vec![(link.generation(), "hello".to_string())]
        );
        assert_eq!(*recorder.closes.lock().unwrap(), vec![link.generation()]);
        assert!(!conn.is_open());
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_silent() {
        // ---
        let (transport, mut backend) = create_memory_transport();
        let recorder = Arc::new(Recorder::default());
        let conn = connection(transport, &recorder);

        conn.open().await.unwrap();
        let mut peer = backend.accept().await.unwrap();

        conn.close();
        conn.close();
        assert_eq!(conn.state(), ConnectionState::Disconnected);

        // Outbox dropped: the backend sees the end of the request stream.
        assert_eq!(peer.recv_frame().await, None);
        assert!(recorder.closes.lock().unwrap().is_empty());
    }
}
