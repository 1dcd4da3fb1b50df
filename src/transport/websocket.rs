//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! ## Concurrency model
//!
//! Each successful `connect()` spawns one **actor task** that owns the
//! socket. The actor is the only code that touches the stream:
//!
//! - frames queued on the session outbox are written as text messages,
//! - inbound text (and UTF-8 binary) messages are forwarded to the inbox,
//! - when every outbox sender is dropped it sends a close frame and exits,
//! - when the peer closes or the socket errors it exits, closing the inbox.
//!
//! Ping/pong is answered by tungstenite itself.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

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

type Socket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Transport that opens a fresh WebSocket per connect.
#[derive(Debug, Default)]
pub struct WebSocketTransport;

#[async_trait::async_trait]
impl Transport for WebSocketTransport {
    // ---
    async fn connect(&self, endpoint: &str) -> Result<TransportSession> {
        // ---
        let (socket, _response) = tokio_tungstenite::connect_async(endpoint)
            .await
            .map_err(|err| RpcError::Connect(format!("{endpoint}: {err}")))?;

        log_info!("connected to {endpoint}");

        let (out_tx, out_rx) = mpsc::channel(CHANNEL_DEPTH);
        let (in_tx, in_rx) = mpsc::channel(CHANNEL_DEPTH);

        tokio::spawn(run_actor(endpoint.to_string(), socket, out_rx, in_tx));

        Ok(TransportSession {
            outbox: out_tx,
            inbox: in_rx,
        })
    }
}

async fn run_actor(
    endpoint: String,
    socket: Socket,
    mut out_rx: mpsc::Receiver<String>,
    in_tx: mpsc::Sender<TransportEvent>,
) {
    // ---
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            outbound = out_rx.recv() => match outbound {
                Some(text) => {
                    if let Err(err) = sink.send(Message::Text(text.into())).await {
                        let _ = in_tx.send(TransportEvent::Error(err.to_string())).await;
                        break;
                    }
                }
                None => {
                    log_debug!("{endpoint}: outbox dropped, closing socket");
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            },

            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    if in_tx.send(TransportEvent::Frame(text.as_str().to_owned())).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Binary(bytes))) => {
                    let event = match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => TransportEvent::Frame(text),
                        Err(err) => TransportEvent::Error(format!("non UTF-8 binary frame: {err}")),
                    };
                    if in_tx.send(event).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_frame))) => {
                    log_debug!("{endpoint}: peer closed: {_frame:?}");
                    break;
                }
                Some(Ok(_control)) => {}
                Some(Err(err)) => {
                    let _ = in_tx.send(TransportEvent::Error(err.to_string())).await;
                    break;
                }
                None => break,
            },
        }
    }

    log_info!("disconnected from {endpoint}");
}

/// Create the production WebSocket transport.
pub fn create_transport() -> TransportPtr {
    std::sync::Arc::new(WebSocketTransport)
}
