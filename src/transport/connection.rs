//! One peer channel.
//!
//! A [`Connection`] wraps one negotiated WebSocket and exposes exactly
//! the surface the session layer needs: a single-consumer inbound
//! event stream, a cloneable non-blocking [`SendHandle`], and an
//! idempotent [`close`](Connection::close).
//!
//! Two tasks run per connection. The reader decodes inbound text
//! frames into [`Message`]s and forwards them in receipt order over a
//! bounded queue; the writer drains outbound frames into the socket.
//! Malformed inbound frames are logged and dropped, never fatal.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, warn};

use crate::core::EVENT_QUEUE_DEPTH;
use crate::protocol::{Message, Selection};

/// Inbound event on a connection.
#[derive(Debug)]
pub enum ConnectionEvent {
    /// A decoded wire message, delivered in receipt order.
    Message(Message),
    /// The channel closed (either side initiated). Delivered exactly
    /// once, after which the event stream ends.
    Closed,
}

/// Frame queued for the writer task.
enum OutboundFrame {
    /// An encoded wire message.
    Text(String),
    /// Send a close frame and stop writing.
    Close,
}

/// Cloneable, non-blocking sender for one connection.
///
/// Safe to call from synchronous change callbacks: sending only
/// enqueues to the writer task. Once the connection is closed every
/// call degrades to a no-op; it never errors.
#[derive(Clone)]
pub struct SendHandle {
    tx: mpsc::UnboundedSender<OutboundFrame>,
    closed: Arc<AtomicBool>,
}

impl SendHandle {
    /// Encode and transmit a message carrying the full text and the
    /// given selection ranges. No-op on a closed connection.
    pub fn send(&self, text: &str, selections: Vec<Selection>) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        let msg = Message::outbound(text, selections);
        match msg.encode() {
            Ok(payload) => {
                // Receiver gone means the writer already stopped;
                // equivalent to a closed connection.
                let _ = self.tx.send(OutboundFrame::Text(payload));
            }
            Err(e) => warn!("failed to encode outbound message: {e}"),
        }
    }

    /// Close the connection. Idempotent: the first call transmits a
    /// close frame and releases the channel, later calls do nothing.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            let _ = self.tx.send(OutboundFrame::Close);
        }
    }

    /// Whether the connection has been closed (by either side).
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// One peer channel: inbound events plus an outbound sender.
pub struct Connection {
    events: mpsc::Receiver<ConnectionEvent>,
    sender: SendHandle,
}

impl Connection {
    /// Wrap a negotiated WebSocket, spawning its reader and writer
    /// tasks.
    pub fn spawn<S>(ws: WebSocketStream<S>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut sink, mut stream) = ws.split();
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));

        let sender = SendHandle {
            tx: out_tx,
            closed: closed.clone(),
        };

        // Writer: drain outbound frames into the socket.
        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                match frame {
                    OutboundFrame::Text(payload) => {
                        if sink.send(WsMessage::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    OutboundFrame::Close => {
                        // Peer may already be gone; nothing to do then.
                        let _ = sink.send(WsMessage::Close(None)).await;
                        break;
                    }
                }
            }
        });

        // Reader: decode inbound frames in receipt order.
        let reader_sender = sender.clone();
        tokio::spawn(async move {
            while let Some(item) = stream.next().await {
                match item {
                    Ok(WsMessage::Text(payload)) => {
                        match Message::decode(payload.as_bytes()) {
                            Ok(msg) => {
                                if event_tx
                                    .send(ConnectionEvent::Message(msg))
                                    .await
                                    .is_err()
                                {
                                    // Session went away; stop reading.
                                    break;
                                }
                            }
                            Err(e) => {
                                // Drop the frame, keep the session alive.
                                warn!("dropping malformed inbound message: {e}");
                            }
                        }
                    }
                    Ok(WsMessage::Close(_)) => {
                        debug!("peer sent close frame");
                        break;
                    }
                    Ok(WsMessage::Ping(_) | WsMessage::Pong(_)) => {
                        // Handled by tungstenite itself.
                    }
                    Ok(other) => {
                        debug!("ignoring non-text frame: {other:?}");
                    }
                    Err(e) => {
                        debug!("transport error, treating as close: {e}");
                        break;
                    }
                }
            }
            // Whichever side initiated, the channel is now closed:
            // stop the writer and emit the one Closed event.
            reader_sender.close();
            let _ = event_tx.send(ConnectionEvent::Closed).await;
        });

        Self {
            events: event_rx,
            sender,
        }
    }

    /// Receive the next inbound event.
    ///
    /// Single-consumer by construction: events arrive in receipt
    /// order, and `None` means the stream ended (after [`Closed`]).
    ///
    /// [`Closed`]: ConnectionEvent::Closed
    pub async fn recv(&mut self) -> Option<ConnectionEvent> {
        self.events.recv().await
    }

    /// Handle for sending on this connection.
    pub fn sender(&self) -> SendHandle {
        self.sender.clone()
    }

    /// Close the connection. Idempotent.
    pub fn close(&self) {
        self.sender.close();
    }

    /// Whether the connection has been closed.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
