//! Discovery handshake endpoint and WebSocket accept loop.
//!
//! A [`TransportListener`] serves the one-shot discovery handshake:
//! a peer issues `GET /` against the well-known HTTP port and receives
//! `{"ProtocolVersion": 1, "WebSocketPort": <port>}`. Each handshake
//! binds a fresh ephemeral WebSocket listener, advertises its port in
//! the response, and hands the first negotiated peer channel to the
//! connection handler as a [`Connection`].
//!
//! Binding on an already-used handshake port is the one tolerated
//! failure: another editor instance is serving peers, so this listener
//! logs and stays inert instead of crashing the host. Any other bind
//! error propagates as fatal.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::connection::Connection;
use crate::core::{DEFAULT_HTTP_PORT, ListenerError, PROTOCOL_VERSION};
use crate::protocol::{HandshakeError, HandshakeReply};

/// Handler invoked once per fully negotiated peer channel.
pub type ConnectionHandler = Arc<dyn Fn(Connection) + Send + Sync>;

/// Listener configuration.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Port for the discovery handshake endpoint. Port 0 picks an
    /// ephemeral port (useful in tests).
    pub http_port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
        }
    }
}

#[derive(Clone)]
struct HandshakeState {
    handler: ConnectionHandler,
}

/// Accepts peers and yields [`Connection`]s to the handler.
pub struct TransportListener {
    local_addr: Option<SocketAddr>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
}

impl TransportListener {
    /// Bind the handshake endpoint and start accepting peers.
    ///
    /// If the port is already in use the listener logs a warning and
    /// comes up inert ([`local_addr`](Self::local_addr) returns
    /// `None`); any other bind failure is returned as fatal.
    pub async fn bind(
        config: ListenerConfig,
        handler: ConnectionHandler,
    ) -> Result<Self, ListenerError> {
        let listener =
            match TcpListener::bind(("127.0.0.1", config.http_port)).await {
                Ok(listener) => listener,
                Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                    warn!(
                        port = config.http_port,
                        "handshake port already in use, listener stays inert"
                    );
                    return Ok(Self {
                        local_addr: None,
                        shutdown: Mutex::new(None),
                    });
                }
                Err(e) => return Err(ListenerError::Bind(e)),
            };

        let local_addr = listener.local_addr()?;
        info!(%local_addr, "discovery handshake endpoint bound");

        let app = Router::new()
            .route("/", get(handshake))
            .with_state(HandshakeState { handler });

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = serve.await {
                warn!("handshake endpoint stopped: {e}");
            }
        });

        Ok(Self {
            local_addr: Some(local_addr),
            shutdown: Mutex::new(Some(shutdown_tx)),
        })
    }

    /// Address the handshake endpoint is bound to, or `None` when the
    /// listener came up inert.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Stop accepting new peers. Idempotent.
    ///
    /// Existing connections are untouched; their sessions run until
    /// their own teardown.
    pub fn close(&self) {
        let tx = self.shutdown.lock().ok().and_then(|mut g| g.take());
        if let Some(tx) = tx {
            let _ = tx.send(());
        }
    }
}

impl Drop for TransportListener {
    fn drop(&mut self) {
        self.close();
    }
}

/// Serve one discovery handshake: bind an ephemeral WebSocket listener
/// and advertise its port.
async fn handshake(State(state): State<HandshakeState>) -> Response {
    let ws_listener = match TcpListener::bind(("127.0.0.1", 0)).await {
        Ok(listener) => listener,
        Err(e) => {
            warn!("failed to bind peer channel listener: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HandshakeError {
                    error: format!("unable to listen: {e}"),
                }),
            )
                .into_response();
        }
    };

    let port = match ws_listener.local_addr() {
        Ok(addr) => addr.port(),
        Err(e) => {
            warn!("failed to read peer channel address: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HandshakeError {
                    error: format!("unable to listen: {e}"),
                }),
            )
                .into_response();
        }
    };

    debug!(port, "advertising peer channel");
    tokio::spawn(accept_peer(ws_listener, state.handler.clone()));

    Json(HandshakeReply {
        protocol_version: PROTOCOL_VERSION,
        web_socket_port: port,
    })
    .into_response()
}

/// Accept and negotiate the single peer the handshake advertised.
async fn accept_peer(listener: TcpListener, handler: ConnectionHandler) {
    let stream = match listener.accept().await {
        Ok((stream, peer)) => {
            debug!(%peer, "peer channel accepted");
            stream
        }
        Err(e) => {
            warn!("peer channel accept failed: {e}");
            return;
        }
    };

    match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => handler(Connection::spawn(ws)),
        Err(e) => warn!("peer channel negotiation failed: {e}"),
    }
}
