//! Ghostwire - High-level server API.
//!
//! [`GhostServer`] wires the pieces together: it binds the discovery
//! handshake endpoint, and for every negotiated peer channel spawns a
//! [`SyncSession`] against the injected editor surface. Sessions share
//! no mutable state; a failure in one is contained there.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::debug;

use crate::core::{ConnectionCounter, EditorSurface, ListenerError, NoopCounter};
use crate::core::DEFAULT_HTTP_PORT;
use crate::session::{SessionRegistry, SyncSession};
use crate::transport::{ListenerConfig, TransportListener};

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Port for the discovery handshake endpoint.
    pub http_port: u16,
    /// The editor surface sessions open documents on.
    pub surface: Arc<dyn EditorSurface>,
    /// Diagnostic connection counter.
    pub counter: Arc<dyn ConnectionCounter>,
}

/// Builder for a [`GhostServer`].
pub struct GhostServerBuilder {
    config: ServerConfig,
}

impl GhostServerBuilder {
    /// Start from the given editor surface and defaults everywhere
    /// else (well-known handshake port, no-op counter).
    pub fn new(surface: Arc<dyn EditorSurface>) -> Self {
        Self {
            config: ServerConfig {
                http_port: DEFAULT_HTTP_PORT,
                surface,
                counter: Arc::new(NoopCounter),
            },
        }
    }

    /// Set the handshake port. Port 0 picks an ephemeral port.
    pub fn http_port(mut self, port: u16) -> Self {
        self.config.http_port = port;
        self
    }

    /// Set the diagnostic connection counter.
    pub fn counter(mut self, counter: Arc<dyn ConnectionCounter>) -> Self {
        self.config.counter = counter;
        self
    }

    /// Build the server configuration.
    pub fn build(self) -> ServerConfig {
        self.config
    }
}

/// A running Ghostwire server.
pub struct GhostServer {
    listener: TransportListener,
    registry: SessionRegistry,
}

impl GhostServer {
    /// Bind the handshake endpoint and start serving sessions.
    ///
    /// An already-used handshake port leaves the server inert (logged,
    /// not fatal); any other bind failure is returned.
    pub async fn bind(config: ServerConfig) -> Result<Self, ListenerError> {
        let registry = SessionRegistry::new(config.counter.clone());

        let surface = config.surface.clone();
        let session_registry = registry.clone();
        let listener = TransportListener::bind(
            ListenerConfig {
                http_port: config.http_port,
            },
            Arc::new(move |connection| {
                debug!("starting sync session");
                let session = SyncSession::new(
                    connection,
                    surface.clone(),
                    Some(session_registry.register()),
                );
                tokio::spawn(session.run());
            }),
        )
        .await?;

        Ok(Self { listener, registry })
    }

    /// Address of the handshake endpoint, or `None` when inert.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr()
    }

    /// Number of currently live sessions.
    pub fn session_count(&self) -> usize {
        self.registry.active()
    }

    /// Stop accepting new peers. Running sessions continue until their
    /// own teardown. Idempotent.
    pub fn close(&self) {
        self.listener.close();
        self.registry.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use futures::{SinkExt, StreamExt};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    use crate::protocol::{HandshakeReply, Message, Selection};
    use crate::session::testing::FakeSurface;

    async fn handshake(addr: SocketAddr) -> HandshakeReply {
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        let body = response.split_once("\r\n\r\n").unwrap().1;
        serde_json::from_str(body).unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_sync_scenario() {
        let surface = Arc::new(FakeSurface::new());
        let server = GhostServer::bind(
            GhostServerBuilder::new(surface.clone())
                .http_port(0)
                .build(),
        )
        .await
        .unwrap();

        let reply = handshake(server.local_addr().unwrap()).await;
        let url = format!("ws://127.0.0.1:{}/", reply.web_socket_port);
        let (mut ws, _) = tokio_tungstenite::connect_async(url).await.unwrap();

        // First message creates the document.
        ws.send(WsMessage::Text(
            r#"{"text":"hello","selections":[],"title":"t","url":"u","syntax":"markdown"}"#
                .into(),
        ))
        .await
        .unwrap();

        let doc = loop {
            if let Some(doc) = surface.document(0) {
                if doc.current_text() == "hello" {
                    break doc;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        };
        assert_eq!(server.session_count(), 1);

        // Remote update: full replace, cursor applied, no echo.
        ws.send(WsMessage::Text(
            r#"{"text":"hello world","selections":[{"start":11,"end":11}]}"#.into(),
        ))
        .await
        .unwrap();
        while doc.current_text() != "hello world" {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(doc.current_selections(), vec![Selection::caret(11)]);

        // Local edit goes out as exactly one message.
        doc.user_edit("hello world!", vec![Selection::caret(12)]);
        let frame = loop {
            match ws.next().await.unwrap().unwrap() {
                WsMessage::Text(t) => break t,
                _ => continue,
            }
        };
        let msg = Message::decode(frame.as_bytes()).unwrap();
        assert_eq!(msg.text, "hello world!");
        assert_eq!(msg.selections, vec![Selection::caret(12)]);

        // Peer disconnect tears the session down.
        ws.close(None).await.unwrap();
        for _ in 0..200 {
            if server.session_count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(server.session_count(), 0);
        assert!(doc.is_closed());

        server.close();
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let surface = Arc::new(FakeSurface::new());
        let server = GhostServer::bind(
            GhostServerBuilder::new(surface.clone())
                .http_port(0)
                .build(),
        )
        .await
        .unwrap();
        let addr = server.local_addr().unwrap();

        // Two peers, two sessions, two documents.
        let mut peers = Vec::new();
        for i in 0..2 {
            let reply = handshake(addr).await;
            let url = format!("ws://127.0.0.1:{}/", reply.web_socket_port);
            let (mut ws, _) = tokio_tungstenite::connect_async(url).await.unwrap();
            ws.send(WsMessage::Text(format!(r#"{{"text":"doc {i}"}}"#)))
                .await
                .unwrap();
            peers.push(ws);
        }

        for _ in 0..200 {
            if surface.open_count() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(surface.open_count(), 2);
        assert_eq!(server.session_count(), 2);

        // Killing one session leaves the other untouched.
        peers.remove(0).close(None).await.unwrap();
        for _ in 0..200 {
            if server.session_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(server.session_count(), 1);

        let texts: Vec<String> = (0..2)
            .filter_map(|i| surface.document(i))
            .map(|d| d.current_text())
            .collect();
        assert!(texts.contains(&"doc 1".to_string()));
    }
}
