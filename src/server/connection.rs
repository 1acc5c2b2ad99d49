//! Per-connection WebSocket handling
//!
//! Each accepted socket runs one reader loop and, when it joined a
//! broadcast channel, one writer task draining its subscriber queue:
//!
//! ```text
//!               ┌──────────── reader ────────────┐
//! WebSocket ──► │ /control text ─► ControlRouter  │
//!               │ other paths   ─► ignored        │
//!               └────────────────────────────────┘
//!               ┌──────────── writer ────────────┐
//! WebSocket ◄── │ subscriber rx ◄── registry      │
//!               └────────────────────────────────┘
//! ```
//!
//! Whichever side finishes first ends the connection, and the subscriber
//! handle is removed from its channel before `run` returns.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::control::ControlRouter;
use crate::error::Result;
use crate::registry::{BroadcastFrame, Channel, ChannelRegistry, FrameKind};

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;
type WsStream = SplitStream<WebSocketStream<TcpStream>>;

/// One subscriber connection
pub struct Connection {
    session_id: u64,
    peer_addr: SocketAddr,
    registry: Arc<ChannelRegistry>,
    router: ControlRouter,
}

impl Connection {
    pub fn new(
        session_id: u64,
        peer_addr: SocketAddr,
        registry: Arc<ChannelRegistry>,
        router: ControlRouter,
    ) -> Self {
        Self {
            session_id,
            peer_addr,
            registry,
            router,
        }
    }

    /// Complete the WebSocket handshake and serve the connection until it closes
    pub async fn run(self, socket: TcpStream) -> Result<()> {
        let mut path = String::new();
        let capture_path =
            |req: &Request, resp: Response| -> std::result::Result<Response, ErrorResponse> {
                path = req.uri().path().to_string();
                Ok(resp)
            };
        let ws = tokio_tungstenite::accept_hdr_async(socket, capture_path).await?;

        tracing::info!(
            session_id = self.session_id,
            peer = %self.peer_addr,
            path = %path,
            "WebSocket connection"
        );

        let (sink, stream) = ws.split();
        let (handle, rx) = self.registry.new_subscriber();
        let subscriber_id = handle.id();

        let Some(channel) = self.registry.subscribe_path(&path, handle).await else {
            // Accepted, but never receives broadcast traffic
            drop(rx);
            self.read_loop(stream, None).await;
            return Ok(());
        };

        let mut writer = tokio::spawn(write_loop(sink, rx, self.session_id));

        tokio::select! {
            _ = self.read_loop(stream, Some(channel)) => {
                writer.abort();
            }
            _ = &mut writer => {}
        }

        self.registry.unsubscribe(channel, subscriber_id).await;
        tracing::debug!(
            session_id = self.session_id,
            channel = %channel,
            "Subscriber disconnected"
        );

        Ok(())
    }

    async fn read_loop(&self, mut stream: WsStream, channel: Option<Channel>) {
        while let Some(message) = stream.next().await {
            match message {
                Ok(Message::Text(text)) if channel == Some(Channel::Control) => {
                    match self.router.handle_text(&text) {
                        Ok(command) => {
                            tracing::trace!(
                                session_id = self.session_id,
                                command = command.kind(),
                                "Control message"
                            );
                        }
                        Err(e) => {
                            tracing::warn!(
                                session_id = self.session_id,
                                error = %e,
                                "Dropping malformed control message"
                            );
                        }
                    }
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(
                        session_id = self.session_id,
                        error = %e,
                        "WebSocket read error"
                    );
                    break;
                }
            }
        }
    }
}

/// Forward queued frames to the socket until either side closes
async fn write_loop(mut sink: WsSink, mut rx: mpsc::Receiver<BroadcastFrame>, session_id: u64) {
    while let Some(frame) = rx.recv().await {
        let message = match frame.kind {
            FrameKind::Binary => Message::Binary(frame.data.to_vec()),
            FrameKind::Text => match String::from_utf8(frame.data.to_vec()) {
                Ok(text) => Message::Text(text),
                Err(e) => {
                    tracing::warn!(
                        session_id = session_id,
                        error = %e,
                        "Skipping non UTF-8 text frame"
                    );
                    continue;
                }
            },
        };

        if let Err(e) = sink.send(message).await {
            tracing::debug!(session_id = session_id, error = %e, "WebSocket write error");
            break;
        }
    }

    let _ = sink.close().await;
}
