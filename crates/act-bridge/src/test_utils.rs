//! A minimal peer harness speaking the contract in spec.md §6, standing in
//! for a real browser extension in integration tests.
use std::net::SocketAddr;

use act_protocol::Frame;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A test double for the Extension Client collaborator.
pub struct MockPeer {
    stream: WsStream,
}

impl MockPeer {
    /// Open a WebSocket connection to a bridge listening at `addr`.
    pub async fn connect(addr: SocketAddr) -> Self {
        let url = format!("ws://{addr}");
        let (stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .expect("mock peer failed to connect");
        Self { stream }
    }

    /// Send an arbitrary frame.
    pub async fn send(&mut self, frame: &Frame) {
        let text = serde_json::to_string(frame).expect("frame serializes");
        self.stream
            .send(Message::Text(text.into()))
            .await
            .expect("mock peer send failed");
    }

    /// Send `auth` and return the `auth_result` the bridge replies with.
    pub async fn authenticate(&mut self, token: &str, extension_id: Option<&str>) -> Frame {
        self.authenticate_with_origins(token, extension_id, None).await
    }

    /// Send `auth` carrying origins to union-extend the allowlist with, and
    /// return the `auth_result` the bridge replies with.
    pub async fn authenticate_with_origins(
        &mut self,
        token: &str,
        extension_id: Option<&str>,
        allowed_origins: Option<Vec<String>>,
    ) -> Frame {
        self.send(&Frame::Auth {
            token: token.to_string(),
            extension_id: extension_id.map(str::to_string),
            allowed_origins,
        })
        .await;
        self.recv().await
    }

    /// Receive and parse the next frame.
    pub async fn recv(&mut self) -> Frame {
        loop {
            let message = self
                .stream
                .next()
                .await
                .expect("mock peer connection closed unexpectedly")
                .expect("mock peer websocket error");
            let Message::Text(text) = message else {
                continue;
            };
            return serde_json::from_str(&text.to_string())
                .expect("bridge sent a malformed frame");
        }
    }

    /// Reply to a dispatched command with a success response.
    pub async fn respond_success(&mut self, id: impl Into<String>, data: Value) {
        self.send(&Frame::Response {
            id: id.into(),
            success: true,
            data: Some(data),
            error: None,
        })
        .await;
    }

    /// Reply to a dispatched command with a failure response.
    pub async fn respond_error(&mut self, id: impl Into<String>, error: impl Into<String>) {
        self.send(&Frame::Response {
            id: id.into(),
            success: false,
            data: None,
            error: Some(error.into()),
        })
        .await;
    }

    /// Drop the connection without replying to anything in flight.
    pub async fn disconnect(mut self) {
        let _ = self.stream.close(None).await;
    }
}
