use std::{net::SocketAddr, sync::Arc};

use act_protocol::Frame;
use futures_util::{SinkExt, StreamExt};
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::tungstenite::{
    Message,
    protocol::{CloseFrame, frame::coding::CloseCode},
};
use tracing::{debug, info, warn};

use crate::{bridge::Inner, error::Error, state::PeerHandle};

/// Per-peer handshake state (spec.md §4.1): `CONNECTED` awaits `auth`;
/// `AUTHENTICATED` accepts `ping` keepalives and `response` frames. An
/// implicit `CLOSED` state is just the end of this function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandshakeState {
    Connected,
    Authenticated,
}

/// Drive one accepted TCP connection through the WebSocket upgrade,
/// handshake, and command/response loop until it closes.
pub(crate) async fn handle(inner: Arc<Inner>, stream: TcpStream, peer_addr: SocketAddr) {
    let ws_stream = match tokio_tungstenite::accept_async(stream).await {
        Ok(stream) => stream,
        Err(err) => {
            warn!(%peer_addr, %err, "websocket handshake failed");
            return;
        }
    };
    let (mut sink, mut stream_in) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    let connection_id = {
        let mut state = inner.state.lock().await;
        if state.peer.is_some() {
            drop(state);
            refuse_secondary(&mut sink).await;
            return;
        }
        state.next_connection_id += 1;
        let id = state.next_connection_id;
        state.peer = Some(PeerHandle {
            sender: tx.clone(),
            connection_id: id,
        });
        state.authenticated = false;
        id
    };

    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if sink.send(message).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    let mut handshake = HandshakeState::Connected;

    while let Some(received) = stream_in.next().await {
        let text = match received {
            Ok(Message::Text(text)) => text.to_string(),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(err) => {
                debug!(%err, "websocket read error, closing connection");
                break;
            }
        };
        let frame: Frame = match serde_json::from_str(&text) {
            Ok(frame) => frame,
            Err(err) => {
                debug!(%err, "dropping malformed frame");
                continue;
            }
        };
        handshake = handle_frame(&inner, &tx, connection_id, handshake, frame).await;
    }

    writer.abort();
    finalize_disconnect(&inner, connection_id).await;
}

async fn refuse_secondary<S>(sink: &mut S)
where
    S: futures_util::Sink<Message> + Unpin,
{
    let close = Message::Close(Some(CloseFrame {
        code: CloseCode::Library(act_protocol::CLOSE_CODE_ALREADY_CONNECTED),
        reason: act_protocol::CLOSE_REASON_ALREADY_CONNECTED.into(),
    }));
    let _ = sink.send(close).await;
}

async fn handle_frame(
    inner: &Arc<Inner>,
    tx: &mpsc::UnboundedSender<Message>,
    connection_id: u64,
    handshake: HandshakeState,
    frame: Frame,
) -> HandshakeState {
    match (handshake, frame) {
        (
            HandshakeState::Connected,
            Frame::Auth {
                token,
                extension_id,
                allowed_origins,
            },
        ) => {
            if tokens_match(&inner.token, &token) {
                if let Some(origins) = allowed_origins {
                    inner.allowlist.extend(origins);
                }
                let result = Frame::AuthResult {
                    success: true,
                    error: None,
                    allowed_origins: Some(inner.allowlist.snapshot()),
                };
                send(tx, &result);
                {
                    let mut state = inner.state.lock().await;
                    if state
                        .peer
                        .as_ref()
                        .is_some_and(|peer| peer.connection_id == connection_id)
                    {
                        state.authenticated = true;
                    }
                }
                info!("peer authenticated");
                for hook in inner.on_connect.lock().iter() {
                    hook();
                }
                HandshakeState::Authenticated
            } else {
                let result = Frame::AuthResult {
                    success: false,
                    error: Some("Invalid auth token".to_string()),
                    allowed_origins: None,
                };
                send(tx, &result);
                inner.audit.record_auth_failed(extension_id.as_deref());
                HandshakeState::Connected
            }
        }
        (HandshakeState::Connected, _) => HandshakeState::Connected,
        (HandshakeState::Authenticated, Frame::Command { id, command, .. })
            if command == act_protocol::PING =>
        {
            send(
                tx,
                &Frame::Response {
                    id,
                    success: true,
                    data: Some(serde_json::json!({ "pong": true })),
                    error: None,
                },
            );
            HandshakeState::Authenticated
        }
        (
            HandshakeState::Authenticated,
            Frame::Response {
                id,
                success,
                data,
                error,
            },
        ) => {
            let result = if success {
                Ok(data.unwrap_or(serde_json::Value::Null))
            } else {
                Err(Error::Peer(
                    error.unwrap_or_else(|| "unknown peer error".to_string()),
                ))
            };
            inner.state.lock().await.pending.resolve(&id, result);
            HandshakeState::Authenticated
        }
        (HandshakeState::Authenticated, _) => HandshakeState::Authenticated,
    }
}

fn send(tx: &mpsc::UnboundedSender<Message>, frame: &Frame) {
    if let Ok(text) = serde_json::to_string(frame) {
        let _ = tx.send(Message::Text(text.into()));
    }
}

fn tokens_match(expected: &str, provided: &str) -> bool {
    use subtle::ConstantTimeEq;
    if expected.len() != provided.len() {
        return false;
    }
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

async fn finalize_disconnect(inner: &Arc<Inner>, connection_id: u64) {
    let was_authenticated = {
        let mut state = inner.state.lock().await;
        let still_current = state
            .peer
            .as_ref()
            .is_some_and(|peer| peer.connection_id == connection_id);
        if !still_current {
            return;
        }
        let was_authenticated = state.authenticated;
        state.peer = None;
        state.authenticated = false;
        state.pending.drain_with(|| Error::PeerDisconnected);
        was_authenticated
    };
    if was_authenticated {
        info!("peer disconnected");
        for hook in inner.on_disconnect.lock().iter() {
            hook();
        }
    }
}
