//! End-to-end scenarios from spec.md §8 that exercise the Bridge Core
//! through a real TCP/WebSocket round trip against a [`MockPeer`].
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use act_bridge::{Bridge, BridgeConfig, Error};
use act_bridge::test_utils::MockPeer;
use act_protocol::Frame;
use tokio_tungstenite::tungstenite::Message;

async fn start_bridge() -> (Bridge, std::net::SocketAddr, tempfile::TempDir) {
    start_bridge_with_origins(vec![]).await
}

async fn start_bridge_with_origins(
    allowed_origins: Vec<String>,
) -> (Bridge, std::net::SocketAddr, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let bridge = Bridge::new(BridgeConfig {
        port: 0,
        allowed_origins,
        state_dir: dir.path().to_path_buf(),
    })
    .expect("bridge constructs");
    let addr = bridge.start().await.expect("bridge starts");
    (bridge, addr, dir)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn auth_success() {
    let (bridge, addr, _dir) = start_bridge().await;
    let mut peer = MockPeer::connect(addr).await;

    let result = peer.authenticate(bridge.token(), Some("ext1")).await;
    match result {
        Frame::AuthResult {
            success,
            allowed_origins,
            ..
        } => {
            assert!(success);
            assert_eq!(allowed_origins, Some(bridge.allowed_origins()));
        }
        other => panic!("unexpected frame: {other:?}"),
    }
    assert!(bridge.connected().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn auth_failure() {
    let (bridge, addr, _dir) = start_bridge().await;
    let mut peer = MockPeer::connect(addr).await;

    let result = peer.authenticate("wrong-token", Some("ext1")).await;
    match result {
        Frame::AuthResult { success, error, .. } => {
            assert!(!success);
            assert_eq!(error.as_deref(), Some("Invalid auth token"));
        }
        other => panic!("unexpected frame: {other:?}"),
    }
    assert!(!bridge.connected().await);

    let audit = std::fs::read_to_string(bridge.audit_log_path()).expect("audit log readable");
    assert!(audit.contains("\"action\":\"auth_failed\""));
    assert!(audit.contains("ext1"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn correlation() {
    let (bridge, addr, _dir) = start_bridge().await;
    let mut peer = MockPeer::connect(addr).await;
    peer.authenticate(bridge.token(), None).await;

    let dispatch = bridge.send_command("url", serde_json::Map::new(), Duration::from_secs(5));
    let respond = async {
        match peer.recv().await {
            Frame::Command { id, command, .. } => {
                assert_eq!(command, "url");
                peer.respond_success(id, serde_json::json!({"url": "https://example.com/test"}))
                    .await;
            }
            other => panic!("expected a command frame, got {other:?}"),
        }
    };
    let (result, ()) = tokio::join!(dispatch, respond);
    let data = result.expect("command resolves");
    assert_eq!(data["url"], "https://example.com/test");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn timeout_rejects_after_caller_deadline() {
    let (bridge, addr, _dir) = start_bridge().await;
    let mut peer = MockPeer::connect(addr).await;
    peer.authenticate(bridge.token(), None).await;

    let mut params = serde_json::Map::new();
    params.insert("code".into(), serde_json::json!("1+1"));
    let result = bridge
        .send_command("evaluate", params, Duration::from_millis(100))
        .await;
    match result {
        Err(Error::Timeout {
            command,
            timeout_ms,
        }) => {
            assert_eq!(command, "evaluate");
            assert_eq!(timeout_ms, 100);
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn disconnect_cancels_pending() {
    let (bridge, addr, _dir) = start_bridge().await;
    let mut peer = MockPeer::connect(addr).await;
    peer.authenticate(bridge.token(), None).await;

    let disconnect_count = Arc::new(AtomicUsize::new(0));
    {
        let counter = disconnect_count.clone();
        bridge.on_disconnect(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
    }

    let fut_a = bridge.send_command("url", serde_json::Map::new(), Duration::from_secs(5));
    let fut_b = bridge.send_command("title", serde_json::Map::new(), Duration::from_secs(5));
    let drop_peer = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        peer.disconnect().await;
    };

    let (result_a, result_b, ()) = tokio::join!(fut_a, fut_b, drop_peer);
    assert!(matches!(result_a, Err(Error::PeerDisconnected)));
    assert!(matches!(result_b, Err(Error::PeerDisconnected)));
    assert!(!bridge.connected().await);
    assert_eq!(disconnect_count.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn second_client_refused() {
    let (bridge, addr, _dir) = start_bridge().await;
    let mut first = MockPeer::connect(addr).await;
    first.authenticate(bridge.token(), None).await;

    let (mut second, _response) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("second connection opens at the transport level");
    let message = futures_util::StreamExt::next(&mut second)
        .await
        .expect("bridge sends a close frame")
        .expect("close frame reads cleanly");
    match message {
        Message::Close(Some(frame)) => {
            assert_eq!(
                u16::from(frame.code),
                act_protocol::CLOSE_CODE_ALREADY_CONNECTED
            );
            assert_eq!(
                frame.reason.to_string(),
                act_protocol::CLOSE_REASON_ALREADY_CONNECTED
            );
        }
        other => panic!("expected a close frame, got {other:?}"),
    }
    assert!(bridge.connected().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn auth_extends_allowlist_with_peer_supplied_origins() {
    let (bridge, addr, _dir) = start_bridge().await;
    let mut peer = MockPeer::connect(addr).await;

    let result = peer
        .authenticate_with_origins(bridge.token(), None, Some(vec!["example.com".to_string()]))
        .await;
    match result {
        Frame::AuthResult {
            success,
            allowed_origins,
            ..
        } => {
            assert!(success);
            let origins = allowed_origins.expect("auth_result carries allowlist snapshot");
            assert!(origins.iter().any(|origin| origin == "example.com"));
        }
        other => panic!("unexpected frame: {other:?}"),
    }
    assert!(bridge.allowed_origins().iter().any(|origin| origin == "example.com"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn navigate_blocked() {
    let (bridge, addr, _dir) = start_bridge_with_origins(vec!["localhost".to_string()]).await;
    let mut peer = MockPeer::connect(addr).await;
    peer.authenticate(bridge.token(), None).await;

    let mut params = serde_json::Map::new();
    params.insert("url".into(), serde_json::json!("https://evil.example/"));
    let result = bridge
        .send_command("navigate", params, Duration::from_secs(5))
        .await;
    assert!(matches!(result, Err(Error::NotAllowed)));
}
