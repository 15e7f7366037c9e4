use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use parking_lot::Mutex as SyncMutex;
use rand::RngCore;
use serde_json::{Map, Value};
use tokio::{net::TcpListener, sync::Mutex as AsyncMutex, task::JoinHandle};
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    allowlist::OriginAllowlist,
    audit::AuditLog,
    connection,
    error::{Error, Result},
    state::BridgeState,
};

type Hook = Box<dyn Fn() + Send + Sync>;

/// Startup configuration for a [`Bridge`].
pub struct BridgeConfig {
    /// Port to listen on, loopback-only.
    pub port: u16,
    /// Origins to seed the allowlist with, beyond the hardcoded loopback entries.
    pub allowed_origins: Vec<String>,
    /// Directory holding `audit.log`; created at `0o700` if absent.
    pub state_dir: PathBuf,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            port: act_protocol::DEFAULT_PORT,
            allowed_origins: Vec::new(),
            state_dir: PathBuf::from(".agent-chrome-test"),
        }
    }
}

/// Process-wide resources shared by every connection task: the state lock,
/// the token, the allowlist, and the audit log. Long-lived for the process
/// lifetime (spec.md §9, "process-wide state").
pub(crate) struct Inner {
    pub(crate) state: AsyncMutex<BridgeState>,
    pub(crate) token: String,
    pub(crate) allowlist: Arc<OriginAllowlist>,
    pub(crate) audit: Arc<AuditLog>,
    pub(crate) on_connect: SyncMutex<Vec<Hook>>,
    pub(crate) on_disconnect: SyncMutex<Vec<Hook>>,
    pub(crate) shutting_down: AtomicBool,
}

/// The Bridge Core: an authenticated, single-peer command bridge over a
/// localhost WebSocket.
pub struct Bridge {
    inner: Arc<Inner>,
    port: u16,
    listener_task: AsyncMutex<Option<JoinHandle<()>>>,
}

impl Bridge {
    /// Construct a bridge. Opens (and if needed creates) the audit log
    /// directory; does not bind the listener yet.
    pub fn new(config: BridgeConfig) -> std::io::Result<Self> {
        let audit = AuditLog::open(&config.state_dir)?;
        let allowlist = OriginAllowlist::new(config.allowed_origins);
        let inner = Arc::new(Inner {
            state: AsyncMutex::new(BridgeState::default()),
            token: generate_token(),
            allowlist: Arc::new(allowlist),
            audit: Arc::new(audit),
            on_connect: SyncMutex::new(Vec::new()),
            on_disconnect: SyncMutex::new(Vec::new()),
            shutting_down: AtomicBool::new(false),
        });
        Ok(Self {
            inner,
            port: config.port,
            listener_task: AsyncMutex::new(None),
        })
    }

    /// Bind the listener and begin accepting connections. Fails if the port
    /// is already in use.
    pub async fn start(&self) -> Result<SocketAddr> {
        let listener = TcpListener::bind(("127.0.0.1", self.port))
            .await
            .map_err(Error::from)?;
        let addr = listener.local_addr().map_err(Error::from)?;
        info!(%addr, "bridge listening");

        let inner = self.inner.clone();
        let handle = tokio::spawn(async move {
            loop {
                let (stream, peer_addr) = match listener.accept().await {
                    Ok(accepted) => accepted,
                    Err(err) => {
                        warn!(%err, "accept error");
                        continue;
                    }
                };
                let inner = inner.clone();
                tokio::spawn(async move {
                    connection::handle(inner, stream, peer_addr).await;
                });
            }
        });
        *self.listener_task.lock().await = Some(handle);
        Ok(addr)
    }

    /// Reject every pending request with *shutting-down*, close the peer,
    /// and stop accepting new connections.
    pub async fn stop(&self) {
        self.inner.shutting_down.store(true, Ordering::SeqCst);
        if let Some(handle) = self.listener_task.lock().await.take() {
            handle.abort();
        }
        let mut state = self.inner.state.lock().await;
        state.pending.drain_with(|| Error::ShuttingDown);
        if let Some(peer) = state.peer.take() {
            let _ = peer.sender.send(Message::Close(None));
        }
        state.authenticated = false;
    }

    /// Dispatch a command to the peer and await its correlated response.
    pub async fn send_command(
        &self,
        name: &str,
        params: Map<String, Value>,
        timeout: Duration,
    ) -> Result<Value> {
        if self.inner.shutting_down.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }
        if name == act_protocol::NAVIGATE {
            let url = params.get("url").and_then(Value::as_str).unwrap_or("");
            if !self.inner.allowlist.is_allowed(url) {
                return Err(Error::NotAllowed);
            }
        }

        let id = Uuid::new_v4().to_string();
        let receiver = {
            let mut state = self.inner.state.lock().await;
            if !state.is_connected() {
                return Err(Error::NotConnected);
            }
            let receiver = state.pending.insert(id.clone());
            let frame = act_protocol::Frame::Command {
                id: id.clone(),
                command: name.to_string(),
                params: params.clone().into_iter().collect(),
                tab_id: None,
            };
            self.inner.audit.record_command(name, &Value::Object(params));
            if let Ok(text) = serde_json::to_string(&frame)
                && let Some(peer) = state.peer.as_ref()
            {
                let _ = peer.sender.send(Message::Text(text.into()));
            }
            receiver
        };

        let timeout_ms = timeout.as_millis().min(u128::from(u64::MAX)) as u64;
        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::PeerDisconnected),
            Err(_) => {
                self.inner.state.lock().await.pending.remove_silently(&id);
                Err(Error::timeout(name, timeout_ms))
            }
        }
    }

    /// Register a callback fired each time a peer completes authentication.
    pub fn on_connect(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.inner.on_connect.lock().push(Box::new(callback));
    }

    /// Register a callback fired each time an authenticated peer is lost.
    pub fn on_disconnect(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.inner.on_disconnect.lock().push(Box::new(callback));
    }

    /// The generated bearer token peers must present to authenticate.
    pub fn token(&self) -> &str {
        &self.inner.token
    }

    /// Whether an authenticated peer is currently attached.
    pub async fn connected(&self) -> bool {
        self.inner.state.lock().await.is_connected()
    }

    /// Current snapshot of the origin allowlist.
    pub fn allowed_origins(&self) -> Vec<String> {
        self.inner.allowlist.snapshot()
    }

    /// Path to the append-only audit log.
    pub fn audit_log_path(&self) -> &Path {
        self.inner.audit.path()
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
