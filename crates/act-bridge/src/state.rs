use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::pending::PendingTable;

/// The attached peer's outbound half. Writing here queues a frame onto that
/// connection's dedicated writer task.
pub(crate) struct PeerHandle {
    pub(crate) sender: mpsc::UnboundedSender<Message>,
    /// Monotonic id distinguishing this connection from any that follow it,
    /// so a lingering task from a since-replaced peer can recognize it is
    /// stale.
    pub(crate) connection_id: u64,
}

/// All bridge state mutated together under one lock: the peer pointer, the
/// authenticated flag, and the pending-request table. Spec invariant:
/// `authenticated` is false whenever `peer` is `None`.
#[derive(Default)]
pub(crate) struct BridgeState {
    pub(crate) peer: Option<PeerHandle>,
    pub(crate) authenticated: bool,
    pub(crate) pending: PendingTable,
    pub(crate) next_connection_id: u64,
}

impl BridgeState {
    pub(crate) fn is_connected(&self) -> bool {
        self.authenticated && self.peer.is_some()
    }
}
