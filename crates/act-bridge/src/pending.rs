use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::Error;

/// What a resolved pending request is handed back as.
pub type PendingResult = Result<Value, Error>;

/// A dispatched command awaiting exactly one terminal event: response,
/// timeout, disconnect, or shutdown.
struct PendingEntry {
    resolver: oneshot::Sender<PendingResult>,
}

/// Table of in-flight requests, keyed by id. Not thread-safe on its own;
/// callers hold it behind the same lock that guards the rest of the bridge
/// state (see [`crate::state::BridgeState`]).
#[derive(Default)]
pub struct PendingTable {
    entries: HashMap<String, PendingEntry>,
}

impl PendingTable {
    /// Register a new pending request, returning the receiver half the
    /// caller awaits on.
    pub fn insert(&mut self, id: String) -> oneshot::Receiver<PendingResult> {
        let (resolver, receiver) = oneshot::channel();
        self.entries.insert(id, PendingEntry { resolver });
        receiver
    }

    /// Resolve a pending request with a peer-supplied response. A response
    /// whose id has no entry is silently dropped.
    pub fn resolve(&mut self, id: &str, result: PendingResult) {
        if let Some(entry) = self.entries.remove(id) {
            let _ = entry.resolver.send(result);
        }
    }

    /// Drop `id` from the table without sending through its resolver. Used
    /// when the caller itself gave up waiting (its own timeout elapsed) and
    /// will construct the error message directly.
    pub fn remove_silently(&mut self, id: &str) {
        self.entries.remove(id);
    }

    /// Reject and clear every pending entry, e.g. on disconnect or shutdown.
    pub fn drain_with(&mut self, make_error: impl Fn() -> Error) {
        for (_, entry) in self.entries.drain() {
            let _ = entry.resolver.send(Err(make_error()));
        }
    }

    /// Number of requests currently in flight.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table holds no in-flight requests.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_delivers_to_receiver() {
        let mut table = PendingTable::default();
        let rx = table.insert("req-1".into());
        table.resolve("req-1", Ok(serde_json::json!({"url": "https://x"})));
        let result = rx.await.unwrap().unwrap();
        assert_eq!(result["url"], "https://x");
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn unknown_id_is_a_no_op() {
        let mut table = PendingTable::default();
        let _rx = table.insert("req-1".into());
        table.resolve("does-not-exist", Ok(Value::Null));
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn remove_silently_drops_without_resolving() {
        let mut table = PendingTable::default();
        let rx = table.insert("req-1".into());
        table.remove_silently("req-1");
        assert!(table.is_empty());
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn drain_rejects_all_entries() {
        let mut table = PendingTable::default();
        let rx_a = table.insert("a".into());
        let rx_b = table.insert("b".into());
        table.drain_with(|| Error::PeerDisconnected);
        assert!(table.is_empty());
        assert!(matches!(rx_a.await.unwrap(), Err(Error::PeerDisconnected)));
        assert!(matches!(rx_b.await.unwrap(), Err(Error::PeerDisconnected)));
    }
}
