use std::result::Result as StdResult;

use thiserror::Error;

/// Error kinds surfaced by the Bridge Core (spec error taxonomy, §7).
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// No authenticated peer is attached.
    #[error("not connected: no authenticated peer")]
    NotConnected,

    /// The caller-supplied timeout elapsed before a response arrived.
    #[error("command {command:?} timed out after {timeout_ms}ms")]
    Timeout {
        /// Name of the command that timed out.
        command: String,
        /// The timeout that was armed, in milliseconds.
        timeout_ms: u64,
    },

    /// The peer disconnected while this request was in flight.
    #[error("peer disconnected before responding")]
    PeerDisconnected,

    /// The bridge is shutting down.
    #[error("bridge is shutting down")]
    ShuttingDown,

    /// Caller-supplied input was malformed (bad baseline name, bad port, bad URL).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The target URL is outside the origin allowlist.
    #[error("navigation target is not in the allowlist")]
    NotAllowed,

    /// The peer reported a failure in its `response` frame.
    #[error("peer error: {0}")]
    Peer(String),

    /// A filesystem operation failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// A frame from the peer could not be parsed. Never surfaced to callers;
    /// retained for logging only.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// Build a [`Error::Timeout`] for the given command and timeout.
    pub fn timeout(command: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            command: command.into(),
            timeout_ms,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

/// Convenience alias for Results using the Bridge Core's [`Error`].
pub type Result<T> = StdResult<T, Error>;
