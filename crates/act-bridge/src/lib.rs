//! The Bridge Core: an authenticated, single-peer command bridge over a
//! localhost WebSocket (spec.md §4.1).
//!
//! Owns the listener, the handshake state machine, the pending-request
//! table, the origin allowlist, and the audit log for the process lifetime.
#![warn(missing_docs)]

mod allowlist;
mod audit;
mod bridge;
mod connection;
mod error;
mod pending;
mod state;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use allowlist::OriginAllowlist;
pub use bridge::{Bridge, BridgeConfig};
pub use error::{Error, Result};
