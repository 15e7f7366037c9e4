//! Wire protocol types shared between the bridge core and the peer
//! (browser extension) it talks to over the localhost socket.
//!
//! This crate defines the serializable frame types and the small set of
//! constants describing the forwarded command catalog. It performs no I/O.
#![warn(missing_docs)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single message exchanged over the bridge's duplex socket.
///
/// Tagged by a `type` field on the wire, matching the frame names used
/// throughout the peer contract (`auth`, `auth_result`, `command`,
/// `response`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    /// First frame a peer must send after connecting.
    Auth {
        /// The shared secret the peer was configured with.
        token: String,
        /// Optional identifier the peer supplies for audit purposes.
        #[serde(rename = "extensionId", default, skip_serializing_if = "Option::is_none")]
        extension_id: Option<String>,
        /// Origins the peer asks to add to the allowlist; union-extended,
        /// never replacing the seeded entries.
        #[serde(rename = "allowedOrigins", default, skip_serializing_if = "Option::is_none")]
        allowed_origins: Option<Vec<String>>,
    },
    /// Bridge's response to an `auth` frame.
    AuthResult {
        /// Whether the token matched.
        success: bool,
        /// Present only when `success` is false.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        /// Present only when `success` is true: the seeded origin allowlist.
        #[serde(rename = "allowedOrigins", default, skip_serializing_if = "Option::is_none")]
        allowed_origins: Option<Vec<String>>,
    },
    /// A command dispatched from bridge to peer (or, for `ping`, peer to bridge).
    Command {
        /// Caller-chosen identifier, unique among in-flight requests.
        id: String,
        /// Command name, forwarded without interpretation except `navigate`.
        command: String,
        /// Command parameters.
        #[serde(default)]
        params: BTreeMap<String, Value>,
        /// Optional target browser tab.
        #[serde(rename = "tabId", default, skip_serializing_if = "Option::is_none")]
        tab_id: Option<i64>,
    },
    /// A response, correlated to a prior `command` frame by `id`.
    Response {
        /// Echoes the originating command's `id`.
        id: String,
        /// Whether the command succeeded.
        success: bool,
        /// Present on success.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
        /// Present on failure.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

/// The fixed set of command names the bridge forwards to the peer.
///
/// Every one of these is passed through uninterpreted except `navigate`,
/// which is gated on the origin allowlist before a frame is ever sent.
pub const COMMANDS: &[&str] = &[
    "ping",
    "navigate",
    "screenshot",
    "evaluate",
    "url",
    "title",
    "network_capture_start",
    "network_capture_stop",
    "click",
    "type",
    "select",
    "hover",
    "scroll",
    "key",
    "wait",
    "query",
    "query_all",
    "text",
    "html",
];

/// Command name for browser navigation; the only one gated locally.
pub const NAVIGATE: &str = "navigate";

/// Keepalive command name a peer may send unsolicited once authenticated.
pub const PING: &str = "ping";

/// Default listening port, overridable via `ACT_PORT`.
pub const DEFAULT_PORT: u16 = 3695;

/// Default per-command timeout, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Close code reserved for a refused secondary connection (spec §6).
pub const CLOSE_CODE_ALREADY_CONNECTED: u16 = 4001;

/// Reason text paired with [`CLOSE_CODE_ALREADY_CONNECTED`].
pub const CLOSE_REASON_ALREADY_CONNECTED: &str = "another client is already connected";

/// Maximum length, in characters, of a string value kept unredacted in an
/// audit record. Longer strings are truncated and suffixed with
/// [`AUDIT_TRUNCATION_MARKER`].
pub const AUDIT_MAX_STRING_LEN: usize = 200;

/// Suffix appended to a truncated audit string value.
pub const AUDIT_TRUNCATION_MARKER: &str = "...[truncated]";

/// One line of the append-only audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// UTC timestamp of the recorded event.
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// The command name, or `auth_failed` for a rejected handshake.
    pub action: String,
    /// Sanitized parameters; see [`sanitize_params`].
    pub params: Value,
}

impl AuditRecord {
    /// Build a record for a dispatched command, sanitizing its parameters.
    pub fn command(action: impl Into<String>, params: &Value) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            action: action.into(),
            params: sanitize_params(params),
        }
    }

    /// Build a record for a failed handshake attempt.
    pub fn auth_failed(extension_id: Option<&str>) -> Self {
        let params = serde_json::json!({ "extensionId": extension_id });
        Self {
            timestamp: chrono::Utc::now(),
            action: "auth_failed".to_string(),
            params,
        }
    }
}

/// Truncate any string value longer than [`AUDIT_MAX_STRING_LEN`] characters,
/// recursively, across objects and arrays. Non-string scalars pass through
/// unchanged.
pub fn sanitize_params(value: &Value) -> Value {
    match value {
        Value::String(s) if s.chars().count() > AUDIT_MAX_STRING_LEN => {
            let truncated: String = s.chars().take(AUDIT_MAX_STRING_LEN).collect();
            Value::String(format!("{truncated}{AUDIT_TRUNCATION_MARKER}"))
        }
        Value::Array(items) => Value::Array(items.iter().map(sanitize_params).collect()),
        Value::Object(map) => {
            Value::Object(map.iter().map(|(k, v)| (k.clone(), sanitize_params(v))).collect())
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_frame_round_trips() {
        let frame = Frame::Auth {
            token: "secret".into(),
            extension_id: Some("ext1".into()),
            allowed_origins: Some(vec!["example.com".into()]),
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "auth");
        assert_eq!(json["extensionId"], "ext1");
        assert_eq!(json["allowedOrigins"][0], "example.com");
        let back: Frame = serde_json::from_value(json).unwrap();
        assert_eq!(back, frame);
    }

    #[test]
    fn auth_frame_allows_omitted_allowed_origins() {
        let json = serde_json::json!({"type": "auth", "token": "secret"});
        let frame: Frame = serde_json::from_value(json).unwrap();
        assert!(matches!(frame, Frame::Auth { allowed_origins: None, .. }));
    }

    #[test]
    fn auth_result_omits_null_fields() {
        let frame = Frame::AuthResult {
            success: true,
            error: None,
            allowed_origins: Some(vec!["localhost".into()]),
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json["allowedOrigins"][0], "localhost");
    }

    #[test]
    fn sanitize_truncates_long_strings() {
        let long = "x".repeat(AUDIT_MAX_STRING_LEN + 50);
        let params = serde_json::json!({ "code": long, "tabId": 3 });
        let sanitized = sanitize_params(&params);
        let code = sanitized["code"].as_str().unwrap();
        assert!(code.ends_with(AUDIT_TRUNCATION_MARKER));
        assert_eq!(sanitized["tabId"], 3);
    }

    #[test]
    fn sanitize_leaves_short_strings_alone() {
        let params = serde_json::json!({ "url": "https://example.com" });
        let sanitized = sanitize_params(&params);
        assert_eq!(sanitized["url"], "https://example.com");
    }

    #[test]
    fn command_catalog_contains_navigate_and_ping() {
        assert!(COMMANDS.contains(&NAVIGATE));
        assert!(COMMANDS.contains(&PING));
    }
}
