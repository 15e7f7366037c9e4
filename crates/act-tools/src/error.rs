use thiserror::Error;

/// Errors surfaced while routing a tool call to its handler.
///
/// Every variant is converted to a failure response before it reaches the
/// agent channel; none of them unwind past the Tool Surface.
#[derive(Debug, Error)]
pub enum Error {
    /// The bridge reported a dispatch failure (not-connected, timeout,
    /// disconnect, shutdown, not-allowed, or a peer-reported error).
    #[error(transparent)]
    Bridge(#[from] act_bridge::Error),

    /// The baseline store or image comparator reported a failure.
    #[error(transparent)]
    Testkit(#[from] act_testkit::Error),

    /// The tool name is not in the catalogue.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// The call's arguments did not match the tool's parameter schema.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The peer returned data whose shape didn't match what the tool
    /// expected (e.g. a read command response missing its field).
    #[error("unexpected response shape: {0}")]
    UnexpectedResponse(String),
}

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The short message carried back to the agent as a failure response,
    /// per spec.md §7's propagation rule.
    pub fn agent_message(&self) -> String {
        self.to_string()
    }
}
