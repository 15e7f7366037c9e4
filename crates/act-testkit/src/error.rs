use thiserror::Error;

/// Errors surfaced by the Test Session, Baseline Store, and Image Comparator.
#[derive(Debug, Error)]
pub enum Error {
    /// A baseline name, image payload, or threshold failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A baseline or diff image could not be read or written.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;
