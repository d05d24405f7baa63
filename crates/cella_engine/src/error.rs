use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the simulation store, the pattern serializer and the
/// edit layer built on top of them.
#[derive(Debug, Error)]
pub enum EngineError {
    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to open file '{path}': {message}")]
    OpenFile { path: PathBuf, message: String },

    // === Pattern serializer ===
    #[error("Pattern is too big to save (edges outside the 32-bit cell domain)")]
    PatternTooBig,

    #[error("Invalid pattern file '{path}': {message}")]
    BadPatternFile { path: PathBuf, message: String },

    // === Rules and algorithms ===
    #[error("Invalid rule '{rule}': {message}")]
    InvalidRule { rule: String, message: String },

    #[error("Unknown algorithm '{0}'")]
    UnknownAlgorithm(String),

    // === Edit layer ===
    #[error("View {0} is invalid")]
    InvalidView(usize),

    /// A lengthy operation was cancelled by the host. The operation is
    /// guaranteed to have left the simulation untouched.
    #[error("Operation aborted")]
    Aborted,

    #[error("{0}")]
    Generic(String),
}

impl EngineError {
    /// True if `err` is (or wraps) a host cancellation.
    pub fn is_abort(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<EngineError>(), Some(EngineError::Aborted))
    }
}
