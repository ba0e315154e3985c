//! Error types for the UCI client
//!
//! Every failure a move request can end with is one of these variants. They are
//! carried inside [`crate::MoveResult`] rather than raised, so callers always get
//! exactly one result per accepted request.

use thiserror::Error;

/// Errors that can occur while talking to a UCI engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The engine process could not be started or has exited
    #[error("Engine unavailable: {reason}")]
    Unavailable { reason: String },

    /// The handshake has not completed within the readiness wait
    #[error("Engine not ready")]
    NotReady,

    /// Another request is already waiting for a bestmove
    #[error("Engine busy")]
    Busy,

    /// The engine answered with a token that is not a UCI move
    #[error("Invalid move from engine: {token}")]
    InvalidMove { token: String },

    /// No terminal line arrived before the search deadline
    #[error("Search timed out after {after_ms}ms")]
    SearchTimeout { after_ms: u64 },

    /// The request was cancelled by `stop`, `new_game` or disposal
    #[error("Search cancelled")]
    Cancelled,

    /// Writing to or reading from the engine failed
    #[error("Transport error: {message}")]
    Transport { message: String },
}

impl EngineError {
    /// Shorthand for wrapping an I/O failure
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport {
            message: err.to_string(),
        }
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
