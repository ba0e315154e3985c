//! Error types for game module
//!
//! Covers failed human moves, engine answers the board refuses, and results
//! that arrive for a ply or game that has already moved on.

use uci_client::EngineError;

/// Errors that can occur in game logic
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    /// Move token malformed or illegal in the current position
    #[error("Invalid move: {message}")]
    InvalidMove { message: String },

    /// A move was submitted for the side that is not to move
    #[error("Not your turn")]
    NotYourTurn,

    /// The game has already reached a terminal state
    #[error("Game is over")]
    GameOver,

    /// An opponent result for an earlier ply or an earlier game
    #[error("Stale opponent result for generation {generation}, ply {ply}")]
    StaleResult { generation: u64, ply: u32 },

    /// Position text could not be loaded
    #[error("Invalid position: {message}")]
    InvalidPosition { message: String },

    /// The session runner has shut down
    #[error("Game session closed")]
    SessionClosed,

    /// The opponent engine failed to produce a move
    #[error("Opponent engine: {0}")]
    Engine(#[from] EngineError),
}

/// Result type alias for game operations
pub type GameResult<T> = Result<T, GameError>;
