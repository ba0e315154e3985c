//! UCI engine client
//!
//! Drives an external chess engine over the UCI line protocol: process
//! launch and variant selection, the `uci`/`isready` handshake, one search at
//! a time with a deadline, and cancellation that cannot leak a stale answer
//! into a later request.
//!
//! # Architecture
//!
//! - [`transport`]: the [`EngineTransport`] seam and the child-process implementation
//! - [`protocol`]: command rendering and engine output classification
//! - [`session`]: actor task owning the transport and the pending-request slot
//! - [`client`]: cloneable [`EngineClient`] handle used by callers
//! - [`difficulty`]: the 1-10 level tables
//! - `testing`: scripted in-memory engine, behind the `testing` feature
//!
//! All failures surface as [`MoveResult`] errors; nothing panics on bad engine output.

pub mod client;
pub mod config;
pub mod difficulty;
pub mod error;
pub mod protocol;
pub mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transport;
pub mod types;

pub use client::EngineClient;
pub use config::EngineConfig;
pub use difficulty::Difficulty;
pub use error::{EngineError, EngineResult};
pub use session::{EngineStatus, MATE_SCORE_CP};
pub use transport::{EngineBinary, EngineTransport, ProcessTransport};
pub use types::{MoveRequest, MoveResult, Promotion, Square, UciMove, MAX_MOVE_TIME_MS};

/// Standard starting position
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
