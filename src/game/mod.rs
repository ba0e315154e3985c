//! Human-versus-engine game orchestration
//!
//! Pure game state is kept apart from the asynchronous plumbing around it.
//!
//! # Module Organization
//!
//! - `types` - Colours, winners, time controls, per-game settings
//! - `resources` - Clock, terminal status, opponent statistics
//! - `rules` - [`rules::RulesEngine`] seam and the shakmaty adapter
//! - `session` - [`GameSession`] state machine (synchronous, no I/O)
//! - `ai` - [`ai::MoveCoordinator`] single-flight engine requests and pacing
//! - `runner` - [`GameRunner`] event loop tying the session to the engine
//!
//! # Flow
//!
//! 1. The session issues an [`OpponentTicket`] when the engine is to move
//! 2. The runner spawns a coordinator request for that ticket
//! 3. The coordinator asks the UCI client, then paces the reply
//! 4. The runner hands ticket and result back to the session
//! 5. The session validates freshness, applies the move and checks for the end

pub mod ai;
pub mod error;
pub mod resources;
pub mod rules;
pub mod runner;
pub mod session;
pub mod types;

pub use error::{GameError, GameResult};
pub use runner::{GameHandle, GameRunner, Intent};
pub use session::{GameSession, OpponentTicket, SessionSnapshot, Turn};
