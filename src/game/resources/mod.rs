//! Session state pieces owned by [`crate::game::session::GameSession`]
//!
//! - [`GameClock`] - Fischer increment time control
//! - [`GameStatus`] / [`DrawReason`] - Terminal conditions and result messages
//! - [`OpponentStats`] - Search statistics reported by the engine

pub mod game_over;
pub mod stats;
pub mod timer;

pub use game_over::{result_message, DrawReason, GameStatus};
pub use stats::OpponentStats;
pub use timer::{format_clock, GameClock};
