//! Opponent move orchestration
//!
//! # Architecture
//!
//! - [`MoveCoordinator`]: single-flight requests per ply, pacing, reset
//! - [`pacing`]: perceived thinking time heuristics
//! - [`should_resign`]: resignation thresholds for weaker levels
//!
//! The engine itself lives behind [`uci_client::EngineClient`]; nothing in
//! this module talks to the process directly.

pub mod coordinator;
pub mod pacing;
pub mod resign;

pub use coordinator::MoveCoordinator;
pub use pacing::{Pacing, PositionPhase};
pub use resign::should_resign;
