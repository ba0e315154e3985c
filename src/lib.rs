//! Play chess against a UCI engine
//!
//! The engine protocol itself lives in the `uci_client` crate. This crate
//! adds the game around it: session state, clocks, single-flight opponent
//! requests and configuration.

pub mod core;
pub mod game;
