//! Engine launch and protocol settings

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// How to start the engine and how long to wait for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Portable engine build
    pub path: PathBuf,
    /// Optional build that needs AVX2, used only when the CPU supports it
    pub accelerated_path: Option<PathBuf>,
    pub args: Vec<String>,
    /// After this long without `uciok`/`readyok` the client runs degraded
    pub handshake_timeout_ms: u64,
    /// How long `request_move` waits for the handshake before reporting NotReady
    pub ready_wait_ms: u64,
    /// Search deadline is `movetime * factor + margin`
    pub search_timeout_factor: u64,
    pub search_timeout_margin_ms: u64,
    /// `setoption` pairs sent during the handshake
    pub options: Vec<(String, String)>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("stockfish"),
            accelerated_path: None,
            args: Vec::new(),
            handshake_timeout_ms: 5_000,
            ready_wait_ms: 10_000,
            search_timeout_factor: 3,
            search_timeout_margin_ms: 2_000,
            options: vec![
                ("Hash".to_string(), "64".to_string()),
                ("Threads".to_string(), "1".to_string()),
                ("MultiPV".to_string(), "1".to_string()),
            ],
        }
    }
}

impl EngineConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn ready_wait(&self) -> Duration {
        Duration::from_millis(self.ready_wait_ms)
    }

    pub fn search_timeout(&self, move_time_ms: u64) -> Duration {
        Duration::from_millis(
            move_time_ms
                .saturating_mul(self.search_timeout_factor)
                .saturating_add(self.search_timeout_margin_ms),
        )
    }
}
