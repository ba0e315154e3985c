//! Engine search statistics for the current game

use serde::Serialize;
use uci_client::MoveResult;

/// Running totals over the opponent's moves in one game
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct OpponentStats {
    pub moves_played: u32,
    pub total_thinking_ms: u64,
    pub last_thinking_ms: Option<u64>,
    /// Centipawns from the opponent's point of view
    pub last_evaluation: Option<i32>,
    pub last_depth: Option<u32>,
}

impl OpponentStats {
    pub fn record(&mut self, result: &MoveResult) {
        self.moves_played += 1;
        self.total_thinking_ms += result.thinking_time_ms;
        self.last_thinking_ms = Some(result.thinking_time_ms);
        self.last_evaluation = result.evaluation_centipawns;
        self.last_depth = result.depth;
    }

    pub fn average_thinking_ms(&self) -> Option<u64> {
        (self.moves_played > 0).then(|| self.total_thinking_ms / u64::from(self.moves_played))
    }
}
