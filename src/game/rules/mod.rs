//! Chess rules collaborator
//!
//! The session never decides legality itself. It asks a [`RulesEngine`] to
//! apply moves and to report check, mate and draw conditions. The default
//! implementation, [`ShakmatyRules`], wraps the `shakmaty` crate.

mod shakmaty_rules;

pub use shakmaty_rules::ShakmatyRules;

use crate::game::error::GameResult;
use crate::game::resources::DrawReason;
use crate::game::types::Color;
use uci_client::{Square, UciMove};

/// A move the rules engine accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMove {
    pub uci: UciMove,
    /// Standard algebraic notation with `+`/`#` suffix
    pub san: String,
    pub capture: bool,
}

/// Legality and terminal-condition oracle for one game
pub trait RulesEngine: Send + 'static {
    /// Plays `mv` for the side to move; illegal moves leave the position unchanged
    fn apply_move(&mut self, mv: &UciMove) -> GameResult<AppliedMove>;

    /// Legal moves for the piece on `from`; empty for an empty square or the side not to move
    fn legal_moves_from(&self, from: Square) -> Vec<UciMove>;

    /// Destination squares of [`Self::legal_moves_from`], promotions collapsed
    fn legal_targets(&self, from: Square) -> Vec<Square> {
        let mut targets = Vec::new();
        for mv in self.legal_moves_from(from) {
            if !targets.contains(&mv.to) {
                targets.push(mv.to);
            }
        }
        targets
    }

    fn active_color(&self) -> Color;

    fn position_fen(&self) -> String;

    fn is_check(&self) -> bool;

    fn is_checkmate(&self) -> bool;

    fn is_stalemate(&self) -> bool;

    /// Automatic draw that applies to the current position, if any
    fn draw_reason(&self) -> Option<DrawReason>;

    fn is_draw(&self) -> bool {
        self.draw_reason().is_some()
    }

    fn is_game_over(&self) -> bool {
        self.is_checkmate() || self.is_stalemate() || self.is_draw()
    }

    /// Back to the starting position
    fn reset(&mut self);
}
