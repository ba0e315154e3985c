use super::{AppliedMove, RulesEngine};
use crate::game::error::{GameError, GameResult};
use crate::game::resources::DrawReason;
use crate::game::types::Color;
use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::{CastlingMode, Chess, EnPassantMode, Position};
use std::collections::HashMap;
use uci_client::{Square, UciMove};

/// [`RulesEngine`] backed by `shakmaty`
///
/// Tracks position occurrences itself so threefold repetition can be detected;
/// `shakmaty` positions carry no history.
#[derive(Debug, Clone)]
pub struct ShakmatyRules {
    start: Chess,
    position: Chess,
    repetitions: HashMap<String, u32>,
}

impl Default for ShakmatyRules {
    fn default() -> Self {
        Self::from_position(Chess::default())
    }
}

impl ShakmatyRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts (and resets) from an arbitrary position
    pub fn from_fen(fen: &str) -> GameResult<Self> {
        let invalid = |message: String| GameError::InvalidPosition { message };
        let parsed: Fen = fen.parse().map_err(|e| invalid(format!("{e}")))?;
        let position: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| invalid(format!("{e}")))?;
        Ok(Self::from_position(position))
    }

    fn from_position(position: Chess) -> Self {
        let mut rules = Self {
            start: position.clone(),
            position,
            repetitions: HashMap::new(),
        };
        rules.record_position();
        rules
    }

    /// Placement, side to move, castling and en passant: the fields that make positions identical
    fn repetition_key(&self) -> String {
        self.position_fen()
            .split_whitespace()
            .take(4)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn record_position(&mut self) {
        let key = self.repetition_key();
        *self.repetitions.entry(key).or_insert(0) += 1;
    }
}

impl RulesEngine for ShakmatyRules {
    fn apply_move(&mut self, mv: &UciMove) -> GameResult<AppliedMove> {
        let token = mv.to_string();
        let illegal = || GameError::InvalidMove {
            message: format!("{token} is not legal here"),
        };

        let uci: shakmaty::uci::UciMove = token.parse().map_err(|_| illegal())?;
        let m = uci.to_move(&self.position).map_err(|_| illegal())?;

        let capture = m.is_capture();
        let san = SanPlus::from_move_and_play_unchecked(&mut self.position, &m).to_string();
        self.record_position();

        Ok(AppliedMove {
            uci: *mv,
            san,
            capture,
        })
    }

    fn legal_moves_from(&self, from: Square) -> Vec<UciMove> {
        self.position
            .legal_moves()
            .iter()
            .filter_map(|m| m.to_uci(CastlingMode::Standard).to_string().parse::<UciMove>().ok())
            .filter(|mv| mv.from == from)
            .collect()
    }

    fn active_color(&self) -> Color {
        match self.position.turn() {
            shakmaty::Color::White => Color::White,
            shakmaty::Color::Black => Color::Black,
        }
    }

    fn position_fen(&self) -> String {
        Fen::from_position(self.position.clone(), EnPassantMode::Legal).to_string()
    }

    fn is_check(&self) -> bool {
        self.position.is_check()
    }

    fn is_checkmate(&self) -> bool {
        self.position.is_checkmate()
    }

    fn is_stalemate(&self) -> bool {
        self.position.is_stalemate()
    }

    fn draw_reason(&self) -> Option<DrawReason> {
        if self.position.is_insufficient_material() {
            Some(DrawReason::InsufficientMaterial)
        } else if self.position.halfmoves() >= 100 {
            Some(DrawReason::FiftyMoveRule)
        } else if self
            .repetitions
            .get(&self.repetition_key())
            .is_some_and(|&count| count >= 3)
        {
            Some(DrawReason::ThreefoldRepetition)
        } else {
            None
        }
    }

    fn reset(&mut self) {
        self.position = self.start.clone();
        self.repetitions.clear();
        self.record_position();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(token: &str) -> UciMove {
        token.parse().unwrap()
    }

    #[test]
    fn test_start_position() {
        let rules = ShakmatyRules::new();
        assert_eq!(rules.position_fen(), uci_client::START_FEN);
        assert_eq!(rules.active_color(), Color::White);
        assert!(!rules.is_game_over());
    }

    #[test]
    fn test_apply_legal_move() {
        let mut rules = ShakmatyRules::new();

        let applied = rules.apply_move(&mv("g1f3")).unwrap();

        assert_eq!(applied.san, "Nf3");
        assert!(!applied.capture);
        assert_eq!(rules.active_color(), Color::Black);
    }

    fn square(name: &str) -> Square {
        Square::parse(name).unwrap()
    }

    fn names(squares: Vec<Square>) -> Vec<String> {
        let mut names: Vec<String> = squares.iter().map(Square::to_string).collect();
        names.sort();
        names
    }

    #[test]
    fn test_legal_targets_from_start() {
        let rules = ShakmatyRules::new();

        assert_eq!(names(rules.legal_targets(square("e2"))), vec!["e3", "e4"]);
        assert_eq!(names(rules.legal_targets(square("g1"))), vec!["f3", "h3"]);
        assert!(rules.legal_targets(square("d1")).is_empty(), "Queen is boxed in");
        assert!(rules.legal_targets(square("e4")).is_empty(), "Empty square");
        assert!(rules.legal_targets(square("e7")).is_empty(), "Black is not to move");
    }

    #[test]
    fn test_promotion_targets_collapse() {
        let rules = ShakmatyRules::from_fen("7k/P7/8/8/8/8/8/K7 w - - 0 1").unwrap();

        assert_eq!(rules.legal_moves_from(square("a7")).len(), 4);
        assert_eq!(names(rules.legal_targets(square("a7"))), vec!["a8"]);
    }

    #[test]
    fn test_castling_target_uses_king_destination() {
        let rules =
            ShakmatyRules::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();

        let targets = names(rules.legal_targets(square("e1")));
        assert!(targets.contains(&"g1".to_string()), "{:?}", targets);
        assert!(targets.contains(&"c1".to_string()), "{:?}", targets);
    }

    #[test]
    fn test_illegal_move_leaves_position() {
        let mut rules = ShakmatyRules::new();
        let before = rules.position_fen();

        let err = rules.apply_move(&mv("e2e5")).unwrap_err();

        assert!(matches!(err, GameError::InvalidMove { .. }));
        assert_eq!(rules.position_fen(), before);
    }

    #[test]
    fn test_fools_mate() {
        let mut rules = ShakmatyRules::new();
        let mut last = None;
        for token in ["f2f3", "e7e5", "g2g4", "d8h4"] {
            last = Some(rules.apply_move(&mv(token)).unwrap());
        }
        assert_eq!(last.map(|m| m.san), Some("Qh4#".to_string()));
        assert!(rules.is_check());
        assert!(rules.is_checkmate());
        assert!(rules.is_game_over());
    }

    #[test]
    fn test_stalemate_position() {
        let rules = ShakmatyRules::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        assert!(rules.is_stalemate());
        assert!(!rules.is_checkmate());
    }

    #[test]
    fn test_insufficient_material() {
        let rules = ShakmatyRules::from_fen("8/8/4k3/8/8/4K3/8/8 w - - 0 1").unwrap();
        assert_eq!(rules.draw_reason(), Some(DrawReason::InsufficientMaterial));
    }

    #[test]
    fn test_fifty_move_rule() {
        let rules = ShakmatyRules::from_fen("8/8/4k3/8/8/4K3/4R3/8 w - - 100 80").unwrap();
        assert_eq!(rules.draw_reason(), Some(DrawReason::FiftyMoveRule));
    }

    #[test]
    fn test_threefold_repetition() {
        //! Knights out and back twice returns to the start position a third time
        let mut rules = ShakmatyRules::new();
        for _ in 0..2 {
            for token in ["g1f3", "g8f6", "f3g1", "f6g8"] {
                assert_eq!(rules.draw_reason(), None);
                rules.apply_move(&mv(token)).unwrap();
            }
        }
        assert_eq!(rules.draw_reason(), Some(DrawReason::ThreefoldRepetition));
    }

    #[test]
    fn test_reset_restores_start() {
        let mut rules = ShakmatyRules::new();
        rules.apply_move(&mv("e2e4")).unwrap();

        rules.reset();

        assert_eq!(rules.position_fen(), uci_client::START_FEN);
    }

    #[test]
    fn test_rejects_bad_fen() {
        assert!(matches!(
            ShakmatyRules::from_fen("not a fen"),
            Err(GameError::InvalidPosition { .. })
        ));
    }
}
