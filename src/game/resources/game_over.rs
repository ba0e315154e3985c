//! Game status tracking and result messages
//!
//! A session starts `Playing` and moves to exactly one terminal state. The
//! terminal state together with the [`Winner`] decides the result message.
//!
//! # State Transitions
//!
//! ```text
//! Playing → Checkmate / Stalemate / Draw / Resigned / Timeout
//! ```
//!
//! All non-Playing states are terminal. Only a new game leaves them.

use crate::game::types::Winner;
use serde::{Deserialize, Serialize};

/// Phase of the session lifecycle
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// Moves are being played
    #[default]
    Playing,
    /// The side to move is mated
    Checkmate,
    /// The side to move has no legal move and is not in check
    Stalemate,
    /// Drawn by rule or agreement, see [`DrawReason`]
    Draw,
    /// One side gave up
    Resigned,
    /// A clock reached zero
    Timeout,
}

impl GameStatus {
    /// Check if the game has ended
    pub fn is_game_over(self) -> bool {
        self != GameStatus::Playing
    }
}

/// Why a game was drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawReason {
    InsufficientMaterial,
    FiftyMoveRule,
    ThreefoldRepetition,
    Agreement,
}

/// Human-readable result line for a finished game
///
/// Returns `None` while the game is still playing.
pub fn result_message(
    status: GameStatus,
    winner: Option<Winner>,
    draw_reason: Option<DrawReason>,
) -> Option<&'static str> {
    let message = match (status, winner) {
        (GameStatus::Playing, _) => return None,
        (GameStatus::Checkmate, Some(Winner::Human)) => "Congratulations! You won by checkmate!",
        (GameStatus::Checkmate, _) => "Computer wins by checkmate. Better luck next time!",
        (GameStatus::Resigned, Some(Winner::Human)) => "Computer resigned. You win!",
        (GameStatus::Resigned, _) => "You resigned. Computer wins.",
        (GameStatus::Timeout, Some(Winner::Human)) => "Computer ran out of time. You win!",
        (GameStatus::Timeout, _) => "You ran out of time. Computer wins.",
        (GameStatus::Stalemate, _) => "Game drawn by stalemate.",
        (GameStatus::Draw, _) => match draw_reason {
            Some(DrawReason::ThreefoldRepetition) => "Game drawn by threefold repetition.",
            Some(DrawReason::FiftyMoveRule) => "Game drawn by fifty-move rule.",
            Some(DrawReason::InsufficientMaterial) => "Game drawn by insufficient material.",
            Some(DrawReason::Agreement) | None => "Game drawn by agreement.",
        },
    };
    Some(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_playing_is_live() {
        assert!(!GameStatus::Playing.is_game_over());
        for status in [
            GameStatus::Checkmate,
            GameStatus::Stalemate,
            GameStatus::Draw,
            GameStatus::Resigned,
            GameStatus::Timeout,
        ] {
            assert!(status.is_game_over(), "{:?} should be terminal", status);
        }
    }

    #[test]
    fn test_result_messages() {
        assert_eq!(result_message(GameStatus::Playing, None, None), None);
        assert_eq!(
            result_message(GameStatus::Timeout, Some(Winner::Opponent), None),
            Some("You ran out of time. Computer wins.")
        );
        assert_eq!(
            result_message(
                GameStatus::Draw,
                Some(Winner::Draw),
                Some(DrawReason::FiftyMoveRule)
            ),
            Some("Game drawn by fifty-move rule.")
        );
    }
}
