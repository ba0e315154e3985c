//! Perceived thinking time
//!
//! Engines answer easy positions almost instantly, which feels robotic. The
//! coordinator holds successful answers back until a target time has passed:
//!
//! ```text
//! target = base_delay(difficulty) * phase_multiplier * opening_factor * jitter
//! ```
//!
//! | Phase      | Multiplier | Detected when (Q+R+B+N on board)          |
//! |------------|------------|-------------------------------------------|
//! | Opening    | 0.7        | 12 or more pieces                         |
//! | Middlegame | 1.0        | everything else                           |
//! | Endgame    | 1.3        | at most 6, or at most 2 majors and 2 minors |
//!
//! The opening factor is 0.9 for the first ten moves (plies 0-19). Jitter is
//! uniform in `[0.8, 1.2]`.

use rand::Rng;
use std::time::Duration;
use uci_client::Difficulty;

const OPENING_PLIES: u32 = 20;
const JITTER_RANGE: (f64, f64) = (0.8, 1.2);

/// Rough game stage judged from material
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionPhase {
    Opening,
    Middlegame,
    Endgame,
}

impl PositionPhase {
    /// Counts queens, rooks, bishops and knights of both colours in the placement field
    pub fn from_fen(fen: &str) -> Self {
        let placement = fen.split_whitespace().next().unwrap_or_default();
        let count = |pieces: &[char]| {
            placement
                .chars()
                .filter(|c| pieces.contains(&c.to_ascii_lowercase()))
                .count()
        };
        let majors = count(&['q', 'r']);
        let minors = count(&['b', 'n']);
        let total = majors + minors;

        if total >= 12 {
            PositionPhase::Opening
        } else if total <= 6 || (majors <= 2 && minors <= 2) {
            PositionPhase::Endgame
        } else {
            PositionPhase::Middlegame
        }
    }

    pub fn multiplier(self) -> f64 {
        match self {
            PositionPhase::Opening => 0.7,
            PositionPhase::Middlegame => 1.0,
            PositionPhase::Endgame => 1.3,
        }
    }
}

/// Thinking-time policy applied by the coordinator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacing {
    enabled: bool,
}

impl Default for Pacing {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Pacing {
    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    pub fn enabled(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Target duration for one move, with fresh jitter
    pub fn target(&self, difficulty: Difficulty, fen: &str, ply: u32) -> Duration {
        if !self.enabled {
            return Duration::ZERO;
        }
        let jitter = rand::rng().random_range(JITTER_RANGE.0..=JITTER_RANGE.1);
        target_with_jitter(difficulty, fen, ply, jitter)
    }
}

/// Deterministic part of [`Pacing::target`]
pub fn target_with_jitter(difficulty: Difficulty, fen: &str, ply: u32, jitter: f64) -> Duration {
    let base = difficulty.thinking_delay_ms() as f64;
    let opening_factor = if ply < OPENING_PLIES { 0.9 } else { 1.0 };
    let ms = base * PositionPhase::from_fen(fen).multiplier() * opening_factor * jitter;
    Duration::from_millis(ms.round().max(0.0) as u64)
}

/// Time still to wait once `elapsed` has been spent searching
pub fn remaining(target: Duration, elapsed: Duration) -> Duration {
    target.saturating_sub(elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENDGAME_FEN: &str = "8/5k2/8/3R4/8/2B5/5K2/8 w - - 0 60";
    const MIDDLEGAME_FEN: &str = "r2q1rk1/pp3ppp/2n5/3p4/3P4/2N5/PP3PPP/R2Q1RK1 w - - 0 15";

    fn level(n: u8) -> Difficulty {
        Difficulty::new(n).unwrap()
    }

    #[test]
    fn test_phase_detection() {
        assert_eq!(
            PositionPhase::from_fen(uci_client::START_FEN),
            PositionPhase::Opening
        );
        assert_eq!(PositionPhase::from_fen(MIDDLEGAME_FEN), PositionPhase::Middlegame);
        assert_eq!(PositionPhase::from_fen(ENDGAME_FEN), PositionPhase::Endgame);
    }

    #[test]
    fn test_target_formula() {
        //! 500ms base, opening 0.7, early 0.9, no jitter
        assert_eq!(
            target_with_jitter(level(1), uci_client::START_FEN, 0, 1.0),
            Duration::from_millis(315)
        );
        assert_eq!(
            target_with_jitter(level(10), ENDGAME_FEN, 80, 1.0),
            Duration::from_millis(2990)
        );
        assert_eq!(
            target_with_jitter(level(5), MIDDLEGAME_FEN, 30, 1.2),
            Duration::from_millis(1560)
        );
    }

    #[test]
    fn test_random_target_within_jitter_bounds() {
        let pacing = Pacing::default();
        for _ in 0..200 {
            let target = pacing.target(level(1), uci_client::START_FEN, 0);
            assert!(target >= Duration::from_millis(252), "{:?} below 0.8 jitter", target);
            assert!(target <= Duration::from_millis(378), "{:?} above 1.2 jitter", target);
        }
    }

    #[test]
    fn test_disabled_pacing_is_zero() {
        assert_eq!(
            Pacing::disabled().target(level(10), ENDGAME_FEN, 50),
            Duration::ZERO
        );
    }

    #[test]
    fn test_remaining_saturates() {
        assert_eq!(
            remaining(Duration::from_millis(800), Duration::from_millis(300)),
            Duration::from_millis(500)
        );
        assert_eq!(
            remaining(Duration::from_millis(800), Duration::from_millis(1300)),
            Duration::ZERO
        );
    }
}
