//! When the opponent gives up
//!
//! Only the six weakest levels resign, and the required deficit grows with
//! strength:
//!
//! | Level | Resigns below |
//! |-------|---------------|
//! | 1     | -800 cp       |
//! | 2     | -900 cp       |
//! | 3     | -1000 cp      |
//! | 4     | -1100 cp      |
//! | 5     | -1200 cp      |
//! | 6     | -1300 cp      |

use uci_client::Difficulty;

const MAX_RESIGNING_LEVEL: u8 = 6;

/// `evaluation_cp` is from the opponent's own point of view
pub fn should_resign(evaluation_cp: i32, difficulty: Difficulty) -> bool {
    let level = difficulty.level();
    if level > MAX_RESIGNING_LEVEL {
        return false;
    }
    let threshold = -700 - 100 * i32::from(level);
    evaluation_cp < threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(n: u8) -> Difficulty {
        Difficulty::new(n).unwrap()
    }

    #[test]
    fn test_thresholds() {
        assert!(should_resign(-801, level(1)));
        assert!(!should_resign(-800, level(1)));
        assert!(should_resign(-1301, level(6)));
        assert!(!should_resign(-1250, level(6)));
    }

    #[test]
    fn test_strong_levels_never_resign() {
        for n in 7..=10 {
            assert!(!should_resign(-uci_client::MATE_SCORE_CP, level(n)));
        }
    }
}
