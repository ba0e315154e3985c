//! Opponent difficulty levels
//!
//! The user-facing scale runs from 1 to 10. Each level maps onto engine settings
//! through fixed tables:
//!
//! | Level | Skill Level | Move time | Pacing delay | Category   |
//! |-------|-------------|-----------|--------------|------------|
//! | 1     | 0           | 500ms     | 500ms        | Beginner   |
//! | 2     | 2           | 600ms     | 700ms        | Beginner   |
//! | 3     | 4           | 700ms     | 900ms        | Casual     |
//! | 4     | 6           | 800ms     | 1100ms       | Casual     |
//! | 5     | 8           | 1000ms    | 1300ms       | Club       |
//! | 6     | 11          | 1200ms    | 1500ms       | Club       |
//! | 7     | 13          | 1400ms    | 1700ms       | Tournament |
//! | 8     | 15          | 1600ms    | 1900ms       | Tournament |
//! | 9     | 17          | 1800ms    | 2100ms       | Expert     |
//! | 10    | 19          | 2000ms    | 2300ms       | Expert     |
//!
//! Skill level is `floor((level - 1) * 2.2)`, which keeps the mapping strictly
//! increasing over the engine's 0-20 range.

use serde::{Deserialize, Serialize};
use std::fmt;

const MOVE_TIME_MS: [u64; 10] = [500, 600, 700, 800, 1000, 1200, 1400, 1600, 1800, 2000];

const DESCRIPTIONS: [&str; 10] = [
    "Beginner (learning the rules)",
    "Beginner+ (making basic moves)",
    "Casual player (plays for fun)",
    "Casual+ (knows basic tactics)",
    "Club player (plays regularly)",
    "Strong club player (quite good)",
    "Tournament player (competitive)",
    "Strong tournament player (very good)",
    "Expert level (very strong)",
    "Master level (extremely strong)",
];

/// Difficulty level in `1..=10`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Difficulty(u8);

impl Difficulty {
    pub const MIN: Difficulty = Difficulty(1);
    pub const MAX: Difficulty = Difficulty(10);

    /// Returns `None` for levels outside `1..=10`
    pub fn new(level: u8) -> Option<Self> {
        (Self::MIN.0..=Self::MAX.0)
            .contains(&level)
            .then_some(Self(level))
    }

    pub fn level(self) -> u8 {
        self.0
    }

    fn index(self) -> usize {
        usize::from(self.0 - 1)
    }

    /// Engine `Skill Level` option value (0-20)
    pub fn skill_level(self) -> u8 {
        (u16::from(self.0 - 1) * 22 / 10) as u8
    }

    /// Engine search time for `go movetime`
    pub fn move_time_ms(self) -> u64 {
        MOVE_TIME_MS[self.index()]
    }

    /// Base perceived thinking time before phase and jitter adjustments
    pub fn thinking_delay_ms(self) -> u64 {
        300 + 200 * u64::from(self.0)
    }

    pub fn description(self) -> &'static str {
        DESCRIPTIONS[self.index()]
    }

    pub fn category(self) -> &'static str {
        match self.0 {
            1 | 2 => "Beginner",
            3 | 4 => "Casual",
            5 | 6 => "Club",
            7 | 8 => "Tournament",
            _ => "Expert",
        }
    }

    pub fn all() -> impl Iterator<Item = Difficulty> {
        (Self::MIN.0..=Self::MAX.0).map(Difficulty)
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty(5)
    }
}

impl TryFrom<u8> for Difficulty {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level).ok_or_else(|| format!("difficulty must be between 1 and 10, got {level}"))
    }
}

impl From<Difficulty> for u8 {
    fn from(difficulty: Difficulty) -> Self {
        difficulty.0
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Level {} - {}", self.0, self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_out_of_range() {
        assert!(Difficulty::new(0).is_none());
        assert!(Difficulty::new(11).is_none());
        assert!(Difficulty::new(1).is_some());
        assert!(Difficulty::new(10).is_some());
    }

    #[test]
    fn test_skill_level_mapping() {
        let levels: Vec<u8> = Difficulty::all().map(Difficulty::skill_level).collect();
        assert_eq!(levels, vec![0, 2, 4, 6, 8, 11, 13, 15, 17, 19]);
    }

    #[test]
    fn test_tables_increase_with_level() {
        //! Harder levels never search less or respond faster
        let all: Vec<Difficulty> = Difficulty::all().collect();
        for pair in all.windows(2) {
            assert!(pair[0].skill_level() < pair[1].skill_level());
            assert!(pair[0].move_time_ms() < pair[1].move_time_ms());
            assert!(pair[0].thinking_delay_ms() < pair[1].thinking_delay_ms());
        }
        assert_eq!(Difficulty::MIN.thinking_delay_ms(), 500);
        assert_eq!(Difficulty::MAX.thinking_delay_ms(), 2300);
    }

    #[test]
    fn test_default_is_club_level() {
        assert_eq!(Difficulty::default().level(), 5);
        assert_eq!(Difficulty::default().category(), "Club");
    }
}
