//! Shared value types for the game session
//!
//! Colours, winners, time controls and the per-game settings chosen before a
//! game starts.

use serde::{Deserialize, Serialize};
use std::fmt;
use uci_client::Difficulty;

/// Side to move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    #[default]
    White,
    Black,
}

impl Color {
    pub fn opposite(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "White"),
            Color::Black => write!(f, "Black"),
        }
    }
}

impl std::str::FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "white" | "w" => Ok(Color::White),
            "black" | "b" => Ok(Color::Black),
            other => Err(format!("unknown colour '{other}'")),
        }
    }
}

/// Who won a finished game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Human,
    Opponent,
    Draw,
}

/// Fischer time control: base minutes plus an increment per move
///
/// Defaults to 5+3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeControl {
    pub initial_minutes: u32,
    pub increment_seconds: u32,
}

impl TimeControl {
    pub const MAX_MINUTES: u32 = 999;
    pub const MAX_INCREMENT_SECONDS: u32 = 60;

    pub fn new(initial_minutes: u32, increment_seconds: u32) -> Self {
        Self {
            initial_minutes,
            increment_seconds,
        }
    }

    pub fn initial_ms(&self) -> u64 {
        u64::from(self.initial_minutes) * 60_000
    }

    pub fn increment_ms(&self) -> u64 {
        u64::from(self.increment_seconds) * 1_000
    }

    /// Checks minutes are 1-999 and the increment is 0-60 seconds
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=Self::MAX_MINUTES).contains(&self.initial_minutes) {
            return Err(format!(
                "initial time must be between 1 and {} minutes, got {}",
                Self::MAX_MINUTES,
                self.initial_minutes
            ));
        }
        if self.increment_seconds > Self::MAX_INCREMENT_SECONDS {
            return Err(format!(
                "increment must be at most {} seconds, got {}",
                Self::MAX_INCREMENT_SECONDS,
                self.increment_seconds
            ));
        }
        Ok(())
    }
}

impl Default for TimeControl {
    fn default() -> Self {
        Self::new(5, 3)
    }
}

impl fmt::Display for TimeControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.initial_minutes, self.increment_seconds)
    }
}

/// Settings fixed for the duration of one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub difficulty: Difficulty,
    pub human_color: Color,
    /// `None` plays without a clock
    pub time_control: Option<TimeControl>,
    /// Let the opponent resign hopeless positions
    pub opponent_may_resign: bool,
    /// Hold engine replies until they look like considered moves
    pub pacing: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::default(),
            human_color: Color::White,
            time_control: Some(TimeControl::default()),
            opponent_may_resign: false,
            pacing: true,
        }
    }
}

impl SessionSettings {
    pub fn opponent_color(&self) -> Color {
        self.human_color.opposite()
    }

    pub fn validate(&self) -> Result<(), String> {
        match &self.time_control {
            Some(tc) => tc.validate(),
            None => Ok(()),
        }
    }
}
