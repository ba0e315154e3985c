//! Game clock with Fischer increment support
//!
//! Each side starts with a base time and receives an increment after each
//! completed move. Example: 5+3 means five minutes base with three seconds
//! added per move.
//!
//! # Time Management
//!
//! - The clock only runs while `running` is set
//! - [`GameClock::tick`] charges elapsed time to the side to move, clamping at zero
//! - [`GameClock::complete_move`] credits the increment and hands the clock over
//! - Expiry is reported; deciding the result is the session's job
//!
//! Times are whole milliseconds so repeated ticks never drift.

use crate::game::types::{Color, TimeControl};
use serde::Serialize;

/// Per-side remaining time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameClock {
    pub white_ms: u64,
    pub black_ms: u64,
    pub increment_ms: u64,
    pub running: bool,
    pub active_color: Color,
}

impl GameClock {
    /// A stopped clock for `time_control`, White to move
    pub fn new(time_control: &TimeControl) -> Self {
        Self {
            white_ms: time_control.initial_ms(),
            black_ms: time_control.initial_ms(),
            increment_ms: time_control.increment_ms(),
            running: false,
            active_color: Color::White,
        }
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn remaining_ms(&self, color: Color) -> u64 {
        match color {
            Color::White => self.white_ms,
            Color::Black => self.black_ms,
        }
    }

    fn remaining_mut(&mut self, color: Color) -> &mut u64 {
        match color {
            Color::White => &mut self.white_ms,
            Color::Black => &mut self.black_ms,
        }
    }

    /// Charges `elapsed_ms` to the side to move
    ///
    /// Returns `true` when that side has just run out. A stopped clock is untouched.
    pub fn tick(&mut self, elapsed_ms: u64) -> bool {
        if !self.running {
            return false;
        }
        let active = self.active_color;
        let remaining = self.remaining_mut(active);
        *remaining = remaining.saturating_sub(elapsed_ms);
        *remaining == 0
    }

    /// Credits the increment to `mover` and hands the clock to the other side
    pub fn complete_move(&mut self, mover: Color) {
        if self.increment_ms > 0 {
            let increment = self.increment_ms;
            let remaining = self.remaining_mut(mover);
            *remaining = remaining.saturating_add(increment);
        }
        self.active_color = mover.opposite();
    }

    pub fn is_expired(&self, color: Color) -> bool {
        self.remaining_ms(color) == 0
    }
}

/// `m:ss` rendering used by the text front end
pub fn format_clock(ms: u64) -> String {
    let total_seconds = ms / 1000;
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}
