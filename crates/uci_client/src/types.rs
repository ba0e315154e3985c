//! Move, request and result types shared by the client and its callers
//!
//! [`UciMove`] is the long-algebraic move token used on the wire
//! (`e2e4`, `e7e8q`). Parsing is strict: anything that does not match
//! `[a-h][1-8][a-h][1-8][qrbn]?` is rejected, never corrected.

use crate::difficulty::Difficulty;
use crate::error::EngineError;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Upper bound for the engine move time of a single request
pub const MAX_MOVE_TIME_MS: u64 = 10_000;

/// Board square addressed by file (0 = a) and rank (0 = 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Square {
    file: u8,
    rank: u8,
}

impl Square {
    /// Builds a square from zero-based file and rank, `None` when off the board
    pub fn new(file: u8, rank: u8) -> Option<Self> {
        (file < 8 && rank < 8).then_some(Self { file, rank })
    }

    pub fn file(self) -> u8 {
        self.file
    }

    pub fn rank(self) -> u8 {
        self.rank
    }

    /// Parses a square name such as `e4`
    pub fn parse(name: &str) -> Option<Self> {
        match name.as_bytes() {
            &[file, rank] => Self::from_ascii(file, rank),
            _ => None,
        }
    }

    fn from_ascii(file: u8, rank: u8) -> Option<Self> {
        if !(b'a'..=b'h').contains(&file) || !(b'1'..=b'8').contains(&rank) {
            return None;
        }
        Self::new(file - b'a', rank - b'1')
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.file) as char, (b'1' + self.rank) as char)
    }
}

impl Serialize for Square {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Piece a pawn promotes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Promotion {
    Queen,
    Rook,
    Bishop,
    Knight,
}

impl Promotion {
    fn from_ascii(c: u8) -> Option<Self> {
        match c {
            b'q' => Some(Self::Queen),
            b'r' => Some(Self::Rook),
            b'b' => Some(Self::Bishop),
            b'n' => Some(Self::Knight),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::Queen => 'q',
            Self::Rook => 'r',
            Self::Bishop => 'b',
            Self::Knight => 'n',
        }
    }
}

/// Move in UCI long algebraic notation
///
/// # Examples
///
/// ```
/// use uci_client::UciMove;
///
/// let mv: UciMove = "e7e8q".parse().unwrap();
/// assert_eq!(mv.to_string(), "e7e8q");
/// assert!("z9z9".parse::<UciMove>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UciMove {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Promotion>,
}

impl FromStr for UciMove {
    type Err = EngineError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let invalid = || EngineError::InvalidMove {
            token: token.to_string(),
        };
        let bytes = token.as_bytes();
        if bytes.len() != 4 && bytes.len() != 5 {
            return Err(invalid());
        }

        let from = Square::from_ascii(bytes[0], bytes[1]).ok_or_else(invalid)?;
        let to = Square::from_ascii(bytes[2], bytes[3]).ok_or_else(invalid)?;
        let promotion = match bytes.get(4) {
            Some(&c) => Some(Promotion::from_ascii(c).ok_or_else(invalid)?),
            None => None,
        };

        Ok(Self {
            from,
            to,
            promotion,
        })
    }
}

impl TryFrom<String> for UciMove {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UciMove> for String {
    fn from(mv: UciMove) -> Self {
        mv.to_string()
    }
}

impl fmt::Display for UciMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(promotion) = self.promotion {
            write!(f, "{}", promotion.as_char())?;
        }
        Ok(())
    }
}

/// One analysis request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    pub position_fen: String,
    pub difficulty: Difficulty,
    pub time_limit_ms: u64,
}

impl MoveRequest {
    /// Creates a request using the difficulty's default move time
    pub fn new(position_fen: impl Into<String>, difficulty: Difficulty) -> Self {
        Self {
            position_fen: position_fen.into(),
            difficulty,
            time_limit_ms: difficulty.move_time_ms(),
        }
    }

    pub fn with_time_limit(mut self, time_limit_ms: u64) -> Self {
        self.time_limit_ms = time_limit_ms;
        self
    }

    /// Move time sent with `go movetime`, capped at [`MAX_MOVE_TIME_MS`]
    pub fn effective_move_time_ms(&self) -> u64 {
        self.time_limit_ms.min(MAX_MOVE_TIME_MS)
    }
}

/// Outcome of exactly one request
#[derive(Debug, Clone, PartialEq)]
pub struct MoveResult {
    pub outcome: Result<UciMove, EngineError>,
    pub thinking_time_ms: u64,
    pub evaluation_centipawns: Option<i32>,
    pub depth: Option<u32>,
}

impl MoveResult {
    /// A failed result with no search statistics
    pub fn failed(error: EngineError, thinking_time_ms: u64) -> Self {
        Self {
            outcome: Err(error),
            thinking_time_ms,
            evaluation_centipawns: None,
            depth: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn best_move(&self) -> Option<UciMove> {
        self.outcome.as_ref().ok().copied()
    }

    pub fn error(&self) -> Option<&EngineError> {
        self.outcome.as_ref().err()
    }
}
