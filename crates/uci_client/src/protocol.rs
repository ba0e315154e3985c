//! UCI line protocol: outgoing commands and classification of engine output
//!
//! Only the subset needed to play a game is modelled. Lines the client does not
//! care about (`id`, `option`, unknown tokens) classify as [`EngineLine::Other`]
//! and are ignored by the session.

/// Command sent to the engine, one per line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Uci,
    IsReady,
    SetOption { name: String, value: String },
    UciNewGame,
    PositionFen(String),
    GoMoveTime(u64),
    Stop,
    Quit,
}

impl Command {
    pub fn set_option(name: impl Into<String>, value: impl ToString) -> Self {
        Self::SetOption {
            name: name.into(),
            value: value.to_string(),
        }
    }

    /// Renders the command without a trailing newline
    pub fn to_line(&self) -> String {
        match self {
            Self::Uci => "uci".to_string(),
            Self::IsReady => "isready".to_string(),
            Self::SetOption { name, value } => format!("setoption name {name} value {value}"),
            Self::UciNewGame => "ucinewgame".to_string(),
            Self::PositionFen(fen) => format!("position fen {fen}"),
            Self::GoMoveTime(ms) => format!("go movetime {ms}"),
            Self::Stop => "stop".to_string(),
            Self::Quit => "quit".to_string(),
        }
    }
}

/// Search statistics carried by an `info` line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InfoLine {
    pub score_cp: Option<i32>,
    pub mate_in: Option<i32>,
    pub depth: Option<u32>,
}

/// Classified line of engine output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineLine {
    UciOk,
    ReadyOk,
    BestMove {
        token: String,
        ponder: Option<String>,
    },
    Info(InfoLine),
    Other,
}

impl EngineLine {
    /// Classifies a line by its first token
    ///
    /// The move token of `bestmove` is kept verbatim; validating it is the
    /// session's job so a malformed token can be reported back to the caller.
    pub fn parse(line: &str) -> Self {
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("uciok") => Self::UciOk,
            Some("readyok") => Self::ReadyOk,
            Some("bestmove") => {
                let token = tokens.next().unwrap_or_default().to_string();
                let ponder = match tokens.next() {
                    Some("ponder") => tokens.next().map(str::to_string),
                    _ => None,
                };
                Self::BestMove { token, ponder }
            }
            Some("info") => Self::Info(parse_info(tokens)),
            _ => Self::Other,
        }
    }
}

fn parse_info<'a>(mut tokens: impl Iterator<Item = &'a str>) -> InfoLine {
    let mut info = InfoLine::default();
    while let Some(token) = tokens.next() {
        match token {
            "depth" => info.depth = tokens.next().and_then(|v| v.parse().ok()),
            "score" => match tokens.next() {
                Some("cp") => info.score_cp = tokens.next().and_then(|v| v.parse().ok()),
                Some("mate") => info.mate_in = tokens.next().and_then(|v| v.parse().ok()),
                _ => {}
            },
            // pv is always last and its moves could be mistaken for keywords
            "pv" => break,
            _ => {}
        }
    }
    info
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_lines() {
        assert_eq!(Command::Uci.to_line(), "uci");
        assert_eq!(
            Command::set_option("Skill Level", 8).to_line(),
            "setoption name Skill Level value 8"
        );
        assert_eq!(
            Command::PositionFen("8/8/8/8/8/8/8/K6k w - - 0 1".into()).to_line(),
            "position fen 8/8/8/8/8/8/8/K6k w - - 0 1"
        );
        assert_eq!(Command::GoMoveTime(1500).to_line(), "go movetime 1500");
    }

    #[test]
    fn test_parse_handshake_lines() {
        assert_eq!(EngineLine::parse("uciok"), EngineLine::UciOk);
        assert_eq!(EngineLine::parse("readyok\r"), EngineLine::ReadyOk);
        assert_eq!(EngineLine::parse("id name Stockfish 16"), EngineLine::Other);
        assert_eq!(
            EngineLine::parse("option name Hash type spin default 16 min 1 max 33554432"),
            EngineLine::Other
        );
        assert_eq!(EngineLine::parse(""), EngineLine::Other);
    }

    #[test]
    fn test_parse_bestmove() {
        assert_eq!(
            EngineLine::parse("bestmove e2e4 ponder e7e5"),
            EngineLine::BestMove {
                token: "e2e4".into(),
                ponder: Some("e7e5".into())
            }
        );
        assert_eq!(
            EngineLine::parse("bestmove (none)"),
            EngineLine::BestMove {
                token: "(none)".into(),
                ponder: None
            }
        );
    }

    #[test]
    fn test_parse_info_score_and_depth() {
        let line = "info depth 12 seldepth 18 multipv 1 score cp -34 nodes 12345 nps 100000 pv e7e5 g1f3";
        assert_eq!(
            EngineLine::parse(line),
            EngineLine::Info(InfoLine {
                score_cp: Some(-34),
                mate_in: None,
                depth: Some(12)
            })
        );
    }

    #[test]
    fn test_parse_info_mate_score() {
        let line = "info depth 5 score mate -2 pv h7h8";
        match EngineLine::parse(line) {
            EngineLine::Info(info) => {
                assert_eq!(info.mate_in, Some(-2));
                assert_eq!(info.score_cp, None);
            }
            other => panic!("expected info, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_info_string_is_harmless() {
        assert_eq!(
            EngineLine::parse("info string NNUE evaluation using nn-5af11540bbfe.nnue"),
            EngineLine::Info(InfoLine::default())
        );
    }
}
