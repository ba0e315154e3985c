//! Game session state machine
//!
//! Sequences one human-versus-engine game: whose turn it is, the ply
//! counter, the clock, and terminal detection. Legality is delegated to a
//! [`RulesEngine`]; engine results come back through
//! [`GameSession::apply_opponent_result`] tagged with the [`OpponentTicket`]
//! they were requested for.
//!
//! # Tickets and generations
//!
//! Every reset (new game, colour flip) bumps `generation`. A ticket records
//! the generation and ply it was issued at, and a result whose ticket no
//! longer matches is refused as [`GameError::StaleResult`]. This is what stops
//! a search started in a previous game from moving a piece in the new one.
//!
//! # Turn flow
//!
//! ```text
//! HumanTurn --submit_move--> OpponentTurn --apply_opponent_result--> HumanTurn
//!     \______________________ terminal check after each move ______________/
//! ```

use crate::game::ai::should_resign;
use crate::game::error::{GameError, GameResult};
use crate::game::resources::{result_message, DrawReason, GameClock, GameStatus, OpponentStats};
use crate::game::rules::{AppliedMove, RulesEngine};
use crate::game::types::{Color, SessionSettings, Winner};
use serde::Serialize;
use tracing::{debug, info, warn};
use uci_client::{Difficulty, EngineError, MoveResult, Promotion, Square, UciMove};
use uuid::Uuid;

/// Whose move it is while the game is playing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Turn {
    Human,
    Opponent,
}

/// Permission to search one specific position for the opponent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpponentTicket {
    pub generation: u64,
    pub ply: u32,
    pub position_fen: String,
    pub difficulty: Difficulty,
}

/// The opponent's most recent move, for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpponentMoveInfo {
    pub uci: String,
    pub san: String,
    pub thinking_time_ms: u64,
    pub evaluation_centipawns: Option<i32>,
}

/// Read-only view handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub game_id: Uuid,
    pub generation: u64,
    pub ply: u32,
    pub status: GameStatus,
    pub turn: Option<Turn>,
    pub winner: Option<Winner>,
    pub draw_reason: Option<DrawReason>,
    pub result_message: Option<&'static str>,
    pub human_color: Color,
    pub active_color: Color,
    pub difficulty: Difficulty,
    pub in_check: bool,
    pub position_fen: String,
    pub clock: Option<GameClock>,
    pub last_error: Option<String>,
    pub last_opponent_move: Option<OpponentMoveInfo>,
    pub move_history: Vec<String>,
    pub opponent_stats: OpponentStats,
    /// Square the human picked up a piece from
    pub selected: Option<Square>,
    /// Where the selected piece may go
    pub legal_targets: Vec<Square>,
}

/// One human-versus-engine game, reusable across resets
pub struct GameSession<R: RulesEngine> {
    id: Uuid,
    rules: R,
    settings: SessionSettings,
    ply: u32,
    generation: u64,
    status: GameStatus,
    winner: Option<Winner>,
    draw_reason: Option<DrawReason>,
    clock: Option<GameClock>,
    last_error: Option<String>,
    last_opponent_move: Option<OpponentMoveInfo>,
    move_history: Vec<String>,
    stats: OpponentStats,
    selected: Option<Square>,
    legal_targets: Vec<Square>,
}

impl<R: RulesEngine> GameSession<R> {
    /// Starts a game from the rules engine's current position with the clock running
    pub fn new(rules: R, settings: SessionSettings) -> Self {
        let mut session = Self {
            id: Uuid::new_v4(),
            rules,
            settings,
            ply: 0,
            generation: 0,
            status: GameStatus::Playing,
            winner: None,
            draw_reason: None,
            clock: None,
            last_error: None,
            last_opponent_move: None,
            move_history: Vec::new(),
            stats: OpponentStats::default(),
            selected: None,
            legal_targets: Vec::new(),
        };
        session.start_clock();
        info!(
            "[GAME] New game {} | Human: {} | {} | Clock: {}",
            session.id,
            session.settings.human_color,
            session.settings.difficulty,
            session
                .settings
                .time_control
                .map(|tc| tc.to_string())
                .unwrap_or_else(|| "unlimited".to_string())
        );
        session
    }

    fn start_clock(&mut self) {
        self.clock = self.settings.time_control.as_ref().map(|tc| {
            let mut clock = GameClock::new(tc);
            clock.active_color = self.rules.active_color();
            clock.start();
            clock
        });
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn ply(&self) -> u32 {
        self.ply
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn winner(&self) -> Option<Winner> {
        self.winner
    }

    pub fn draw_reason(&self) -> Option<DrawReason> {
        self.draw_reason
    }

    pub fn clock(&self) -> Option<&GameClock> {
        self.clock.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    pub fn move_history(&self) -> &[String] {
        &self.move_history
    }

    pub fn opponent_stats(&self) -> &OpponentStats {
        &self.stats
    }

    pub fn selected(&self) -> Option<Square> {
        self.selected
    }

    pub fn legal_targets(&self) -> &[Square] {
        &self.legal_targets
    }

    /// Applies from the next opponent ticket on
    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.settings.difficulty = difficulty;
    }

    pub fn is_playing(&self) -> bool {
        self.status == GameStatus::Playing
    }

    pub fn turn(&self) -> Option<Turn> {
        if !self.is_playing() {
            return None;
        }
        if self.rules.active_color() == self.settings.human_color {
            Some(Turn::Human)
        } else {
            Some(Turn::Opponent)
        }
    }

    pub fn result_message(&self) -> Option<&'static str> {
        result_message(self.status, self.winner, self.draw_reason)
    }

    fn winner_for(&self, color: Color) -> Winner {
        if color == self.settings.human_color {
            Winner::Human
        } else {
            Winner::Opponent
        }
    }

    /// Plays a human move given as a UCI token such as `e2e4` or `e7e8q`
    ///
    /// Refused when the game is over or the opponent is to move. A malformed
    /// or illegal move records `last_error` and leaves the position unchanged.
    pub fn submit_move(&mut self, token: &str) -> GameResult<AppliedMove> {
        self.ensure_human_turn()?;

        let applied = token
            .trim()
            .parse::<UciMove>()
            .map_err(|e| GameError::InvalidMove {
                message: e.to_string(),
            })
            .and_then(|mv| self.rules.apply_move(&mv));
        self.finish_human_move(applied)
    }

    /// Picks up the piece on `square`, or plays the selected piece to it
    ///
    /// With a piece selected, choosing one of its legal targets plays that
    /// move (pawns promote to a queen). Choosing the selected square again, or
    /// a square with no legal moves, drops the selection.
    pub fn select_square(&mut self, square: Square) -> GameResult<Option<AppliedMove>> {
        self.ensure_human_turn()?;

        if let Some(from) = self.selected {
            if self.legal_targets.contains(&square) {
                let mv = self
                    .rules
                    .legal_moves_from(from)
                    .into_iter()
                    .filter(|mv| mv.to == square)
                    .find(|mv| matches!(mv.promotion, None | Some(Promotion::Queen)));
                if let Some(mv) = mv {
                    let applied = self.rules.apply_move(&mv);
                    return self.finish_human_move(applied).map(Some);
                }
            }
        }

        let targets = if self.selected == Some(square) {
            Vec::new()
        } else {
            self.rules.legal_targets(square)
        };
        if targets.is_empty() {
            self.clear_selection();
        } else {
            debug!("[GAME] Selected {} ({} targets)", square, targets.len());
            self.selected = Some(square);
            self.legal_targets = targets;
        }
        Ok(None)
    }

    fn clear_selection(&mut self) {
        self.selected = None;
        self.legal_targets.clear();
    }

    fn ensure_human_turn(&self) -> GameResult<()> {
        match self.turn() {
            None => Err(GameError::GameOver),
            Some(Turn::Opponent) => Err(GameError::NotYourTurn),
            Some(Turn::Human) => Ok(()),
        }
    }

    fn finish_human_move(&mut self, applied: GameResult<AppliedMove>) -> GameResult<AppliedMove> {
        match applied {
            Ok(applied) => {
                debug!("[GAME] Human plays {} ({})", applied.uci, applied.san);
                self.complete_move(self.settings.human_color, &applied);
                Ok(applied)
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// A ticket when the opponent is to move, `None` otherwise
    pub fn opponent_ticket(&self) -> Option<OpponentTicket> {
        (self.turn() == Some(Turn::Opponent)).then(|| OpponentTicket {
            generation: self.generation,
            ply: self.ply,
            position_fen: self.rules.position_fen(),
            difficulty: self.settings.difficulty,
        })
    }

    fn ticket_is_current(&self, ticket: &OpponentTicket) -> bool {
        ticket.generation == self.generation
            && ticket.ply == self.ply
            && self.turn() == Some(Turn::Opponent)
    }

    /// Hands back the engine result for `ticket`
    ///
    /// Returns `Ok(None)` for a `Busy` result. Nothing is recorded and the
    /// ticket stays valid, so the caller asks again later. Any other failure
    /// is recorded in `last_error` and the game stays playing so the move can
    /// be retried.
    pub fn apply_opponent_result(
        &mut self,
        ticket: &OpponentTicket,
        result: MoveResult,
    ) -> GameResult<Option<AppliedMove>> {
        if !self.ticket_is_current(ticket) {
            debug!(
                "[GAME] Ignoring result for generation {} ply {} (now generation {} ply {})",
                ticket.generation, ticket.ply, self.generation, self.ply
            );
            return Err(GameError::StaleResult {
                generation: ticket.generation,
                ply: ticket.ply,
            });
        }

        let mv = match &result.outcome {
            Ok(mv) => *mv,
            Err(EngineError::Busy) => {
                debug!("[GAME] Engine busy for ply {}", ticket.ply);
                return Ok(None);
            }
            Err(e) => {
                warn!("[GAME] Opponent failed to move: {}", e);
                self.last_error = Some(e.to_string());
                return Err(GameError::Engine(e.clone()));
            }
        };

        let applied = match self.rules.apply_move(&mv) {
            Ok(applied) => applied,
            Err(e) => {
                warn!("[GAME] Opponent move {} rejected: {}", mv, e);
                self.last_error = Some(e.to_string());
                return Err(e);
            }
        };

        info!(
            "[GAME] Opponent plays {} ({}) after {}ms",
            applied.uci, applied.san, result.thinking_time_ms
        );
        self.stats.record(&result);
        self.last_opponent_move = Some(OpponentMoveInfo {
            uci: applied.uci.to_string(),
            san: applied.san.clone(),
            thinking_time_ms: result.thinking_time_ms,
            evaluation_centipawns: result.evaluation_centipawns,
        });
        self.complete_move(self.settings.opponent_color(), &applied);

        if self.is_playing()
            && self.settings.opponent_may_resign
            && result
                .evaluation_centipawns
                .is_some_and(|eval| should_resign(eval, self.settings.difficulty))
        {
            info!("[GAME] Opponent resigns");
            self.finish(GameStatus::Resigned, Winner::Human, None);
        }

        Ok(Some(applied))
    }

    fn complete_move(&mut self, mover: Color, applied: &AppliedMove) {
        self.last_error = None;
        self.clear_selection();
        self.ply += 1;
        self.move_history.push(applied.san.clone());
        if let Some(clock) = self.clock.as_mut() {
            clock.complete_move(mover);
        }
        self.check_terminal(mover);
    }

    fn check_terminal(&mut self, mover: Color) {
        if self.rules.is_checkmate() {
            self.finish(GameStatus::Checkmate, self.winner_for(mover), None);
        } else if self.rules.is_stalemate() {
            self.finish(GameStatus::Stalemate, Winner::Draw, None);
        } else if let Some(reason) = self.rules.draw_reason() {
            self.finish(GameStatus::Draw, Winner::Draw, Some(reason));
        }
    }

    fn finish(&mut self, status: GameStatus, winner: Winner, draw_reason: Option<DrawReason>) {
        self.status = status;
        self.winner = Some(winner);
        self.draw_reason = draw_reason;
        self.clear_selection();
        if let Some(clock) = self.clock.as_mut() {
            clock.stop();
        }
        info!(
            "[GAME] Game {} over after {} plies: {:?} ({:?})",
            self.id, self.ply, status, winner
        );
    }

    /// Advances the clock; returns `true` when this tick ended the game on time
    pub fn tick(&mut self, elapsed_ms: u64) -> bool {
        if !self.is_playing() {
            return false;
        }
        let Some(clock) = self.clock.as_mut() else {
            return false;
        };
        if !clock.tick(elapsed_ms) {
            return false;
        }
        let flagged = clock.active_color;
        info!("[CLOCK] {} ran out of time", flagged);
        self.finish(GameStatus::Timeout, self.winner_for(flagged.opposite()), None);
        true
    }

    /// The human gives up; the opponent wins
    pub fn resign(&mut self) -> GameResult<()> {
        if !self.is_playing() {
            return Err(GameError::GameOver);
        }
        self.finish(GameStatus::Resigned, Winner::Opponent, None);
        Ok(())
    }

    /// Draw offers are always accepted
    pub fn offer_draw(&mut self) -> GameResult<()> {
        if !self.is_playing() {
            return Err(GameError::GameOver);
        }
        self.finish(GameStatus::Draw, Winner::Draw, Some(DrawReason::Agreement));
        Ok(())
    }

    /// Resets to the starting position, optionally switching sides
    ///
    /// Invalidates every outstanding ticket.
    pub fn new_game(&mut self, human_color: Option<Color>) {
        if let Some(color) = human_color {
            self.settings.human_color = color;
        }
        self.rules.reset();
        self.id = Uuid::new_v4();
        self.generation += 1;
        self.ply = 0;
        self.status = GameStatus::Playing;
        self.winner = None;
        self.draw_reason = None;
        self.last_error = None;
        self.last_opponent_move = None;
        self.move_history.clear();
        self.stats = OpponentStats::default();
        self.clear_selection();
        self.start_clock();
        info!(
            "[GAME] New game {} (generation {}) | Human: {}",
            self.id, self.generation, self.settings.human_color
        );
    }

    /// New game with the human playing the other colour
    pub fn flip_color(&mut self) {
        let color = self.settings.human_color.opposite();
        self.new_game(Some(color));
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            game_id: self.id,
            generation: self.generation,
            ply: self.ply,
            status: self.status,
            turn: self.turn(),
            winner: self.winner,
            draw_reason: self.draw_reason,
            result_message: self.result_message(),
            human_color: self.settings.human_color,
            active_color: self.rules.active_color(),
            difficulty: self.settings.difficulty,
            in_check: self.rules.is_check(),
            position_fen: self.rules.position_fen(),
            clock: self.clock.clone(),
            last_error: self.last_error.clone(),
            last_opponent_move: self.last_opponent_move.clone(),
            move_history: self.move_history.clone(),
            opponent_stats: self.stats.clone(),
            selected: self.selected,
            legal_targets: self.legal_targets.clone(),
        }
    }
}
