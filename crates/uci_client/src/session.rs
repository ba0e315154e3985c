//! Protocol session actor
//!
//! One task owns the transport and the single pending-request slot. Commands
//! arrive over an mpsc channel from [`crate::EngineClient`] handles and each
//! move request is answered exactly once through its oneshot.
//!
//! # Correlation
//!
//! UCI answers every `go` with exactly one `bestmove`, in order. When a search
//! is abandoned (stop, timeout, caller gone) the session sends `stop` and
//! remembers that one `bestmove` is still owed. Until every owed `bestmove`
//! has arrived, `info` and `bestmove` lines belong to abandoned searches and
//! are discarded, so a stale answer can never resolve a newer request.
//!
//! # Handshake
//!
//! `uci`, the configured `setoption` lines and `isready` are sent at startup.
//! The session is ready once both `uciok` and `readyok` have been seen. If the
//! handshake deadline passes first the session goes ready in degraded mode and
//! upgrades itself if the acknowledgements turn up later.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::protocol::{Command, EngineLine, InfoLine};
use crate::transport::EngineTransport;
use crate::types::{MoveRequest, MoveResult, UciMove};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

/// Centipawn value reported for forced mates
pub const MATE_SCORE_CP: i32 = 32_000;

/// Readiness of the engine session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineStatus {
    /// Handshake in progress
    Starting,
    /// Accepting requests; `degraded` when the handshake never fully completed
    Ready { degraded: bool },
    /// The engine is gone and will not come back
    Unavailable { reason: String },
}

impl EngineStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

pub(crate) enum SessionCommand {
    RequestMove {
        request: MoveRequest,
        reply: oneshot::Sender<MoveResult>,
    },
    Stop {
        done: oneshot::Sender<()>,
    },
    NewGame {
        done: oneshot::Sender<()>,
    },
    Quit {
        done: oneshot::Sender<()>,
    },
}

struct PendingRequest {
    started_at: Instant,
    deadline: Instant,
    reply: oneshot::Sender<MoveResult>,
    last_evaluation: Option<i32>,
    last_depth: Option<u32>,
}

impl PendingRequest {
    fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }

    fn finish(self, outcome: Result<UciMove, EngineError>) {
        let result = MoveResult {
            outcome,
            thinking_time_ms: self.elapsed_ms(),
            evaluation_centipawns: self.last_evaluation,
            depth: self.last_depth,
        };
        if self.reply.send(result).is_err() {
            debug!("[UCI] Requester went away before the result was delivered");
        }
    }

    fn record(&mut self, info: InfoLine) {
        if let Some(cp) = info.score_cp {
            self.last_evaluation = Some(cp);
        } else if let Some(mate) = info.mate_in {
            self.last_evaluation = Some(if mate >= 0 { MATE_SCORE_CP } else { -MATE_SCORE_CP });
        }
        if info.depth.is_some() {
            self.last_depth = info.depth;
        }
    }
}

pub(crate) struct EngineSession<T> {
    transport: T,
    config: EngineConfig,
    commands: mpsc::Receiver<SessionCommand>,
    status: watch::Sender<EngineStatus>,
    pending: Option<PendingRequest>,
    /// `bestmove` lines still owed by abandoned searches
    owed_bestmoves: usize,
    uci_ok: bool,
    ready_ok: bool,
    handshake_deadline: Option<Instant>,
}

impl<T: EngineTransport> EngineSession<T> {
    pub(crate) fn new(
        transport: T,
        config: EngineConfig,
        commands: mpsc::Receiver<SessionCommand>,
        status: watch::Sender<EngineStatus>,
    ) -> Self {
        Self {
            transport,
            config,
            commands,
            status,
            pending: None,
            owed_bestmoves: 0,
            uci_ok: false,
            ready_ok: false,
            handshake_deadline: None,
        }
    }

    pub(crate) async fn run(mut self) {
        if let Err(e) = self.begin_handshake().await {
            error!("[ENGINE] Handshake could not be sent: {}", e);
            self.set_status(EngineStatus::Unavailable {
                reason: e.to_string(),
            });
            self.transport.shutdown().await;
            self.refuse_remaining().await;
            return;
        }

        loop {
            let handshake_deadline = self.handshake_deadline;
            let search_deadline = self.pending.as_ref().map(|p| p.deadline);

            tokio::select! {
                line = self.transport.recv() => match line {
                    Some(line) => self.handle_line(&line).await,
                    None => {
                        self.on_transport_closed();
                        break;
                    }
                },
                command = self.commands.recv() => match command {
                    Some(SessionCommand::Quit { done }) => {
                        self.quit().await;
                        let _ = done.send(());
                        return;
                    }
                    Some(command) => self.handle_command(command).await,
                    None => {
                        self.quit().await;
                        return;
                    }
                },
                _ = sleep_until(handshake_deadline.unwrap_or_else(Instant::now)),
                    if handshake_deadline.is_some() => self.on_handshake_timeout(),
                _ = sleep_until(search_deadline.unwrap_or_else(Instant::now)),
                    if search_deadline.is_some() => self.on_search_timeout().await,
            }
        }

        self.transport.shutdown().await;
        self.refuse_remaining().await;
    }

    async fn begin_handshake(&mut self) -> EngineResult<()> {
        self.handshake_deadline = Some(Instant::now() + self.config.handshake_timeout());
        self.send(Command::Uci).await?;
        let options = self.config.options.clone();
        for (name, value) in options {
            self.send(Command::set_option(name, value)).await?;
        }
        self.send(Command::IsReady).await
    }

    async fn send(&mut self, command: Command) -> EngineResult<()> {
        self.transport.send(&command.to_line()).await
    }

    fn set_status(&self, status: EngineStatus) {
        self.status.send_replace(status);
    }

    async fn handle_line(&mut self, line: &str) {
        match EngineLine::parse(line) {
            EngineLine::UciOk => {
                self.uci_ok = true;
                self.check_handshake();
            }
            EngineLine::ReadyOk => {
                self.ready_ok = true;
                self.check_handshake();
            }
            EngineLine::Info(info) => {
                if self.owed_bestmoves > 0 {
                    return;
                }
                if let Some(pending) = self.pending.as_mut() {
                    pending.record(info);
                }
            }
            EngineLine::BestMove { token, .. } => self.on_bestmove(token),
            EngineLine::Other => {}
        }
    }

    fn check_handshake(&mut self) {
        if !(self.uci_ok && self.ready_ok) {
            return;
        }
        match &*self.status.borrow() {
            EngineStatus::Ready { degraded: false } | EngineStatus::Unavailable { .. } => return,
            EngineStatus::Ready { degraded: true } => {
                info!("[ENGINE] Late handshake completed, leaving degraded mode")
            }
            EngineStatus::Starting => info!("[ENGINE] Engine ready"),
        }
        self.handshake_deadline = None;
        self.set_status(EngineStatus::Ready { degraded: false });
    }

    fn on_handshake_timeout(&mut self) {
        self.handshake_deadline = None;
        warn!(
            "[ENGINE] No complete handshake after {}ms (uciok: {}, readyok: {}); continuing in degraded mode",
            self.config.handshake_timeout_ms, self.uci_ok, self.ready_ok
        );
        self.set_status(EngineStatus::Ready { degraded: true });
    }

    fn on_bestmove(&mut self, token: String) {
        if self.owed_bestmoves > 0 {
            self.owed_bestmoves -= 1;
            debug!("[UCI] Discarding bestmove {} from an abandoned search", token);
            return;
        }
        let Some(pending) = self.pending.take() else {
            warn!("[UCI] Unsolicited bestmove {}", token);
            return;
        };
        let outcome = token.parse::<UciMove>();
        match &outcome {
            Ok(mv) => info!(
                "[UCI] Best move {} after {}ms (eval: {:?}, depth: {:?})",
                mv,
                pending.elapsed_ms(),
                pending.last_evaluation,
                pending.last_depth
            ),
            Err(_) => warn!("[UCI] Engine returned an invalid move token '{}'", token),
        }
        pending.finish(outcome);
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::RequestMove { request, reply } => self.start_search(request, reply).await,
            SessionCommand::Stop { done } => {
                self.abandon_search(EngineError::Cancelled).await;
                let _ = done.send(());
            }
            SessionCommand::NewGame { done } => {
                self.abandon_search(EngineError::Cancelled).await;
                if let Err(e) = self.send(Command::UciNewGame).await {
                    warn!("[ENGINE] Failed to send ucinewgame: {}", e);
                }
                let _ = done.send(());
            }
            // handled by the run loop
            SessionCommand::Quit { done } => {
                let _ = done.send(());
            }
        }
    }

    async fn start_search(&mut self, request: MoveRequest, reply: oneshot::Sender<MoveResult>) {
        if self.pending.as_ref().is_some_and(|p| p.reply.is_closed()) {
            debug!("[UCI] Previous requester is gone, abandoning its search");
            self.abandon_search(EngineError::Cancelled).await;
        }

        if self.pending.is_some() {
            let _ = reply.send(MoveResult::failed(EngineError::Busy, 0));
            return;
        }

        let refusal = match &*self.status.borrow() {
            EngineStatus::Ready { .. } => None,
            EngineStatus::Starting => Some(EngineError::NotReady),
            EngineStatus::Unavailable { reason } => Some(EngineError::Unavailable {
                reason: reason.clone(),
            }),
        };
        if let Some(error) = refusal {
            let _ = reply.send(MoveResult::failed(error, 0));
            return;
        }

        let started_at = Instant::now();
        let move_time = request.effective_move_time_ms();
        let skill = request.difficulty.skill_level();
        debug!(
            "[UCI] Searching {} at skill {} for {}ms",
            request.position_fen, skill, move_time
        );

        let sent = async {
            self.send(Command::set_option("Skill Level", skill)).await?;
            self.send(Command::PositionFen(request.position_fen.clone())).await?;
            self.send(Command::GoMoveTime(move_time)).await
        }
        .await;

        if let Err(e) = sent {
            error!("[UCI] Failed to start search: {}", e);
            let elapsed = started_at.elapsed().as_millis() as u64;
            let _ = reply.send(MoveResult::failed(e, elapsed));
            return;
        }

        self.pending = Some(PendingRequest {
            started_at,
            deadline: started_at + self.config.search_timeout(move_time),
            reply,
            last_evaluation: None,
            last_depth: None,
        });
    }

    /// Resolves the pending request with `error` and stops the engine's search
    async fn abandon_search(&mut self, error: EngineError) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        self.owed_bestmoves += 1;
        if let Err(e) = self.send(Command::Stop).await {
            warn!("[UCI] Failed to send stop: {}", e);
        }
        pending.finish(Err(error));
    }

    async fn on_search_timeout(&mut self) {
        let after_ms = self
            .pending
            .as_ref()
            .map(PendingRequest::elapsed_ms)
            .unwrap_or_default();
        warn!("[UCI] Search timed out after {}ms", after_ms);
        self.abandon_search(EngineError::SearchTimeout { after_ms }).await;
    }

    fn on_transport_closed(&mut self) {
        error!("[ENGINE] Engine output closed");
        let reason = "engine process exited".to_string();
        if let Some(pending) = self.pending.take() {
            pending.finish(Err(EngineError::Unavailable {
                reason: reason.clone(),
            }));
        }
        self.set_status(EngineStatus::Unavailable { reason });
    }

    async fn quit(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.finish(Err(EngineError::Cancelled));
        }
        if let Err(e) = self.send(Command::Quit).await {
            debug!("[ENGINE] Failed to send quit: {}", e);
        }
        self.transport.shutdown().await;
        self.set_status(EngineStatus::Unavailable {
            reason: "engine disposed".to_string(),
        });
        info!("[ENGINE] Engine disposed");
    }

    /// Answers commands after the engine is gone until every handle is dropped
    async fn refuse_remaining(&mut self) {
        let reason = match &*self.status.borrow() {
            EngineStatus::Unavailable { reason } => reason.clone(),
            _ => "engine unavailable".to_string(),
        };
        while let Some(command) = self.commands.recv().await {
            match command {
                SessionCommand::RequestMove { reply, .. } => {
                    let _ = reply.send(MoveResult::failed(
                        EngineError::Unavailable {
                            reason: reason.clone(),
                        },
                        0,
                    ));
                }
                SessionCommand::Stop { done } | SessionCommand::NewGame { done } => {
                    let _ = done.send(());
                }
                SessionCommand::Quit { done } => {
                    let _ = done.send(());
                    return;
                }
            }
        }
    }
}
