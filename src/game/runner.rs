//! Session runner
//!
//! One task owns the [`GameSession`] and is the only place it is mutated. It
//! reacts to three kinds of events:
//!
//! 1. Player intents arriving through a [`GameHandle`]
//! 2. A one-second clock tick
//! 3. Completion of the in-flight opponent search
//!
//! After every event it schedules an opponent search if the session hands out
//! a ticket that is not already being worked on, and publishes a fresh
//! [`SessionSnapshot`].
//!
//! A failed opponent search parks its ticket: the runner will not retry the
//! same ply until [`Intent::RetryOpponent`] arrives, so a broken engine cannot
//! cause a request storm. A `Busy` answer is not a failure. The engine is
//! answering someone else, so the same ticket is searched again after
//! [`BUSY_RETRY`].

use crate::game::ai::MoveCoordinator;
use crate::game::error::{GameError, GameResult};
use crate::game::rules::RulesEngine;
use crate::game::session::{GameSession, OpponentTicket, SessionSnapshot};
use crate::game::types::Color;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uci_client::{Difficulty, MoveResult, Square};

const CLOCK_TICK: Duration = Duration::from_secs(1);
const INTENT_QUEUE: usize = 32;
/// Wait before asking again after the engine answered `Busy`
pub const BUSY_RETRY: Duration = Duration::from_millis(250);

/// Something the player asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    MakeMove(String),
    /// Pick up a piece, or drop the selected one on a target
    SelectSquare(Square),
    NewGame { human_color: Option<Color> },
    FlipColor,
    Resign,
    OfferDraw,
    SetDifficulty(Difficulty),
    /// Search again after the opponent failed to move
    RetryOpponent,
    Shutdown,
}

struct Envelope {
    intent: Intent,
    reply: oneshot::Sender<GameResult<()>>,
}

struct InFlight {
    ticket: OpponentTicket,
    task: JoinHandle<MoveResult>,
}

/// Presentation-side handle: send intents, read snapshots
#[derive(Clone)]
pub struct GameHandle {
    intents: mpsc::Sender<Envelope>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl GameHandle {
    pub async fn send(&self, intent: Intent) -> GameResult<()> {
        let (reply, outcome) = oneshot::channel();
        self.intents
            .send(Envelope { intent, reply })
            .await
            .map_err(|_| GameError::SessionClosed)?;
        outcome.await.map_err(|_| GameError::SessionClosed)?
    }

    pub async fn make_move(&self, token: impl Into<String>) -> GameResult<()> {
        self.send(Intent::MakeMove(token.into())).await
    }

    pub async fn select_square(&self, square: Square) -> GameResult<()> {
        self.send(Intent::SelectSquare(square)).await
    }

    pub async fn new_game(&self, human_color: Option<Color>) -> GameResult<()> {
        self.send(Intent::NewGame { human_color }).await
    }

    pub async fn flip_color(&self) -> GameResult<()> {
        self.send(Intent::FlipColor).await
    }

    pub async fn resign(&self) -> GameResult<()> {
        self.send(Intent::Resign).await
    }

    pub async fn offer_draw(&self) -> GameResult<()> {
        self.send(Intent::OfferDraw).await
    }

    pub async fn shutdown(&self) -> GameResult<()> {
        self.send(Intent::Shutdown).await
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Waits for the first snapshot matching `predicate`
    pub async fn wait_until(
        &self,
        mut predicate: impl FnMut(&SessionSnapshot) -> bool,
    ) -> GameResult<SessionSnapshot> {
        let mut snapshots = self.snapshots.clone();
        let snapshot = snapshots
            .wait_for(|s| predicate(s))
            .await
            .map_err(|_| GameError::SessionClosed)?;
        Ok((*snapshot).clone())
    }
}

/// Event loop owning one session
pub struct GameRunner<R: RulesEngine> {
    session: GameSession<R>,
    coordinator: MoveCoordinator,
    intents: mpsc::Receiver<Envelope>,
    snapshots: watch::Sender<SessionSnapshot>,
    in_flight: Option<InFlight>,
    parked: Option<OpponentTicket>,
    retry_at: Option<Instant>,
}

impl<R: RulesEngine> GameRunner<R> {
    pub fn new(session: GameSession<R>, coordinator: MoveCoordinator) -> (Self, GameHandle) {
        let (intent_tx, intents) = mpsc::channel(INTENT_QUEUE);
        let (snapshots, snapshot_rx) = watch::channel(session.snapshot());
        let runner = Self {
            session,
            coordinator,
            intents,
            snapshots,
            in_flight: None,
            parked: None,
            retry_at: None,
        };
        let handle = GameHandle {
            intents: intent_tx,
            snapshots: snapshot_rx,
        };
        (runner, handle)
    }

    /// Starts the runner on the current tokio runtime
    pub fn spawn(
        session: GameSession<R>,
        coordinator: MoveCoordinator,
    ) -> (GameHandle, JoinHandle<()>) {
        let (runner, handle) = Self::new(session, coordinator);
        (handle, tokio::spawn(runner.run()))
    }

    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(CLOCK_TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        let mut last_tick = Instant::now();

        self.schedule_opponent();
        self.publish();

        loop {
            let mut answer = None;
            tokio::select! {
                envelope = self.intents.recv() => {
                    let Some(Envelope { intent, reply }) = envelope else {
                        break;
                    };
                    if intent == Intent::Shutdown {
                        let _ = reply.send(Ok(()));
                        break;
                    }
                    let outcome = self.handle_intent(intent).await;
                    answer = Some((reply, outcome));
                }
                _ = ticker.tick() => {
                    let now = Instant::now();
                    let elapsed = now.duration_since(last_tick).as_millis() as u64;
                    last_tick = now;
                    self.session.tick(elapsed);
                }
                joined = wait_in_flight(&mut self.in_flight), if self.in_flight.is_some() => {
                    if let Some(InFlight { ticket, .. }) = self.in_flight.take() {
                        self.on_opponent_result(ticket, joined);
                    }
                }
                _ = wait_retry(self.retry_at), if self.retry_at.is_some() => {
                    self.retry_at = None;
                }
            }

            if !self.session.is_playing() {
                self.cancel_in_flight().await;
            }
            self.schedule_opponent();
            self.publish();

            // replies go out after publishing so callers see their own change
            if let Some((reply, outcome)) = answer {
                let _ = reply.send(outcome);
            }
        }

        self.cancel_in_flight().await;
        info!("[GAME] Runner stopped");
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.session.snapshot());
    }

    async fn handle_intent(&mut self, intent: Intent) -> GameResult<()> {
        debug!("[GAME] Intent {:?}", intent);
        match intent {
            Intent::MakeMove(token) => self.session.submit_move(&token).map(|_| ()),
            Intent::SelectSquare(square) => self.session.select_square(square).map(|_| ()),
            Intent::NewGame { human_color } => {
                self.restart().await;
                self.session.new_game(human_color);
                Ok(())
            }
            Intent::FlipColor => {
                self.restart().await;
                self.session.flip_color();
                Ok(())
            }
            Intent::Resign => self.session.resign(),
            Intent::OfferDraw => self.session.offer_draw(),
            Intent::SetDifficulty(difficulty) => {
                self.session.set_difficulty(difficulty);
                Ok(())
            }
            Intent::RetryOpponent => {
                self.parked = None;
                Ok(())
            }
            Intent::Shutdown => Ok(()),
        }
    }

    /// Drops the running search and resets the coordinator before a new game
    async fn restart(&mut self) {
        if let Some(flight) = self.in_flight.take() {
            flight.task.abort();
        }
        self.parked = None;
        self.retry_at = None;
        self.coordinator.reset().await;
    }

    async fn cancel_in_flight(&mut self) {
        if let Some(flight) = self.in_flight.take() {
            debug!("[AI] Cancelling search for ply {}", flight.ticket.ply);
            flight.task.abort();
            self.coordinator.stop().await;
        }
    }

    fn schedule_opponent(&mut self) {
        let Some(ticket) = self.session.opponent_ticket() else {
            return;
        };
        if self.in_flight.as_ref().is_some_and(|f| f.ticket == ticket)
            || self.parked.as_ref() == Some(&ticket)
            || self.retry_at.is_some()
        {
            return;
        }
        if let Some(stale) = self.in_flight.take() {
            stale.task.abort();
        }

        let coordinator = self.coordinator.clone();
        let request = ticket.clone();
        let task = tokio::spawn(async move {
            coordinator
                .request_move(request.ply, &request.position_fen, request.difficulty)
                .await
        });
        self.in_flight = Some(InFlight { ticket, task });
    }

    fn on_opponent_result(&mut self, ticket: OpponentTicket, joined: Result<MoveResult, JoinError>) {
        let result = match joined {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => return,
            Err(e) => {
                error!("[AI] Search task failed: {}", e);
                self.parked = Some(ticket);
                return;
            }
        };

        match self.session.apply_opponent_result(&ticket, result) {
            Ok(Some(_)) => {}
            Ok(None) => {
                debug!("[AI] Engine busy, asking again for ply {}", ticket.ply);
                self.retry_at = Some(Instant::now() + BUSY_RETRY);
            }
            Err(GameError::StaleResult { .. }) => {}
            Err(e) => {
                warn!("[AI] Opponent move for ply {} failed: {}", ticket.ply, e);
                self.parked = Some(ticket);
            }
        }
    }
}

async fn wait_retry(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

async fn wait_in_flight(in_flight: &mut Option<InFlight>) -> Result<MoveResult, JoinError> {
    match in_flight {
        Some(flight) => (&mut flight.task).await,
        None => std::future::pending().await,
    }
}
