//! Single-flight move coordinator
//!
//! Sits between the game session and the [`EngineClient`]. It guarantees at
//! most one search per `(generation, ply)`: a second request for a ply that is
//! already being searched returns [`EngineError::Busy`] at once and never
//! reaches the engine. The latch is held by an RAII guard, so it is released
//! however the request ends, including when the future is dropped.
//!
//! Successful answers are then held back until the [`Pacing`] target has
//! passed. Failures are returned immediately.
//!
//! [`MoveCoordinator::reset`] starts a new generation: latches are cleared,
//! the running search is cancelled, and anything that still completes under
//! the old generation is reported as [`EngineError::Cancelled`].

use crate::game::ai::pacing::{remaining, Pacing};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info};
use uci_client::{Difficulty, EngineClient, EngineError, MoveRequest, MoveResult};

type LatchKey = (u64, u32);

/// Held while a ply is being searched
struct PlyLatch {
    latches: Arc<Mutex<HashSet<LatchKey>>>,
    key: LatchKey,
}

impl PlyLatch {
    fn acquire(latches: &Arc<Mutex<HashSet<LatchKey>>>, key: LatchKey) -> Option<Self> {
        latches.lock().insert(key).then(|| Self {
            latches: Arc::clone(latches),
            key,
        })
    }
}

impl Drop for PlyLatch {
    fn drop(&mut self) {
        self.latches.lock().remove(&self.key);
    }
}

/// Cloneable front for opponent move requests
#[derive(Clone)]
pub struct MoveCoordinator {
    client: EngineClient,
    pacing: Pacing,
    latches: Arc<Mutex<HashSet<LatchKey>>>,
    generation: Arc<AtomicU64>,
}

impl MoveCoordinator {
    pub fn new(client: EngineClient) -> Self {
        Self::with_pacing(client, Pacing::default())
    }

    pub fn with_pacing(client: EngineClient, pacing: Pacing) -> Self {
        Self {
            client,
            pacing,
            latches: Arc::new(Mutex::new(HashSet::new())),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn client(&self) -> &EngineClient {
        &self.client
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Whether `ply` of the current generation is being searched
    pub fn is_searching(&self, ply: u32) -> bool {
        self.latches.lock().contains(&(self.generation(), ply))
    }

    /// Requests the opponent's move for `ply`
    pub async fn request_move(
        &self,
        ply: u32,
        position_fen: &str,
        difficulty: Difficulty,
    ) -> MoveResult {
        let generation = self.generation();
        let Some(_latch) = PlyLatch::acquire(&self.latches, (generation, ply)) else {
            debug!("[AI] Ply {} already being searched, refusing duplicate", ply);
            return MoveResult::failed(EngineError::Busy, 0);
        };

        let started = Instant::now();
        info!("[AI] Thinking about ply {} ({})", ply, difficulty);

        let result = self
            .client
            .request_move(MoveRequest::new(position_fen, difficulty))
            .await;

        if result.is_success() {
            let target = self.pacing.target(difficulty, position_fen, ply);
            let wait = remaining(target, started.elapsed());
            if !wait.is_zero() {
                debug!("[AI] Pacing reply by {}ms", wait.as_millis());
                tokio::time::sleep(wait).await;
            }
        }

        if self.generation() != generation {
            debug!("[AI] Discarding result for ply {} from a previous game", ply);
            return MoveResult::failed(EngineError::Cancelled, result.thinking_time_ms);
        }
        result
    }

    /// Cancels the running search without starting a new game
    pub async fn stop(&self) {
        self.client.stop().await;
    }

    /// Starts a new generation: clears latches and cancels the running search
    pub async fn reset(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.latches.lock().clear();
        self.client.new_game().await;
        info!("[AI] Coordinator reset (generation {})", generation);
    }
}
