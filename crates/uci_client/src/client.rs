//! Handle to a running engine session
//!
//! [`EngineClient`] is an explicit, cloneable value: create one per engine
//! process, share it between callers, and dispose of it when finished.
//!
//! ```rust,ignore
//! let client = EngineClient::launch(&EngineConfig::new("stockfish"))?;
//! client.wait_ready(Duration::from_secs(10)).await?;
//!
//! let result = client
//!     .request_move(MoveRequest::new(START_FEN, Difficulty::default()))
//!     .await;
//! if let Some(mv) = result.best_move() {
//!     println!("engine plays {mv}");
//! }
//! client.dispose().await;
//! ```

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::session::{EngineSession, EngineStatus, SessionCommand};
use crate::transport::{EngineTransport, ProcessTransport};
use crate::types::{MoveRequest, MoveResult};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::warn;

const COMMAND_QUEUE: usize = 16;

/// Cloneable handle to one engine session
#[derive(Clone)]
pub struct EngineClient {
    commands: mpsc::Sender<SessionCommand>,
    status: watch::Receiver<EngineStatus>,
    ready_wait: Duration,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl EngineClient {
    /// Starts a session over an already connected transport
    ///
    /// Must be called from inside a tokio runtime.
    pub fn spawn<T: EngineTransport>(transport: T, config: EngineConfig) -> Self {
        let (commands, command_rx) = mpsc::channel(COMMAND_QUEUE);
        let (status_tx, status) = watch::channel(EngineStatus::Starting);
        let ready_wait = config.ready_wait();

        let session = EngineSession::new(transport, config, command_rx, status_tx);
        let task = tokio::spawn(session.run());

        Self {
            commands,
            status,
            ready_wait,
            task: Arc::new(Mutex::new(Some(task))),
        }
    }

    /// Spawns the configured engine binary and starts a session on it
    pub fn launch(config: &EngineConfig) -> EngineResult<Self> {
        let transport = ProcessTransport::spawn(config)?;
        Ok(Self::spawn(transport, config.clone()))
    }

    pub fn status(&self) -> EngineStatus {
        self.status.borrow().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.status.borrow().is_ready()
    }

    /// Waits until the handshake finishes (possibly degraded) or the engine fails
    pub async fn wait_ready(&self, timeout: Duration) -> EngineResult<()> {
        let mut status = self.status.clone();
        let settled = tokio::time::timeout(timeout, async move {
            status
                .wait_for(|s| !matches!(s, EngineStatus::Starting))
                .await
                .map(|s| (*s).clone())
        })
        .await;

        match settled {
            Ok(Ok(EngineStatus::Ready { .. })) => Ok(()),
            Ok(Ok(EngineStatus::Unavailable { reason })) => Err(EngineError::Unavailable { reason }),
            Ok(Ok(EngineStatus::Starting)) | Err(_) => Err(EngineError::NotReady),
            Ok(Err(_)) => Err(session_gone()),
        }
    }

    /// Runs one search and returns its result
    ///
    /// Never fails outright: every problem is reported through
    /// [`MoveResult::error`]. A second request while one is in flight comes
    /// back immediately with [`EngineError::Busy`].
    pub async fn request_move(&self, request: MoveRequest) -> MoveResult {
        let started = Instant::now();
        let elapsed = || started.elapsed().as_millis() as u64;

        if let Err(error) = self.wait_ready(self.ready_wait).await {
            return MoveResult::failed(error, elapsed());
        }

        let (reply, result) = oneshot::channel();
        if self
            .commands
            .send(SessionCommand::RequestMove { request, reply })
            .await
            .is_err()
        {
            return MoveResult::failed(session_gone(), elapsed());
        }

        match result.await {
            Ok(result) => result,
            Err(_) => MoveResult::failed(session_gone(), elapsed()),
        }
    }

    /// Cancels the in-flight search, if any, with [`EngineError::Cancelled`]
    pub async fn stop(&self) {
        self.round_trip(|done| SessionCommand::Stop { done }).await;
    }

    /// Cancels the in-flight search and tells the engine a new game starts
    pub async fn new_game(&self) {
        self.round_trip(|done| SessionCommand::NewGame { done }).await;
    }

    /// Sends `quit`, releases the process and waits for the session to end
    pub async fn dispose(&self) {
        self.round_trip(|done| SessionCommand::Quit { done }).await;
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("[ENGINE] Session task ended abnormally: {}", e);
            }
        }
    }

    async fn round_trip(&self, command: impl FnOnce(oneshot::Sender<()>) -> SessionCommand) {
        let (done, ack) = oneshot::channel();
        if self.commands.send(command(done)).await.is_ok() {
            let _ = ack.await;
        }
    }
}

fn session_gone() -> EngineError {
    EngineError::Unavailable {
        reason: "engine session ended".to_string(),
    }
}
