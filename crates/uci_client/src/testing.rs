//! In-memory engine for tests
//!
//! [`ScriptedTransport`] behaves like a well-mannered UCI engine: it answers
//! the handshake, replies to `go` with a few `info` lines and a `bestmove`
//! after a configurable think time, and answers `stop` with an immediate
//! `bestmove`. The paired [`ScriptedEngine`] handle scripts the answers,
//! injects raw lines, closes the stream and inspects what was sent.
//!
//! Best used under `#[tokio::test(start_paused = true)]` so think times cost
//! nothing.

use crate::error::{EngineError, EngineResult};
use crate::transport::EngineTransport;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Move played when nothing is queued
pub const DEFAULT_BEST_MOVE: &str = "e2e4";

struct Search {
    id: u64,
    token: String,
    task: Option<JoinHandle<()>>,
}

struct Script {
    sent: Vec<String>,
    queued_moves: VecDeque<String>,
    think_time: Duration,
    info_lines: Vec<String>,
    answer_handshake: bool,
    answer_searches: bool,
    search: Option<Search>,
    next_search_id: u64,
    closed: bool,
}

/// Engine side of the scripted transport
#[derive(Clone)]
pub struct ScriptedEngine {
    script: Arc<Mutex<Script>>,
    output: mpsc::UnboundedSender<Option<String>>,
}

/// Transport half handed to [`crate::EngineClient::spawn`]
pub struct ScriptedTransport {
    engine: ScriptedEngine,
    output: mpsc::UnboundedReceiver<Option<String>>,
    eof: bool,
}

impl ScriptedTransport {
    pub fn new() -> (Self, ScriptedEngine) {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = ScriptedEngine {
            script: Arc::new(Mutex::new(Script {
                sent: Vec::new(),
                queued_moves: VecDeque::new(),
                think_time: Duration::from_millis(100),
                info_lines: vec![
                    "info depth 1 score cp 20 nodes 20 pv e2e4".to_string(),
                    "info depth 8 seldepth 10 score cp 35 nodes 4000 pv e2e4 e7e5".to_string(),
                ],
                answer_handshake: true,
                answer_searches: true,
                search: None,
                next_search_id: 0,
                closed: false,
            })),
            output: tx,
        };
        let transport = Self {
            engine: engine.clone(),
            output: rx,
            eof: false,
        };
        (transport, engine)
    }
}

impl ScriptedEngine {
    /// Every line the client has written, in order
    pub fn sent(&self) -> Vec<String> {
        self.script.lock().sent.clone()
    }

    /// Number of sent lines starting with `prefix`
    pub fn count_sent(&self, prefix: &str) -> usize {
        self.script
            .lock()
            .sent
            .iter()
            .filter(|line| line.starts_with(prefix))
            .count()
    }

    /// Token answered to the next `go`; further `go`s use later queued tokens
    pub fn queue_bestmove(&self, token: impl Into<String>) {
        self.script.lock().queued_moves.push_back(token.into());
    }

    pub fn set_think_time(&self, think_time: Duration) {
        self.script.lock().think_time = think_time;
    }

    pub fn set_info_lines(&self, lines: Vec<String>) {
        self.script.lock().info_lines = lines;
    }

    /// Stay silent on `uci` and `isready`
    pub fn ignore_handshake(&self) {
        self.script.lock().answer_handshake = false;
    }

    /// Never finish a search on its own; only `stop` produces the bestmove
    pub fn hang_searches(&self) {
        self.script.lock().answer_searches = false;
    }

    /// Undoes [`Self::hang_searches`] for searches started afterwards
    pub fn resume_searches(&self) {
        self.script.lock().answer_searches = true;
    }

    /// Pushes a raw line as if the engine printed it
    pub fn emit(&self, line: impl Into<String>) {
        let _ = self.output.send(Some(line.into()));
    }

    /// Simulates the engine process exiting
    pub fn close(&self) {
        let mut script = self.script.lock();
        script.closed = true;
        if let Some(search) = script.search.take() {
            if let Some(task) = search.task {
                task.abort();
            }
        }
        let _ = self.output.send(None);
    }

    pub fn is_searching(&self) -> bool {
        self.script.lock().search.is_some()
    }

    fn respond(&self, line: &str) {
        let mut script = self.script.lock();
        script.sent.push(line.to_string());
        let command = line.split_whitespace().next().unwrap_or_default();

        match command {
            "uci" if script.answer_handshake => {
                self.emit("id name Scripted Engine");
                self.emit("option name Skill Level type spin default 20 min 0 max 20");
                self.emit("uciok");
            }
            "isready" if script.answer_handshake => self.emit("readyok"),
            "go" => {
                let token = script
                    .queued_moves
                    .pop_front()
                    .unwrap_or_else(|| DEFAULT_BEST_MOVE.to_string());
                let id = script.next_search_id;
                script.next_search_id += 1;

                let task = script.answer_searches.then(|| {
                    let engine = self.clone();
                    let think_time = script.think_time;
                    tokio::spawn(async move {
                        tokio::time::sleep(think_time).await;
                        engine.finish_search(id);
                    })
                });
                script.search = Some(Search { id, token, task });
            }
            "stop" => {
                if let Some(search) = script.search.take() {
                    if let Some(task) = search.task {
                        task.abort();
                    }
                    self.emit(format!("bestmove {}", search.token));
                }
            }
            "quit" => {
                script.closed = true;
                let _ = self.output.send(None);
            }
            _ => {}
        }
    }

    fn finish_search(&self, id: u64) {
        let mut script = self.script.lock();
        if script.search.as_ref().map(|s| s.id) != Some(id) {
            return;
        }
        if let Some(search) = script.search.take() {
            for line in &script.info_lines {
                self.emit(line.clone());
            }
            self.emit(format!("bestmove {}", search.token));
        }
    }
}

#[async_trait]
impl EngineTransport for ScriptedTransport {
    async fn send(&mut self, line: &str) -> EngineResult<()> {
        if self.engine.script.lock().closed {
            return Err(EngineError::transport("scripted engine closed"));
        }
        self.engine.respond(line);
        Ok(())
    }

    async fn recv(&mut self) -> Option<String> {
        if self.eof {
            return None;
        }
        match self.output.recv().await {
            Some(Some(line)) => Some(line),
            _ => {
                self.eof = true;
                None
            }
        }
    }

    async fn shutdown(&mut self) {
        self.engine.script.lock().closed = true;
    }
}
