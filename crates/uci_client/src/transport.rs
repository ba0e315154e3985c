//! Line transport to the engine process
//!
//! [`EngineTransport`] is the seam between the protocol session and whatever
//! carries the bytes. [`ProcessTransport`] spawns a native engine binary with
//! piped stdio; tests use [`crate::testing::ScriptedTransport`] instead.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, warn};

/// Bidirectional line channel to a UCI engine
#[async_trait]
pub trait EngineTransport: Send + 'static {
    /// Writes one command line; the newline is appended by the transport
    async fn send(&mut self, line: &str) -> EngineResult<()>;

    /// Next output line, or `None` once the engine has gone away
    ///
    /// Must be cancel-safe: the session polls it inside `select!`.
    async fn recv(&mut self) -> Option<String>;

    /// Releases the underlying process or channel
    async fn shutdown(&mut self);
}

/// Which engine build a launch resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineBinary {
    Accelerated(PathBuf),
    Portable(PathBuf),
}

impl EngineBinary {
    /// Picks the accelerated build when configured, present and supported by the CPU
    pub fn select(config: &EngineConfig) -> Self {
        Self::select_with(config, cpu_supports_accelerated())
    }

    fn select_with(config: &EngineConfig, cpu_supported: bool) -> Self {
        match &config.accelerated_path {
            Some(path) if cpu_supported && path.exists() => Self::Accelerated(path.clone()),
            Some(path) => {
                debug!(
                    "[ENGINE] Skipping accelerated build {:?} (cpu support: {})",
                    path, cpu_supported
                );
                Self::Portable(config.path.clone())
            }
            None => Self::Portable(config.path.clone()),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Accelerated(path) | Self::Portable(path) => path,
        }
    }
}

#[cfg(target_arch = "x86_64")]
fn cpu_supports_accelerated() -> bool {
    std::arch::is_x86_feature_detected!("avx2")
}

#[cfg(not(target_arch = "x86_64"))]
fn cpu_supports_accelerated() -> bool {
    false
}

/// Engine running as a child process
pub struct ProcessTransport {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl ProcessTransport {
    /// Spawns the engine chosen by [`EngineBinary::select`]
    pub fn spawn(config: &EngineConfig) -> EngineResult<Self> {
        let binary = EngineBinary::select(config);
        info!("[ENGINE] Starting {:?}", binary);

        let mut child = Command::new(binary.path())
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::Unavailable {
                reason: format!("failed to start {}: {}", binary.path().display(), e),
            })?;

        let stdin = child.stdin.take().ok_or_else(|| EngineError::Unavailable {
            reason: "engine stdin not captured".to_string(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| EngineError::Unavailable {
            reason: "engine stdout not captured".to_string(),
        })?;

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
        })
    }
}

#[async_trait]
impl EngineTransport for ProcessTransport {
    async fn send(&mut self, line: &str) -> EngineResult<()> {
        debug!("[UCI] > {}", line);
        self.stdin
            .write_all(format!("{line}\n").as_bytes())
            .await
            .map_err(EngineError::transport)?;
        self.stdin.flush().await.map_err(EngineError::transport)
    }

    async fn recv(&mut self) -> Option<String> {
        match self.stdout.next_line().await {
            Ok(Some(line)) => {
                debug!("[UCI] < {}", line);
                Some(line)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("[ENGINE] Failed to read engine output: {}", e);
                None
            }
        }
    }

    async fn shutdown(&mut self) {
        match tokio::time::timeout(std::time::Duration::from_secs(1), self.child.wait()).await {
            Ok(Ok(status)) => info!("[ENGINE] Engine exited with {}", status),
            Ok(Err(e)) => warn!("[ENGINE] Failed waiting for engine: {}", e),
            Err(_) => {
                warn!("[ENGINE] Engine ignored quit, killing it");
                if let Err(e) = self.child.kill().await {
                    warn!("[ENGINE] Failed to kill engine: {}", e);
                }
            }
        }
    }
}
