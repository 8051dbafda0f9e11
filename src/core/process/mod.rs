// ─── Process Supervisor ───
// Owns the game process: waits for it, runs the crash-test probe against a
// server, and stops it gracefully before resorting to a kill.

mod probe;

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::platform::request_graceful_termination;

pub use probe::CrashTestProbe;

/// How long a process gets to exit after the graceful request.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Starting,
    Running,
    Exited(i32),
    Killed,
}

/// The few operations the supervisor needs from a child process.
#[async_trait]
pub trait ManagedProcess: Send {
    fn id(&self) -> Option<u32>;
    /// Wait for exit. Returns `Exited` or `Killed`.
    async fn wait(&mut self) -> LauncherResult<ProcessState>;
    /// Ask the process to shut down on its own.
    async fn terminate(&mut self) -> LauncherResult<()>;
    async fn kill(&mut self) -> LauncherResult<()>;
}

#[async_trait]
impl ManagedProcess for tokio::process::Child {
    fn id(&self) -> Option<u32> {
        tokio::process::Child::id(self)
    }

    async fn wait(&mut self) -> LauncherResult<ProcessState> {
        let status = tokio::process::Child::wait(self)
            .await
            .map_err(|e| LauncherError::JavaExecution(e.to_string()))?;
        Ok(match status.code() {
            Some(code) => ProcessState::Exited(code),
            None => ProcessState::Killed,
        })
    }

    async fn terminate(&mut self) -> LauncherResult<()> {
        match tokio::process::Child::id(self) {
            Some(pid) => request_graceful_termination(pid).await,
            // Already reaped.
            None => Ok(()),
        }
    }

    async fn kill(&mut self) -> LauncherResult<()> {
        tokio::process::Child::kill(self)
            .await
            .map_err(|e| LauncherError::JavaExecution(e.to_string()))
    }
}

pub struct Supervisor {
    grace: Duration,
    state: Mutex<ProcessState>,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Supervisor {
    pub fn new() -> Self {
        Self {
            grace: DEFAULT_GRACE_PERIOD,
            state: Mutex::new(ProcessState::Starting),
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn state(&self) -> ProcessState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(ProcessState::Starting)
    }

    fn set_state(&self, next: ProcessState) {
        if let Ok(mut state) = self.state.lock() {
            debug!("Process state {:?} -> {:?}", *state, next);
            *state = next;
        }
    }

    pub fn spawn(
        &self,
        cmd: &mut tokio::process::Command,
    ) -> LauncherResult<tokio::process::Child> {
        self.set_state(ProcessState::Starting);
        let child = cmd
            .spawn()
            .map_err(|e| LauncherError::JavaExecution(e.to_string()))?;
        info!("Game process started (pid {:?})", child.id());
        self.set_state(ProcessState::Running);
        Ok(child)
    }

    /// Wait for the process. Anything but a clean exit is an error.
    pub async fn run(&self, process: &mut dyn ManagedProcess) -> LauncherResult<()> {
        self.set_state(ProcessState::Running);
        let outcome = process.wait().await?;
        self.set_state(outcome);
        match outcome {
            ProcessState::Exited(0) => Ok(()),
            ProcessState::Exited(code) => Err(LauncherError::ProcessExit(code)),
            _ => Err(LauncherError::ProcessKilled),
        }
    }

    /// Race the process against `probe`. When the probe finishes, either
    /// way, the process is stopped; probe exhaustion and an early exit are
    /// crash-test failures.
    pub async fn run_crash_test(
        &self,
        process: &mut dyn ManagedProcess,
        probe: &CrashTestProbe,
    ) -> LauncherResult<()> {
        self.set_state(ProcessState::Running);

        let probed = tokio::select! {
            outcome = process.wait() => {
                let outcome = outcome?;
                self.set_state(outcome);
                return Err(LauncherError::CrashTestFailed(format!(
                    "server stopped before accepting connections ({:?})",
                    outcome
                )));
            }
            probed = probe.run() => probed,
        };

        match &probed {
            Ok(()) => info!("Crash test passed, stopping server"),
            Err(reason) => warn!("Crash test failed: {}", reason),
        }
        self.stop(process).await?;
        probed.map_err(LauncherError::CrashTestFailed)
    }

    /// Graceful termination, then exactly one kill if the grace period runs
    /// out.
    pub async fn stop(&self, process: &mut dyn ManagedProcess) -> LauncherResult<ProcessState> {
        if let Err(e) = process.terminate().await {
            warn!("Graceful termination request failed: {}", e);
        }

        match tokio::time::timeout(self.grace, process.wait()).await {
            Ok(outcome) => {
                let outcome = outcome?;
                self.set_state(outcome);
                Ok(outcome)
            }
            Err(_) => {
                warn!(
                    "Process {:?} still running after {:?}, killing it",
                    process.id(),
                    self.grace
                );
                process.kill().await?;
                self.set_state(ProcessState::Killed);
                Ok(ProcessState::Killed)
            }
        }
    }
}
