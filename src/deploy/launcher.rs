// ABOUTME: Process launcher seam and a tokio-backed local implementation.
// ABOUTME: Launch returns an opaque handle supporting bounded termination.

use async_trait::async_trait;
use snafu::ResultExt;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::debug;

use super::error::{LaunchError, SignalSnafu, SpawnSnafu, TerminationTimeoutSnafu};

/// What to run for one deployment. The launcher exports the assigned
/// port to the process as `PORT`.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub cwd: Option<PathBuf>,
    /// Filled in by the deployment registry from the port reservation.
    pub port: u16,
}

impl LaunchSpec {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            args: Vec::new(),
            env: HashMap::new(),
            cwd: None,
            port: 0,
        }
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.args.push(arg.to_string());
        self
    }
}

/// An opaque handle to a launched process.
#[async_trait]
pub trait ProcessHandle: Send + Sync {
    /// OS pid, if the process is still attached.
    fn pid(&self) -> Option<u32>;

    /// Request termination and wait up to `grace` for the process to
    /// exit. A timeout here means the process may still be running.
    async fn terminate(&mut self, grace: Duration) -> Result<(), LaunchError>;
}

/// Starts processes for the deployment registry.
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    async fn launch(&self, spec: &LaunchSpec) -> Result<Box<dyn ProcessHandle>, LaunchError>;
}

/// Launcher backed by `tokio::process` on the local host.
///
/// Not intended for production serving; it exists for locally-run
/// delivery targets where the deploy goal starts the app directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalLauncher;

#[async_trait]
impl ProcessLauncher for LocalLauncher {
    async fn launch(&self, spec: &LaunchSpec) -> Result<Box<dyn ProcessHandle>, LaunchError> {
        let mut command = Command::new(&spec.command);
        command
            .args(&spec.args)
            .envs(&spec.env)
            .env("PORT", spec.port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }
        let child = command.spawn().context(SpawnSnafu)?;
        debug!(command = %spec.command, port = spec.port, pid = child.id(), "launched local process");
        Ok(Box::new(LocalProcess { child }))
    }
}

struct LocalProcess {
    child: Child,
}

#[async_trait]
impl ProcessHandle for LocalProcess {
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    async fn terminate(&mut self, grace: Duration) -> Result<(), LaunchError> {
        self.child.start_kill().context(SignalSnafu)?;
        tokio::time::timeout(grace, self.child.wait())
            .await
            .map_err(|_| {
                TerminationTimeoutSnafu {
                    timeout_secs: grace.as_secs(),
                }
                .build()
            })?
            .context(SignalSnafu)?;
        Ok(())
    }
}
