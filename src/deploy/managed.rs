// ABOUTME: Registry of locally deployed apps with reserved, reusable ports.
// ABOUTME: Port lookup is keyed by owner+repo; teardown is keyed by exact commit.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::config::DeployConfig;
use crate::types::{CommitRef, RepoRef};

use super::error::DeployError;
use super::launcher::{LaunchSpec, ProcessHandle, ProcessLauncher};

/// Port reserved but no process attached.
enum ProcessState {
    Idle,
    Active(Box<dyn ProcessHandle>),
}

impl ProcessState {
    fn is_active(&self) -> bool {
        matches!(self, ProcessState::Active(_))
    }

    fn detach(&mut self) -> Option<Box<dyn ProcessHandle>> {
        match std::mem::replace(self, ProcessState::Idle) {
            ProcessState::Active(handle) => Some(handle),
            ProcessState::Idle => None,
        }
    }
}

/// One app's deployment slot. The record is never deleted; stopping the
/// process keeps the port reserved for the next deploy of the same app.
struct DeployedApp {
    repo: RepoRef,
    /// Commit of the current or most recent deployment. `None` while the
    /// port is reserved but nothing was ever recorded.
    sha: Option<String>,
    port: u16,
    process: ProcessState,
}

/// Registry of per-app port assignments and live process handles.
///
/// Ports are matched by owner+repo, so redeploying a new commit of the
/// same app reuses its port. [`undeploy`](Self::undeploy) matches the
/// exact commit instead; a running older commit of an app is therefore
/// not found by a sha that does not match it. That asymmetry is kept
/// deliberately.
pub struct ManagedDeployments {
    base_port: u16,
    max_port: u16,
    stop_grace: Duration,
    deployments: Mutex<Vec<DeployedApp>>,
    app_locks: Mutex<HashMap<RepoRef, Arc<tokio::sync::Mutex<()>>>>,
}

impl ManagedDeployments {
    pub fn new(config: &DeployConfig) -> Self {
        Self {
            base_port: config.base_port,
            max_port: config.max_port,
            stop_grace: config.stop_grace,
            deployments: Mutex::new(Vec::new()),
            app_locks: Mutex::new(HashMap::new()),
        }
    }

    /// The serialization lock for one app's deployment slot. Held across
    /// the whole displace/terminate/attach sequence so two concurrent
    /// deploys of the same app can never leave two live processes.
    fn app_lock(&self, repo: &RepoRef) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.app_locks.lock();
        locks.entry(repo.clone()).or_default().clone()
    }

    /// The port for this app: the existing reservation if one exists,
    /// otherwise the lowest free port at or above the configured base.
    ///
    /// Allocation reserves the port immediately, so two concurrent
    /// deployments of different apps never receive the same port.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::PortExhausted` when every port in the
    /// configured range is reserved.
    pub fn find_port(&self, repo: &RepoRef) -> Result<u16, DeployError> {
        let mut deployments = self.deployments.lock();
        if let Some(existing) = deployments.iter().find(|d| &d.repo == repo) {
            return Ok(existing.port);
        }
        let port = (self.base_port..=self.max_port)
            .find(|candidate| deployments.iter().all(|d| d.port != *candidate))
            .ok_or(DeployError::PortExhausted {
                base: self.base_port,
                max: self.max_port,
            })?;
        deployments.push(DeployedApp {
            repo: repo.clone(),
            sha: None,
            port,
            process: ProcessState::Idle,
        });
        Ok(port)
    }

    /// Launch a process for this commit on the app's port, replacing any
    /// process already running for the same owner+repo. The displaced
    /// process is stopped before the new one is launched; both run on
    /// the same port, so they must never overlap.
    ///
    /// # Errors
    ///
    /// Port exhaustion, launch failure, or a failed termination of the
    /// displaced process (fatal for this deployment; the old record and
    /// port reservation are kept, and nothing new is launched).
    pub async fn deploy(
        &self,
        commit: CommitRef,
        launcher: &dyn ProcessLauncher,
        mut spec: LaunchSpec,
    ) -> Result<u16, DeployError> {
        let lock = self.app_lock(commit.repo());
        let _guard = lock.lock().await;

        let port = self.find_port(commit.repo())?;
        self.stop_active(commit.repo(), &commit).await?;
        spec.port = port;
        let handle = launcher
            .launch(&spec)
            .await
            .map_err(|source| DeployError::Launch {
                commit: commit.to_string(),
                source,
            })?;
        self.attach(&commit, handle).await?;
        Ok(port)
    }

    /// Record a deployment for this commit, stopping any process already
    /// active for the same owner+repo first. The port reservation made
    /// by [`find_port`](Self::find_port) is unchanged across redeploys.
    /// Serialized per app with [`deploy`](Self::deploy) and
    /// [`undeploy`](Self::undeploy).
    ///
    /// # Errors
    ///
    /// Returns `DeployError::TerminationFailed` if the displaced process
    /// would not stop; the new deployment is not recorded in that case.
    pub async fn record_deployment(
        &self,
        commit: CommitRef,
        handle: Box<dyn ProcessHandle>,
    ) -> Result<(), DeployError> {
        let lock = self.app_lock(commit.repo());
        let _guard = lock.lock().await;

        // May be the first contact with this app; reserve its port.
        self.find_port(commit.repo())?;
        self.stop_active(commit.repo(), &commit).await?;
        self.attach(&commit, handle).await
    }

    /// Stop the app's active process, if any. Caller holds the app lock.
    async fn stop_active(&self, repo: &RepoRef, commit: &CommitRef) -> Result<(), DeployError> {
        let displaced = {
            let mut deployments = self.deployments.lock();
            deployments
                .iter_mut()
                .find(|d| &d.repo == repo)
                .and_then(|d| d.process.detach())
        };
        if let Some(old) = displaced {
            self.terminate(old, commit).await?;
        }
        Ok(())
    }

    /// Attach the new process to the app's record. Caller holds the app
    /// lock, so the slot is idle; if a handle is somehow still attached
    /// it is displaced and terminated, never silently dropped.
    async fn attach(
        &self,
        commit: &CommitRef,
        handle: Box<dyn ProcessHandle>,
    ) -> Result<(), DeployError> {
        let stray = {
            let mut deployments = self.deployments.lock();
            let Some(record) = deployments.iter_mut().find(|d| d.repo == *commit.repo()) else {
                return Ok(());
            };
            info!(commit = %commit, port = record.port, "recording deployment");
            record.sha = Some(commit.sha().to_string());
            let stray = record.process.detach();
            record.process = ProcessState::Active(handle);
            stray
        };
        if let Some(old) = stray {
            self.terminate(old, commit).await?;
        }
        Ok(())
    }

    /// Stop the process for this exact commit, retaining the record and
    /// its port reservation. No-op when no record matches the sha or the
    /// record has no active process.
    ///
    /// Returns whether a process was stopped.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::TerminationFailed` if the process would not
    /// stop. The port stays reserved either way.
    pub async fn undeploy(&self, commit: &CommitRef) -> Result<bool, DeployError> {
        let lock = self.app_lock(commit.repo());
        let _guard = lock.lock().await;

        let victim = {
            let mut deployments = self.deployments.lock();
            deployments
                .iter_mut()
                .find(|d| d.repo == *commit.repo() && d.sha.as_deref() == Some(commit.sha()))
                .and_then(|d| d.process.detach())
        };
        match victim {
            Some(handle) => {
                self.terminate(handle, commit).await?;
                info!(commit = %commit, "killed app, continuing to reserve its port");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// The reserved port for an app, if any.
    pub fn port_of(&self, repo: &RepoRef) -> Option<u16> {
        self.deployments
            .lock()
            .iter()
            .find(|d| &d.repo == repo)
            .map(|d| d.port)
    }

    /// Whether an app currently has an attached process.
    pub fn is_active(&self, repo: &RepoRef) -> bool {
        self.deployments
            .lock()
            .iter()
            .any(|d| &d.repo == repo && d.process.is_active())
    }

    async fn terminate(
        &self,
        mut handle: Box<dyn ProcessHandle>,
        commit: &CommitRef,
    ) -> Result<(), DeployError> {
        if let Err(source) = handle.terminate(self.stop_grace).await {
            // Operational fault: the process may still hold its port, so
            // the reservation must not be reassigned. Not retried.
            error!(
                commit = %commit,
                error = %source,
                "process termination failed; port stays reserved"
            );
            return Err(DeployError::TerminationFailed {
                commit: commit.to_string(),
                source,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for ManagedDeployments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedDeployments")
            .field("base_port", &self.base_port)
            .field("max_port", &self.max_port)
            .field("records", &self.deployments.lock().len())
            .finish()
    }
}
