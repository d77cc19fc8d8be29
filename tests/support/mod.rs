// ABOUTME: Test support utilities.
// ABOUTME: In-memory fakes for the project, status sink, launcher, and channel seams.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use slipway::deploy::{LaunchError, LaunchSpec, ProcessHandle, ProcessLauncher};
use slipway::notify::{NotificationChannel, NotifyError};
use slipway::push::{ProjectError, ProjectReader};
use slipway::status::{StatusError, StatusSink, StatusState};
use slipway::types::{CommitRef, StatusContext};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("slipway=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// A fixed set of in-memory files standing in for repository contents.
#[derive(Default)]
pub struct StaticProject {
    files: HashMap<String, String>,
}

#[allow(dead_code)]
impl StaticProject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files.insert(path.to_string(), content.to_string());
        self
    }
}

#[async_trait]
impl ProjectReader for StaticProject {
    async fn has_file(&self, path: &str) -> Result<bool, ProjectError> {
        Ok(self.files.contains_key(path))
    }

    async fn file_content(&self, path: &str) -> Result<Option<String>, ProjectError> {
        Ok(self.files.get(path).cloned())
    }
}

/// A project whose reads always fail, for selection-error paths.
#[allow(dead_code)]
pub struct BrokenProject;

#[async_trait]
impl ProjectReader for BrokenProject {
    async fn has_file(&self, path: &str) -> Result<bool, ProjectError> {
        Err(ProjectError::Read {
            path: path.to_string(),
            reason: "worktree missing".to_string(),
        })
    }

    async fn file_content(&self, path: &str) -> Result<Option<String>, ProjectError> {
        Err(ProjectError::Read {
            path: path.to_string(),
            reason: "worktree missing".to_string(),
        })
    }
}

/// One status write observed by the recording sink.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct RecordedStatus {
    pub commit: CommitRef,
    pub context: StatusContext,
    pub state: StatusState,
    pub description: String,
}

/// Records every status write; optionally fails all writes.
#[derive(Default)]
pub struct RecordingSink {
    records: Mutex<Vec<RecordedStatus>>,
    fail: AtomicBool,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<RecordedStatus> {
        self.records.lock().clone()
    }

    pub fn records_for(&self, context: &str) -> Vec<RecordedStatus> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.context.as_str() == context)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl StatusSink for RecordingSink {
    async fn set_status(
        &self,
        commit: &CommitRef,
        context: &StatusContext,
        state: StatusState,
        description: &str,
    ) -> Result<(), StatusError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StatusError::Unreachable("sink offline".to_string()));
        }
        self.records.lock().push(RecordedStatus {
            commit: commit.clone(),
            context: context.clone(),
            state,
            description: description.to_string(),
        });
        Ok(())
    }
}

/// Shared flag describing one fake process's fate.
#[derive(Default)]
pub struct ProcessProbe {
    terminated: AtomicBool,
}

#[allow(dead_code)]
impl ProcessProbe {
    pub fn was_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }
}

/// A fake process handle that flips its probe on termination.
pub struct FakeProcess {
    probe: Arc<ProcessProbe>,
    refuse_termination: bool,
    termination_delay: Duration,
}

#[allow(dead_code)]
impl FakeProcess {
    pub fn new() -> (Box<dyn ProcessHandle>, Arc<ProcessProbe>) {
        Self::build(false, Duration::ZERO)
    }

    /// A process whose termination always times out.
    pub fn stubborn() -> (Box<dyn ProcessHandle>, Arc<ProcessProbe>) {
        Self::build(true, Duration::ZERO)
    }

    /// A process that takes a while to die, for interleaving tests.
    pub fn slow(delay: Duration) -> (Box<dyn ProcessHandle>, Arc<ProcessProbe>) {
        Self::build(false, delay)
    }

    fn build(
        refuse_termination: bool,
        termination_delay: Duration,
    ) -> (Box<dyn ProcessHandle>, Arc<ProcessProbe>) {
        let probe = Arc::new(ProcessProbe::default());
        (
            Box::new(Self {
                probe: probe.clone(),
                refuse_termination,
                termination_delay,
            }),
            probe,
        )
    }
}

#[async_trait]
impl ProcessHandle for FakeProcess {
    fn pid(&self) -> Option<u32> {
        Some(4242)
    }

    async fn terminate(&mut self, grace: Duration) -> Result<(), LaunchError> {
        if self.refuse_termination {
            return Err(LaunchError::TerminationTimeout {
                timeout_secs: grace.as_secs(),
            });
        }
        if !self.termination_delay.is_zero() {
            tokio::time::sleep(self.termination_delay).await;
        }
        self.probe.terminated.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Launcher handing out fake processes and recording launch specs.
#[derive(Default)]
pub struct FakeLauncher {
    launched: Mutex<Vec<LaunchSpec>>,
    probes: Mutex<Vec<Arc<ProcessProbe>>>,
}

#[allow(dead_code)]
impl FakeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn launched(&self) -> Vec<LaunchSpec> {
        self.launched.lock().clone()
    }

    pub fn probes(&self) -> Vec<Arc<ProcessProbe>> {
        self.probes.lock().clone()
    }
}

#[async_trait]
impl ProcessLauncher for FakeLauncher {
    async fn launch(&self, spec: &LaunchSpec) -> Result<Box<dyn ProcessHandle>, LaunchError> {
        self.launched.lock().push(spec.clone());
        let (handle, probe) = FakeProcess::new();
        self.probes.lock().push(probe);
        Ok(handle)
    }
}

/// Records chat notifications.
#[derive(Default)]
pub struct RecordingChannel {
    messages: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn send(&self, message: &str) -> Result<(), NotifyError> {
        self.messages.lock().push(message.to_string());
        Ok(())
    }
}

/// Shorthand for building commits in tests.
#[allow(dead_code)]
pub fn commit(owner: &str, repo: &str, branch: &str, sha: &str) -> CommitRef {
    CommitRef::new(owner, repo, branch, sha).unwrap()
}

#[allow(dead_code)]
pub fn ctx(name: &str) -> StatusContext {
    StatusContext::new(name).unwrap()
}
