// ABOUTME: Deployment error types with SNAFU pattern.
// ABOUTME: Port exhaustion and process faults, with a kind for programmatic handling.

use snafu::Snafu;

/// Errors from launching or signalling a local process.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum LaunchError {
    #[snafu(display("failed to spawn process: {source}"))]
    Spawn { source: std::io::Error },

    #[snafu(display("failed to signal process: {source}"))]
    Signal { source: std::io::Error },

    #[snafu(display("process did not exit within {timeout_secs}s of termination"))]
    TerminationTimeout { timeout_secs: u64 },
}

/// Errors from the managed-deployment registry.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DeployError {
    #[snafu(display("no free port in range {base}..={max}"))]
    PortExhausted { base: u16, max: u16 },

    #[snafu(display("failed to launch process for {commit}: {source}"))]
    Launch { commit: String, source: LaunchError },

    /// Termination faults are fatal for the affected deployment and are
    /// never retried; the port stays reserved.
    #[snafu(display("failed to terminate process for {commit}: {source}"))]
    TerminationFailed { commit: String, source: LaunchError },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    /// The configured port range has no free port left.
    PortExhausted,
    /// The process could not be started.
    LaunchFailed,
    /// A termination request did not stop the process.
    TerminationFailed,
}

impl DeployError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::PortExhausted { .. } => DeployErrorKind::PortExhausted,
            DeployError::Launch { .. } => DeployErrorKind::LaunchFailed,
            DeployError::TerminationFailed { .. } => DeployErrorKind::TerminationFailed,
        }
    }
}
