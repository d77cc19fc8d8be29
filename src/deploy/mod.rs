// ABOUTME: Managed local deployments: port allocation, reuse, and process lifecycle.
// ABOUTME: Ports are reserved per app and survive process teardown.

mod error;
mod launcher;
mod managed;

pub use error::{DeployError, DeployErrorKind, LaunchError};
pub use launcher::{LaunchSpec, LocalLauncher, ProcessHandle, ProcessLauncher};
pub use managed::ManagedDeployments;
