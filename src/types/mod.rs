// ABOUTME: Validated domain identity types.
// ABOUTME: Repo and commit references plus external status context keys.

mod context;
mod repo_ref;

pub use context::{StatusContext, StatusContextError};
pub use repo_ref::{BranchKey, CommitRef, RepoRef, RepoRefError};
