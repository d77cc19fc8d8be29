// ABOUTME: The evaluation context handed to guards and phase creators.
// ABOUTME: A commit reference plus a read-only view of the repository contents.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::types::CommitRef;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("repository content unavailable: {0}")]
    Unavailable(String),
}

/// Read-only access to the pushed repository's contents.
///
/// Guards and phase creators inspect files through this seam; they must
/// not mutate anything. Implementations typically wrap a cloned worktree
/// or a content API.
#[async_trait]
pub trait ProjectReader: Send + Sync {
    /// Whether a file exists at the given repository-relative path.
    async fn has_file(&self, path: &str) -> Result<bool, ProjectError>;

    /// File content at the given path, or `None` if absent.
    async fn file_content(&self, path: &str) -> Result<Option<String>, ProjectError>;
}

/// Everything a guard or phase creator may look at for one push.
#[derive(Clone)]
pub struct PushInvocation {
    commit: CommitRef,
    project: Arc<dyn ProjectReader>,
}

impl PushInvocation {
    pub fn new(commit: CommitRef, project: Arc<dyn ProjectReader>) -> Self {
        Self { commit, project }
    }

    pub fn commit(&self) -> &CommitRef {
        &self.commit
    }

    pub fn branch(&self) -> &str {
        self.commit.branch()
    }

    pub fn project(&self) -> &dyn ProjectReader {
        self.project.as_ref()
    }
}

impl std::fmt::Debug for PushInvocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushInvocation")
            .field("commit", &self.commit)
            .finish()
    }
}
