// ABOUTME: Repository and commit identity types.
// ABOUTME: A CommitRef names exactly one push; a BranchKey scopes supersession.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoRefError {
    #[error("owner cannot be empty")]
    EmptyOwner,

    #[error("repository name cannot be empty")]
    EmptyRepo,

    #[error("branch cannot be empty")]
    EmptyBranch,

    #[error("commit sha cannot be empty")]
    EmptySha,

    #[error("commit sha contains non-hex character: '{0}'")]
    InvalidSha(char),
}

/// A repository, identified by owner and name.
///
/// This is the matching key for port reuse in managed deployments:
/// two commits of the same repository share one port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    owner: String,
    repo: String,
}

impl RepoRef {
    pub fn new(owner: &str, repo: &str) -> Result<Self, RepoRefError> {
        if owner.is_empty() {
            return Err(RepoRefError::EmptyOwner);
        }
        if repo.is_empty() {
            return Err(RepoRefError::EmptyRepo);
        }
        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// A branch within a repository. Supersession is scoped by this key:
/// a newer push only supersedes runs on the same branch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BranchKey {
    repo: RepoRef,
    branch: String,
}

impl BranchKey {
    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }
}

impl fmt::Display for BranchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repo, self.branch)
    }
}

/// One pushed commit: owner, repository, branch, and sha.
///
/// Immutable once created; keys all phase and goal state for one push.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommitRef {
    repo: RepoRef,
    branch: String,
    sha: String,
}

impl CommitRef {
    pub fn new(owner: &str, repo: &str, branch: &str, sha: &str) -> Result<Self, RepoRefError> {
        let repo = RepoRef::new(owner, repo)?;
        if branch.is_empty() {
            return Err(RepoRefError::EmptyBranch);
        }
        if sha.is_empty() {
            return Err(RepoRefError::EmptySha);
        }
        if let Some(c) = sha.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(RepoRefError::InvalidSha(c));
        }
        Ok(Self {
            repo,
            branch: branch.to_string(),
            sha: sha.to_string(),
        })
    }

    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    pub fn owner(&self) -> &str {
        self.repo.owner()
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn sha(&self) -> &str {
        &self.sha
    }

    /// The branch-scoped key used to serialize supersession against
    /// new-run creation.
    pub fn branch_key(&self) -> BranchKey {
        BranchKey {
            repo: self.repo.clone(),
            branch: self.branch.clone(),
        }
    }

    /// Short sha for log and status descriptions.
    pub fn short_sha(&self) -> &str {
        let end = self.sha.len().min(7);
        &self.sha[..end]
    }
}

impl fmt::Display for CommitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}@{}", self.repo, self.branch, self.short_sha())
    }
}
