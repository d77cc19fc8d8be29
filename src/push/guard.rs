// ABOUTME: Push guards: predicates deciding whether phases apply to a push.
// ABOUTME: Side-effect free, composable via all_guards_vote_for (AND semantics).

use async_trait::async_trait;
use futures::future::try_join_all;
use std::sync::Arc;

use super::error::SelectionError;
use super::invocation::PushInvocation;

/// A predicate over a push. Guards must be side-effect free and must not
/// depend on evaluation order; compositions may run them concurrently.
#[async_trait]
pub trait PushTest: Send + Sync {
    async fn test(&self, pi: &PushInvocation) -> Result<bool, SelectionError>;
}

/// Matches every push.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyPush;

#[async_trait]
impl PushTest for AnyPush {
    async fn test(&self, _pi: &PushInvocation) -> Result<bool, SelectionError> {
        Ok(true)
    }
}

/// Matches pushes to one named branch.
#[derive(Debug, Clone)]
pub struct PushesToBranch(pub String);

impl PushesToBranch {
    pub fn new(branch: &str) -> Self {
        Self(branch.to_string())
    }
}

#[async_trait]
impl PushTest for PushesToBranch {
    async fn test(&self, pi: &PushInvocation) -> Result<bool, SelectionError> {
        Ok(pi.branch() == self.0)
    }
}

/// Matches pushes whose repository contains the given file.
#[derive(Debug, Clone)]
pub struct HasFile(pub String);

impl HasFile {
    pub fn new(path: &str) -> Self {
        Self(path.to_string())
    }
}

#[async_trait]
impl PushTest for HasFile {
    async fn test(&self, pi: &PushInvocation) -> Result<bool, SelectionError> {
        Ok(pi.project().has_file(&self.0).await?)
    }
}

/// AND-composition of guards: true iff every guard votes true.
///
/// All guards are evaluated concurrently. An empty list is vacuously
/// true. A guard evaluation error fails the whole composition rather
/// than counting as a false vote.
pub fn all_guards_vote_for(guards: Vec<Arc<dyn PushTest>>) -> AllGuards {
    AllGuards { guards }
}

/// The composition returned by [`all_guards_vote_for`].
pub struct AllGuards {
    guards: Vec<Arc<dyn PushTest>>,
}

#[async_trait]
impl PushTest for AllGuards {
    async fn test(&self, pi: &PushInvocation) -> Result<bool, SelectionError> {
        let votes = try_join_all(self.guards.iter().map(|g| g.test(pi))).await?;
        Ok(votes.iter().all(|v| *v))
    }
}

impl std::fmt::Debug for AllGuards {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AllGuards")
            .field("guards", &self.guards.len())
            .finish()
    }
}
