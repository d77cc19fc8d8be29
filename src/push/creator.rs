// ABOUTME: Phase creators: map a push to a Phases template, or abstain.
// ABOUTME: Abstention is a first-class result, not an error or a falsy value.

use async_trait::async_trait;
use std::sync::Arc;

use super::error::SelectionError;
use super::guard::PushTest;
use super::invocation::PushInvocation;
use crate::phases::Phases;

/// The result of asking one creator about one push.
#[derive(Debug, Clone)]
pub enum Selection {
    /// This creator claims the push and proposes these phases.
    Matched(Phases),
    /// This creator has no opinion; ask the next one.
    NoOpinion,
}

/// Produces a [`Phases`] template for pushes it recognizes.
///
/// Creators are independent and must not mutate shared state; their
/// ordering within a [`PhaseSelector`](super::PhaseSelector) list is
/// significant (first match wins).
#[async_trait]
pub trait PhaseCreator: Send + Sync {
    /// Name used in error reporting.
    fn name(&self) -> &str;

    async fn create(&self, pi: &PushInvocation) -> Result<Selection, SelectionError>;
}

/// Pairs a guard with a fixed phases template: matched when the guard
/// votes true, no opinion otherwise.
pub struct GuardedPhaseCreator {
    name: String,
    guard: Arc<dyn PushTest>,
    phases: Phases,
}

impl GuardedPhaseCreator {
    pub fn new(guard: Arc<dyn PushTest>, phases: Phases) -> Self {
        Self {
            name: format!("guarded:{}", phases.name()),
            guard,
            phases,
        }
    }
}

#[async_trait]
impl PhaseCreator for GuardedPhaseCreator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create(&self, pi: &PushInvocation) -> Result<Selection, SelectionError> {
        if self.guard.test(pi).await? {
            Ok(Selection::Matched(self.phases.clone()))
        } else {
            Ok(Selection::NoOpinion)
        }
    }
}

impl std::fmt::Debug for GuardedPhaseCreator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedPhaseCreator")
            .field("name", &self.name)
            .finish()
    }
}
