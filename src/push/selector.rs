// ABOUTME: First-match phase selection over an ordered creator list.
// ABOUTME: Creators evaluate concurrently; ties resolve by declared order.

use futures::future::try_join_all;
use std::sync::Arc;
use tracing::debug;

use super::creator::{PhaseCreator, Selection};
use super::error::SelectionError;
use super::invocation::PushInvocation;

/// Runs an ordered list of phase creators against a push and returns the
/// first match.
///
/// All creators are evaluated concurrently (they are independent and
/// side-effect free), but the winner is the earliest creator in declared
/// order that matched, never the first to complete. The creator list is
/// fixed at construction.
pub struct PhaseSelector {
    creators: Vec<Arc<dyn PhaseCreator>>,
}

impl PhaseSelector {
    pub fn new(creators: Vec<Arc<dyn PhaseCreator>>) -> Self {
        Self { creators }
    }

    /// Select phases for a push.
    ///
    /// Returns `Selection::NoOpinion` when no creator matches; that is
    /// not an error. Any creator or guard failure aborts the whole
    /// selection.
    ///
    /// # Errors
    ///
    /// Returns `SelectionError` if any creator fails to evaluate, even
    /// one declared after a matching creator.
    pub async fn select(&self, pi: &PushInvocation) -> Result<Selection, SelectionError> {
        let results = try_join_all(self.creators.iter().map(|c| c.create(pi))).await?;
        for (creator, result) in self.creators.iter().zip(results) {
            if let Selection::Matched(phases) = result {
                debug!(
                    creator = creator.name(),
                    phases = phases.name(),
                    commit = %pi.commit(),
                    "phase creator matched push"
                );
                return Ok(Selection::Matched(phases));
            }
        }
        debug!(commit = %pi.commit(), "no phase creator matched push");
        Ok(Selection::NoOpinion)
    }
}

impl std::fmt::Debug for PhaseSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseSelector")
            .field("creators", &self.creators.len())
            .finish()
    }
}
