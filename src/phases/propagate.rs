// ABOUTME: Reacts to goal status reports: advance, complete, or fail downstream.
// ABOUTME: Downstream phases are a statically declared relationship, never inferred.

use futures::future::try_join_all;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::notify::{NoopChannel, NotificationChannel};
use crate::status::{StatusError, StatusSink, StatusState};
use crate::types::{CommitRef, StatusContext};

use super::error::RunError;
use super::goal::Goal;
use super::registry::RunRegistry;
use super::run::GoalStatus;
use super::template::Phases;

#[derive(Debug, Error)]
pub enum PropagateError {
    #[error(transparent)]
    Run(#[from] RunError),

    #[error("failed to report downstream failure: {0}")]
    Status(#[from] StatusError),
}

/// What a status report did to the pipeline.
#[derive(Debug, Clone)]
pub enum Propagation {
    /// The context maps to no known run or goal; nothing happened.
    Ignored,
    /// The goal's status was recorded; nothing further to do.
    Recorded,
    /// The goal succeeded and the next goal is ready to be worked on.
    Advanced { next: Goal },
    /// The last goal succeeded; the run is complete.
    Completed,
    /// The goal failed; later goals and declared downstream phases were
    /// marked failed with the upstream tag.
    FailedDownstream { goals_failed: usize },
}

/// Applies external status reports to runs and propagates the result.
///
/// Downstream relationships are declared at construction as a map from
/// an upstream phases name to the phase templates that depend on it.
pub struct StatusPropagator {
    registry: Arc<RunRegistry>,
    sink: Arc<dyn StatusSink>,
    downstream: HashMap<String, Vec<Phases>>,
    channel: Arc<dyn NotificationChannel>,
}

impl StatusPropagator {
    pub fn new(
        registry: Arc<RunRegistry>,
        sink: Arc<dyn StatusSink>,
        downstream: HashMap<String, Vec<Phases>>,
    ) -> Self {
        Self {
            registry,
            sink,
            downstream,
            channel: Arc::new(NoopChannel),
        }
    }

    /// Attach a chat-style channel for failure summaries.
    pub fn with_channel(mut self, channel: Arc<dyn NotificationChannel>) -> Self {
        self.channel = channel;
        self
    }

    /// Handle one external status report.
    ///
    /// Reports for unknown commits or contexts are ignored; they belong
    /// to goals outside the selected phases or to unrelated systems.
    ///
    /// # Errors
    ///
    /// Returns `PropagateError::Run` on an invalid transition and
    /// `PropagateError::Status` if a downstream failure report cannot
    /// be written.
    pub async fn on_status(
        &self,
        commit: &CommitRef,
        context: &StatusContext,
        state: StatusState,
    ) -> Result<Propagation, PropagateError> {
        let Some(run) = self.registry.get(commit) else {
            debug!(%commit, %context, "status report for unknown commit, ignoring");
            return Ok(Propagation::Ignored);
        };

        // Apply under the run lock; collect what to do afterwards so no
        // sink I/O happens while holding it.
        let decision = {
            let mut run = run.lock();
            let status = Self::goal_status_for(state);
            match run.set_status(context, status) {
                None => {
                    debug!(%commit, %context, "status context not in selected phases, ignoring");
                    return Ok(Propagation::Ignored);
                }
                Some(result) => {
                    result?;
                    let phases = run.phases().clone();
                    match status {
                        GoalStatus::Failure { upstream: false } => {
                            let same_run = run.fail_downstream_of(context);
                            Decision::Failed { phases, same_run }
                        }
                        GoalStatus::Success => {
                            let pos = phases
                                .position_of(context)
                                .unwrap_or(phases.goal_count() - 1);
                            match phases.goal_after(pos) {
                                Some(next) => Decision::Advanced { next: next.clone() },
                                None => Decision::Completed,
                            }
                        }
                        _ => Decision::Recorded,
                    }
                }
            }
        };

        match decision {
            Decision::Recorded => Ok(Propagation::Recorded),
            Decision::Advanced { next } => {
                debug!(%commit, goal = next.name(), "goal succeeded, next goal ready");
                Ok(Propagation::Advanced { next })
            }
            Decision::Completed => {
                info!(%commit, "final goal succeeded, run complete");
                Ok(Propagation::Completed)
            }
            Decision::Failed { phases, same_run } => {
                let failed = self
                    .fail_downstream(commit, &phases, context, same_run)
                    .await?;
                Ok(Propagation::FailedDownstream {
                    goals_failed: failed,
                })
            }
        }
    }

    /// Report upstream-tagged failures for later goals of the failed run
    /// and for every goal of each declared downstream phases.
    async fn fail_downstream(
        &self,
        commit: &CommitRef,
        failed_phases: &Phases,
        failed_context: &StatusContext,
        same_run: Vec<Goal>,
    ) -> Result<usize, PropagateError> {
        warn!(
            %commit,
            phases = failed_phases.name(),
            context = %failed_context,
            "goal failed, failing downstream goals"
        );

        let description = format!("Failed: upstream phase '{}' failed", failed_phases.name());
        let mut targets: Vec<Goal> = same_run;
        if let Some(dependents) = self.downstream.get(failed_phases.name()) {
            for phases in dependents {
                targets.extend(phases.goals().cloned());
            }
        }

        try_join_all(targets.iter().map(|goal| {
            self.sink
                .set_status(commit, goal.context(), StatusState::Failure, &description)
        }))
        .await?;

        // One-way summary; a channel fault never fails the propagation.
        if let Err(err) = self
            .channel
            .send(&format!(
                "Phase '{}' failed for {commit}; {} downstream goal(s) will not run",
                failed_phases.name(),
                targets.len()
            ))
            .await
        {
            warn!(%commit, error = %err, "could not notify downstream failure");
        }

        Ok(targets.len())
    }

    /// Map the sink's status vocabulary onto the goal state machine.
    /// Goals start pending at run initialization, so an external pending
    /// report means work on the goal has started.
    fn goal_status_for(state: StatusState) -> GoalStatus {
        match state {
            StatusState::Pending => GoalStatus::InProgress,
            StatusState::Success => GoalStatus::Success,
            StatusState::Failure => GoalStatus::Failure { upstream: false },
            StatusState::Neutral => GoalStatus::Neutral,
        }
    }
}

impl std::fmt::Debug for StatusPropagator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusPropagator")
            .field("downstream", &self.downstream.keys())
            .finish()
    }
}

enum Decision {
    Recorded,
    Advanced { next: Goal },
    Completed,
    Failed { phases: Phases, same_run: Vec<Goal> },
}
