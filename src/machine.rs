// ABOUTME: The assembled delivery machine: push in, selected phases and pending goals out.
// ABOUTME: Serializes supersession against new-run creation per branch.

use futures::future::try_join_all;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::MachineConfig;
use crate::notify::{NoopChannel, NotificationChannel};
use crate::phases::{Phases, Run, RunRegistry, StatusPropagator, SupersededGoal};
use crate::push::{PhaseCreator, PhaseSelector, PushInvocation, Selection, SelectionError};
use crate::status::{OrderedSink, StatusError, StatusSink, StatusState};
use crate::types::CommitRef;

#[derive(Debug, Error)]
pub enum MachineError {
    /// A guard or creator failed. Reported on the selection context,
    /// distinct from ordinary pipeline failures and from "no significant
    /// change".
    #[error("phase selection failed: {0}")]
    Selection(#[from] SelectionError),

    /// A required status write could not be confirmed. The run's
    /// initialization is not complete; the caller owns retry/backoff.
    #[error("status report failed: {0}")]
    Status(#[from] StatusError),
}

/// What a push did to the pipeline.
#[derive(Debug, Clone)]
pub enum PushOutcome {
    /// No creator matched; a neutral immaterial status was recorded.
    Immaterial,
    /// Phases were selected and every goal is pending.
    PhasesStarted {
        phases: String,
        goals: usize,
        superseded: usize,
    },
}

/// The delivery core wired together: selector, run registry, status sink
/// and notification channel.
///
/// Creator and downstream lists are immutable inputs fixed at
/// construction. The sink is wrapped in an [`OrderedSink`] so per-goal
/// status ordering holds machine-wide.
pub struct DeliveryMachine {
    config: MachineConfig,
    selector: PhaseSelector,
    registry: Arc<RunRegistry>,
    sink: Arc<dyn StatusSink>,
    channel: Arc<dyn NotificationChannel>,
}

impl DeliveryMachine {
    pub fn new(
        config: MachineConfig,
        creators: Vec<Arc<dyn PhaseCreator>>,
        sink: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            config,
            selector: PhaseSelector::new(creators),
            registry: Arc::new(RunRegistry::new()),
            sink: Arc::new(OrderedSink::new(sink)),
            channel: Arc::new(NoopChannel),
        }
    }

    /// Attach a chat-style channel for selection-failure summaries.
    pub fn with_channel(mut self, channel: Arc<dyn NotificationChannel>) -> Self {
        self.channel = channel;
        self
    }

    pub fn registry(&self) -> Arc<RunRegistry> {
        self.registry.clone()
    }

    /// A propagator sharing this machine's registry and ordered sink,
    /// with the given statically declared downstream relationships.
    pub fn propagator(&self, downstream: HashMap<String, Vec<Phases>>) -> StatusPropagator {
        StatusPropagator::new(self.registry.clone(), self.sink.clone(), downstream)
            .with_channel(self.channel.clone())
    }

    /// Handle one push: select phases, supersede stale runs on the
    /// branch, and set every selected goal to pending.
    ///
    /// # Errors
    ///
    /// `MachineError::Selection` when a guard or creator fails (an
    /// internal-error status is reported on the selection context);
    /// `MachineError::Status` when a required status write fails, in
    /// which case the run's initialization must be treated as
    /// not-yet-complete and retried by the caller.
    pub async fn on_push(&self, pi: &PushInvocation) -> Result<PushOutcome, MachineError> {
        let commit = pi.commit().clone();
        let selection = match self.selector.select(pi).await {
            Ok(selection) => selection,
            Err(err) => {
                self.report_selection_error(&commit, &err).await;
                return Err(MachineError::Selection(err));
            }
        };

        match selection {
            Selection::NoOpinion => {
                info!(%commit, "no phases satisfied by push");
                self.sink
                    .set_status(
                        &commit,
                        &self.config.immaterial_context,
                        StatusState::Neutral,
                        "No significant change",
                    )
                    .await?;
                Ok(PushOutcome::Immaterial)
            }
            Selection::Matched(phases) => self.start_phases(&commit, phases).await,
        }
    }

    /// Supersede stale runs on the branch, create the run, and report
    /// one pending status per goal. Serialized per branch so a new run
    /// can never race a supersession sweep of the same branch.
    async fn start_phases(
        &self,
        commit: &CommitRef,
        phases: Phases,
    ) -> Result<PushOutcome, MachineError> {
        let branch_lock = self.registry.branch_lock(&commit.branch_key());
        let superseded = {
            let _guard = branch_lock.lock().await;
            let superseded = self.registry.supersede_stale(commit);
            self.registry
                .insert(Run::pending(commit.clone(), phases.clone()));
            superseded
        };

        info!(
            %commit,
            phases = phases.name(),
            goals = phases.goal_count(),
            superseded = superseded.len(),
            "phases selected, setting goals to pending"
        );

        self.report_superseded(&superseded, commit).await?;

        // Batched; the whole initialization fails if any write fails.
        let writes: Vec<_> = phases
            .goals()
            .map(|goal| (goal, format!("Pending: {}", goal.name())))
            .collect();
        try_join_all(writes.iter().map(|(goal, description)| {
            self.sink
                .set_status(commit, goal.context(), StatusState::Pending, description)
        }))
        .await?;

        Ok(PushOutcome::PhasesStarted {
            phases: phases.name().to_string(),
            goals: phases.goal_count(),
            superseded: superseded.len(),
        })
    }

    /// The sink vocabulary has no superseded state; report neutral with
    /// the superseding sha so the goal cannot read as a failure.
    async fn report_superseded(
        &self,
        superseded: &[SupersededGoal],
        new_commit: &CommitRef,
    ) -> Result<(), StatusError> {
        let description = format!("Superseded by {}", new_commit.short_sha());
        try_join_all(superseded.iter().map(|s| {
            self.sink.set_status(
                &s.commit,
                s.goal.context(),
                StatusState::Neutral,
                &description,
            )
        }))
        .await?;
        Ok(())
    }

    async fn report_selection_error(&self, commit: &CommitRef, err: &SelectionError) {
        warn!(%commit, error = %err, "phase selection failed");
        let description = format!("internal error: {err}");
        if let Err(sink_err) = self
            .sink
            .set_status(
                commit,
                &self.config.selection_context,
                StatusState::Failure,
                &description,
            )
            .await
        {
            warn!(%commit, error = %sink_err, "could not report selection error status");
        }
        if let Err(notify_err) = self
            .channel
            .send(&format!("Phase selection failed for {commit}: {err}"))
            .await
        {
            warn!(%commit, error = %notify_err, "could not notify selection failure");
        }
    }
}

impl std::fmt::Debug for DeliveryMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryMachine")
            .field("selector", &self.selector)
            .field("registry", &self.registry)
            .finish()
    }
}
