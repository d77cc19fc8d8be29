// ABOUTME: Per-commit instantiation of a phases template with live goal statuses.
// ABOUTME: Enforces monotonic transitions; superseded overrides any non-terminal state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CommitRef, StatusContext};

use super::error::RunError;
use super::goal::Goal;
use super::template::Phases;

/// Live status of one goal within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Pending,
    InProgress,
    Success,
    /// `upstream` distinguishes a failure propagated from an upstream
    /// phase from one that originated in this goal.
    Failure {
        upstream: bool,
    },
    Superseded,
    Neutral,
}

impl GoalStatus {
    /// Terminal statuses are sticky: no transition leaves them.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GoalStatus::Pending | GoalStatus::InProgress)
    }
}

/// Outcome of applying a status report to a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The goal moved to the requested status.
    Applied,
    /// The goal was already in the requested status, or a supersede hit
    /// an already-terminal goal. Safe under at-least-once delivery.
    Unchanged,
}

/// The goal-state instance for one commit.
///
/// Created when phases are selected for a push; mutated only through
/// status-set operations; never deleted, only superseded by a newer run
/// on the same branch.
#[derive(Debug, Clone)]
pub struct Run {
    commit: CommitRef,
    phases: Phases,
    statuses: Vec<GoalStatus>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Run {
    /// Instantiate a template for a commit with every goal pending.
    pub fn pending(commit: CommitRef, phases: Phases) -> Self {
        let statuses = vec![GoalStatus::Pending; phases.goal_count()];
        let now = Utc::now();
        Self {
            commit,
            phases,
            statuses,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn commit(&self) -> &CommitRef {
        &self.commit
    }

    pub fn phases(&self) -> &Phases {
        &self.phases
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Status of the goal reported under `context`, or `None` when the
    /// context does not belong to this run's phases.
    pub fn status_of(&self, context: &StatusContext) -> Option<GoalStatus> {
        self.phases
            .position_of(context)
            .map(|idx| self.statuses[idx])
    }

    /// Whether every goal has reached a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.statuses.iter().all(GoalStatus::is_terminal)
    }

    /// Apply a status report to the goal under `context`.
    ///
    /// Allowed moves: pending to anything, in_progress to any terminal
    /// status, superseding any non-terminal goal. Setting the current
    /// status again is `Unchanged`. Unknown contexts return `None`.
    ///
    /// # Errors
    ///
    /// Returns `RunError::InvalidTransition` for backwards moves and any
    /// attempt to leave a terminal status.
    pub fn set_status(
        &mut self,
        context: &StatusContext,
        status: GoalStatus,
    ) -> Option<Result<Transition, RunError>> {
        let idx = self.phases.position_of(context)?;
        Some(self.apply(idx, status))
    }

    /// Mark every non-terminal goal superseded, returning the affected
    /// goals. Terminal goals are untouched.
    pub fn supersede(&mut self) -> Vec<Goal> {
        let mut affected = Vec::new();
        for (idx, goal) in self.phases.goals().enumerate() {
            if !self.statuses[idx].is_terminal() {
                self.statuses[idx] = GoalStatus::Superseded;
                affected.push(goal.clone());
            }
        }
        if !affected.is_empty() {
            self.updated_at = Utc::now();
        }
        affected
    }

    /// Mark every non-terminal goal after the one under `context` as
    /// failed with the upstream tag, returning the goals that changed.
    /// These goals can no longer run once an earlier goal has failed.
    pub fn fail_downstream_of(&mut self, context: &StatusContext) -> Vec<Goal> {
        let Some(failed_at) = self.phases.position_of(context) else {
            return Vec::new();
        };
        let mut affected = Vec::new();
        for (idx, goal) in self.phases.goals().enumerate() {
            if idx > failed_at && !self.statuses[idx].is_terminal() {
                self.statuses[idx] = GoalStatus::Failure { upstream: true };
                affected.push(goal.clone());
            }
        }
        if !affected.is_empty() {
            self.updated_at = Utc::now();
        }
        affected
    }

    fn apply(&mut self, idx: usize, status: GoalStatus) -> Result<Transition, RunError> {
        let current = self.statuses[idx];
        if current == status {
            return Ok(Transition::Unchanged);
        }
        let allowed = match (current, status) {
            // A terminal status never changes; superseding it is a no-op.
            (c, GoalStatus::Superseded) if c.is_terminal() => {
                return Ok(Transition::Unchanged);
            }
            (c, _) if c.is_terminal() => false,
            (GoalStatus::Pending, _) => true,
            (GoalStatus::InProgress, GoalStatus::Pending) => false,
            (GoalStatus::InProgress, _) => true,
            _ => false,
        };
        if !allowed {
            let goal = self
                .phases
                .goals()
                .nth(idx)
                .map(|g| g.name().to_string())
                .unwrap_or_default();
            return Err(RunError::InvalidTransition {
                commit: self.commit.clone(),
                goal,
                current,
                requested: status,
            });
        }
        self.statuses[idx] = status;
        self.updated_at = Utc::now();
        Ok(Transition::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nonempty::nonempty;

    fn ctx(name: &str) -> StatusContext {
        StatusContext::new(name).unwrap()
    }

    fn run() -> Run {
        let commit = CommitRef::new("atomist", "spring-team", "main", "abc123").unwrap();
        let phases = Phases::new(
            "http-service",
            nonempty![
                Goal::new("build", ctx("delivery/build")),
                Goal::new("deploy", ctx("delivery/deploy")),
            ],
        );
        Run::pending(commit, phases)
    }

    #[test]
    fn starts_all_pending() {
        let r = run();
        assert_eq!(r.status_of(&ctx("delivery/build")), Some(GoalStatus::Pending));
        assert_eq!(r.status_of(&ctx("delivery/deploy")), Some(GoalStatus::Pending));
        assert!(!r.is_terminal());
    }

    #[test]
    fn pending_to_in_progress_to_success() {
        let mut r = run();
        let build = ctx("delivery/build");
        assert_eq!(
            r.set_status(&build, GoalStatus::InProgress).unwrap().unwrap(),
            Transition::Applied
        );
        assert_eq!(
            r.set_status(&build, GoalStatus::Success).unwrap().unwrap(),
            Transition::Applied
        );
        assert_eq!(r.status_of(&build), Some(GoalStatus::Success));
    }

    #[test]
    fn pending_may_jump_straight_to_terminal() {
        let mut r = run();
        let build = ctx("delivery/build");
        assert_eq!(
            r.set_status(&build, GoalStatus::Failure { upstream: false })
                .unwrap()
                .unwrap(),
            Transition::Applied
        );
    }

    #[test]
    fn terminal_is_sticky() {
        let mut r = run();
        let build = ctx("delivery/build");
        r.set_status(&build, GoalStatus::Success).unwrap().unwrap();
        let err = r
            .set_status(&build, GoalStatus::Failure { upstream: false })
            .unwrap();
        assert!(matches!(err, Err(RunError::InvalidTransition { .. })));
    }

    #[test]
    fn repeated_report_is_unchanged() {
        let mut r = run();
        let build = ctx("delivery/build");
        r.set_status(&build, GoalStatus::Success).unwrap().unwrap();
        assert_eq!(
            r.set_status(&build, GoalStatus::Success).unwrap().unwrap(),
            Transition::Unchanged
        );
    }

    #[test]
    fn in_progress_cannot_return_to_pending() {
        let mut r = run();
        let build = ctx("delivery/build");
        r.set_status(&build, GoalStatus::InProgress).unwrap().unwrap();
        assert!(matches!(
            r.set_status(&build, GoalStatus::Pending).unwrap(),
            Err(RunError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn unknown_context_is_none() {
        let mut r = run();
        assert!(r.set_status(&ctx("other/thing"), GoalStatus::Success).is_none());
    }

    #[test]
    fn supersede_skips_terminal_goals() {
        let mut r = run();
        r.set_status(&ctx("delivery/build"), GoalStatus::Success)
            .unwrap()
            .unwrap();
        let affected = r.supersede();
        assert_eq!(affected.len(), 1);
        assert_eq!(affected[0].name(), "deploy");
        assert_eq!(
            r.status_of(&ctx("delivery/build")),
            Some(GoalStatus::Success)
        );
        assert_eq!(
            r.status_of(&ctx("delivery/deploy")),
            Some(GoalStatus::Superseded)
        );
        assert!(r.is_terminal());
    }

    #[test]
    fn superseding_terminal_goal_via_set_status_is_unchanged() {
        let mut r = run();
        let build = ctx("delivery/build");
        r.set_status(&build, GoalStatus::Success).unwrap().unwrap();
        assert_eq!(
            r.set_status(&build, GoalStatus::Superseded).unwrap().unwrap(),
            Transition::Unchanged
        );
    }

    #[test]
    fn downstream_goals_fail_with_upstream_tag() {
        let mut r = run();
        r.set_status(&ctx("delivery/build"), GoalStatus::Failure { upstream: false })
            .unwrap()
            .unwrap();
        let affected = r.fail_downstream_of(&ctx("delivery/build"));
        assert_eq!(affected.len(), 1);
        assert_eq!(affected[0].name(), "deploy");
        assert_eq!(
            r.status_of(&ctx("delivery/build")),
            Some(GoalStatus::Failure { upstream: false })
        );
        assert_eq!(
            r.status_of(&ctx("delivery/deploy")),
            Some(GoalStatus::Failure { upstream: true })
        );
    }
}
