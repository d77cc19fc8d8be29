// ABOUTME: Error types for run state transitions.
// ABOUTME: Invalid transitions are rejected; unknown contexts are not errors.

use thiserror::Error;

use crate::types::CommitRef;

use super::run::GoalStatus;

#[derive(Debug, Error)]
pub enum RunError {
    /// A status report tried to move a goal backwards or out of a
    /// terminal state.
    #[error("goal '{goal}' for {commit} cannot move {current:?} -> {requested:?}")]
    InvalidTransition {
        commit: CommitRef,
        goal: String,
        current: GoalStatus,
        requested: GoalStatus,
    },
}
