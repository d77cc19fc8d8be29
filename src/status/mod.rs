// ABOUTME: External status sink seam: the commit-status API the pipeline reports to.
// ABOUTME: Idempotent per (commit, context) key; plus a per-key ordering decorator.

mod ordered;

pub use ordered::OrderedSink;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::types::{CommitRef, StatusContext};

/// The states the external sink accepts. Narrower than
/// [`GoalStatus`](crate::phases::GoalStatus): superseded and in-progress
/// goals are mapped onto this vocabulary by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusState {
    Pending,
    Success,
    Failure,
    Neutral,
}

impl fmt::Display for StatusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusState::Pending => "pending",
            StatusState::Success => "success",
            StatusState::Failure => "failure",
            StatusState::Neutral => "neutral",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("status sink unreachable: {0}")]
    Unreachable(String),

    #[error("status write rejected for {context}: {reason}")]
    Rejected { context: String, reason: String },
}

/// Write side of the external commit-status API.
///
/// Implementations must be idempotent per (commit, context) key: the
/// core assumes at-least-once delivery and may re-send a status it has
/// already reported. The core never retries on its own; a failed write
/// surfaces to the caller, who owns backoff policy.
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn set_status(
        &self,
        commit: &CommitRef,
        context: &StatusContext,
        state: StatusState,
        description: &str,
    ) -> Result<(), StatusError>;
}
