// ABOUTME: Error type for push evaluation.
// ABOUTME: A guard or creator failure fails the whole selection, it is never "no match".

use thiserror::Error;

use super::invocation::ProjectError;

/// A guard or phase creator failed to evaluate.
///
/// Distinct from a creator having no opinion: selection errors surface
/// to the caller and are reported as an internal-error status on the
/// push, never silently treated as "no significant change".
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("guard evaluation failed: {0}")]
    Guard(String),

    #[error("phase creator '{name}' failed: {reason}")]
    Creator { name: String, reason: String },

    #[error("project inspection failed: {0}")]
    Project(#[from] ProjectError),
}
