// ABOUTME: Phases: a named, ordered, non-empty set of goals.
// ABOUTME: A template applied to a commit to produce a Run; owns no commit state.

use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::goal::Goal;
use crate::types::StatusContext;

/// An ordered set of goals describing one delivery pipeline shape, such
/// as build → scan → deploy → verify. Instantiated per commit as a
/// [`Run`](super::Run).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phases {
    name: String,
    goals: NonEmpty<Goal>,
}

impl Phases {
    pub fn new(name: &str, goals: NonEmpty<Goal>) -> Self {
        Self {
            name: name.to_string(),
            goals,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn goals(&self) -> impl Iterator<Item = &Goal> {
        self.goals.iter()
    }

    pub fn goal_count(&self) -> usize {
        self.goals.len()
    }

    /// The goal reported under the given context, if it belongs to this
    /// template.
    pub fn goal_for(&self, context: &StatusContext) -> Option<&Goal> {
        self.goals.iter().find(|g| g.context() == context)
    }

    /// Position of a goal within the phase order.
    pub fn position_of(&self, context: &StatusContext) -> Option<usize> {
        self.goals.iter().position(|g| g.context() == context)
    }

    /// The goal after the one at `position`, if any.
    pub fn goal_after(&self, position: usize) -> Option<&Goal> {
        self.goals.get(position + 1)
    }

    pub fn last_goal(&self) -> &Goal {
        self.goals.last()
    }
}

impl fmt::Display for Phases {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
