// ABOUTME: A single unit of pipeline work with its external status key.
// ABOUTME: Immutable definition; belongs to exactly one Phases template.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::StatusContext;

/// One named goal within a phases template, e.g. "build" reported under
/// the `delivery/build` context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Goal {
    name: String,
    context: StatusContext,
}

impl Goal {
    pub fn new(name: &str, context: StatusContext) -> Self {
        Self {
            name: name.to_string(),
            context,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> &StatusContext {
        &self.context
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.context)
    }
}
