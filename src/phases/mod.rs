// ABOUTME: Delivery phases: goal templates, per-commit runs, and status propagation.
// ABOUTME: Owns the goal state machine, supersession, and downstream failure fan-out.

mod error;
mod goal;
mod propagate;
mod registry;
mod run;
mod template;

pub use error::RunError;
pub use goal::Goal;
pub use propagate::{Propagation, StatusPropagator};
pub use registry::{RunRegistry, SupersededGoal};
pub use run::{GoalStatus, Run, Transition};
pub use template::Phases;
