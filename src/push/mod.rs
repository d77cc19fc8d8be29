// ABOUTME: Push evaluation: guards, phase creators, and first-match selection.
// ABOUTME: Decides which delivery phases apply to a pushed commit.

mod creator;
mod error;
mod guard;
mod invocation;
mod selector;

pub use creator::{GuardedPhaseCreator, PhaseCreator, Selection};
pub use error::SelectionError;
pub use guard::{AllGuards, AnyPush, HasFile, PushTest, PushesToBranch, all_guards_vote_for};
pub use invocation::{ProjectError, ProjectReader, PushInvocation};
pub use selector::PhaseSelector;
