// ABOUTME: Keyed store of runs with per-run locks and branch-scoped supersession.
// ABOUTME: Runs are never deleted; a newer push on the branch supersedes them.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::types::{BranchKey, CommitRef};

use super::goal::Goal;
use super::run::Run;

/// One goal marked superseded during a supersession sweep, with the run
/// it belonged to. The caller reports these to the status sink.
#[derive(Debug, Clone)]
pub struct SupersededGoal {
    pub commit: CommitRef,
    pub goal: Goal,
}

/// Shared registry of runs keyed by commit.
///
/// Each run sits behind its own lock, so status reports for different
/// commits never contend. Supersession for a branch and creation of a
/// new run on that branch must both happen under the branch lock from
/// [`branch_lock`](Self::branch_lock) to avoid two simultaneously live
/// runs on one branch.
#[derive(Default)]
pub struct RunRegistry {
    runs: Mutex<HashMap<CommitRef, Arc<Mutex<Run>>>>,
    branch_locks: Mutex<HashMap<BranchKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The serialization lock for a branch. Callers hold it across
    /// supersession plus new-run insertion.
    pub fn branch_lock(&self, key: &BranchKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.branch_locks.lock();
        locks.entry(key.clone()).or_default().clone()
    }

    /// Insert a run for its commit, or return the existing one.
    ///
    /// Idempotent: re-initializing the same commit hands back the run
    /// already in flight instead of resetting its statuses.
    pub fn insert(&self, run: Run) -> Arc<Mutex<Run>> {
        let mut runs = self.runs.lock();
        runs.entry(run.commit().clone())
            .or_insert_with(|| Arc::new(Mutex::new(run)))
            .clone()
    }

    pub fn get(&self, commit: &CommitRef) -> Option<Arc<Mutex<Run>>> {
        self.runs.lock().get(commit).cloned()
    }

    /// Mark every non-terminal goal of every other run on the new
    /// commit's branch as superseded.
    ///
    /// Scoped strictly by branch: runs for other branches and runs that
    /// already reached a terminal state are untouched. The new commit's
    /// own run, if present, is also left alone.
    pub fn supersede_stale(&self, new_commit: &CommitRef) -> Vec<SupersededGoal> {
        let branch = new_commit.branch_key();
        let candidates: Vec<Arc<Mutex<Run>>> = {
            let runs = self.runs.lock();
            runs.iter()
                .filter(|(commit, _)| {
                    commit.branch_key() == branch && commit.sha() != new_commit.sha()
                })
                .map(|(_, run)| run.clone())
                .collect()
        };

        let mut superseded = Vec::new();
        for run in candidates {
            let mut run = run.lock();
            let commit = run.commit().clone();
            for goal in run.supersede() {
                superseded.push(SupersededGoal {
                    commit: commit.clone(),
                    goal,
                });
            }
        }
        if !superseded.is_empty() {
            info!(
                new_commit = %new_commit,
                goals = superseded.len(),
                "superseded stale in-flight goals on branch"
            );
        }
        superseded
    }
}

impl std::fmt::Debug for RunRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunRegistry")
            .field("runs", &self.runs.lock().len())
            .finish()
    }
}
