// ABOUTME: Per-key ordering decorator for a status sink.
// ABOUTME: A later status for a goal must not be overtaken by an earlier one.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{CommitRef, StatusContext};

use super::{StatusError, StatusSink, StatusState};

/// Serializes status dispatch per (commit, context) key.
///
/// Writes for different goals still run concurrently; only writes for
/// the same goal queue behind each other, preserving report order even
/// when the underlying sink reorders concurrent requests.
///
/// The key map grows with each distinct (commit, context) pair and is
/// never swept, matching the run registry where runs are never deleted.
/// An entry is one Arc'd empty mutex.
pub struct OrderedSink {
    inner: Arc<dyn StatusSink>,
    locks: Mutex<HashMap<(CommitRef, StatusContext), Arc<tokio::sync::Mutex<()>>>>,
}

impl OrderedSink {
    pub fn new(inner: Arc<dyn StatusSink>) -> Self {
        Self {
            inner,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn key_lock(&self, commit: &CommitRef, context: &StatusContext) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock();
        locks
            .entry((commit.clone(), context.clone()))
            .or_default()
            .clone()
    }
}

#[async_trait]
impl StatusSink for OrderedSink {
    async fn set_status(
        &self,
        commit: &CommitRef,
        context: &StatusContext,
        state: StatusState,
        description: &str,
    ) -> Result<(), StatusError> {
        let lock = self.key_lock(commit, context);
        let _guard = lock.lock().await;
        self.inner
            .set_status(commit, context, state, description)
            .await
    }
}

impl std::fmt::Debug for OrderedSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderedSink")
            .field("keys", &self.locks.lock().len())
            .finish()
    }
}
