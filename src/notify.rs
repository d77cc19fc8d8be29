// ABOUTME: One-way notification channel seam for chat-style summaries.
// ABOUTME: No feedback into the core; delivery failures are logged, never fatal.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification channel unavailable: {0}")]
    Unavailable(String),
}

/// Receives human-readable summaries of pipeline events.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(&self, message: &str) -> Result<(), NotifyError>;
}

/// Discards every message. Used when no channel is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopChannel;

#[async_trait]
impl NotificationChannel for NoopChannel {
    async fn send(&self, _message: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}
