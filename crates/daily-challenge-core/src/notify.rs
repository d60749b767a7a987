//! Outbound notification seam.
//!
//! Lifecycle state is committed before anything is sent, so a failed send
//! never rolls back a post or a submission.

use async_trait::async_trait;
use tracing::warn;

use crate::error::IntegrationError;

/// Delivers a text message to a destination chat.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, destination: i64, text: &str) -> Result<(), IntegrationError>;
}

/// Send and log a failure instead of returning it.
///
/// Returns whether the message was delivered.
pub async fn notify_best_effort(notifier: &dyn Notifier, destination: i64, text: &str) -> bool {
    match notifier.send(destination, text).await {
        Ok(()) => true,
        Err(e) => {
            warn!(destination, error = %e, "notification failed");
            false
        }
    }
}
