//! Notification delivery seam
//!
//! Notifications are a side effect, not a dependency of success: the engine
//! emits them strictly after the store operation commits, and a sink failure
//! is logged and swallowed. Delivery transport (email, in-app) belongs to
//! the excluded collaborator behind this trait.

use async_trait::async_trait;
use tracing::info;

use crate::models::Notification;

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: Notification) -> anyhow::Result<()>;
}

/// Default sink: writes the notification to the log stream.
#[derive(Debug, Default, Clone)]
pub struct TracingNotifier;

#[async_trait]
impl NotificationSink for TracingNotifier {
    async fn deliver(&self, notification: Notification) -> anyhow::Result<()> {
        info!(
            "Notification for student {}: {} - {}",
            notification.student_id, notification.title, notification.body
        );
        Ok(())
    }
}

