//! Change notifications for the UI layer.

use std::sync::Arc;

use tokio::sync::broadcast;

use super::state::{JobSnapshot, JobSummary};

/// What changed on the controller.
#[derive(Debug, Clone)]
pub enum JobNotification {
    /// Any state change while the job is live. Carries the state after the change.
    ProgressChanged(Box<JobSnapshot>),
    /// The user asked to cancel; the server has not confirmed yet.
    CancelRequested,
    Completed(JobSummary),
    Cancelled(String),
    Failed(String),
}

impl JobNotification {
    /// True for the notification that ends a job.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobNotification::Completed(_)
                | JobNotification::Cancelled(_)
                | JobNotification::Failed(_)
        )
    }
}

/// Fans out [`JobNotification`]s to any number of subscribers.
#[derive(Clone)]
pub struct NotificationBroadcaster {
    sender: Arc<broadcast::Sender<JobNotification>>,
}

impl NotificationBroadcaster {
    /// Creates a broadcaster with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Sends a notification to all subscribers.
    pub fn send(&self, notification: JobNotification) {
        // No active receivers is fine
        let _ = self.sender.send(notification);
    }

    /// Creates a new subscriber.
    pub fn subscribe(&self) -> broadcast::Receiver<JobNotification> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for NotificationBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

impl std::fmt::Debug for NotificationBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationBroadcaster")
            .field("receivers", &self.receiver_count())
            .finish()
    }
}
