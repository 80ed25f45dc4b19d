use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ResponseSubmitted,
    CorrectionAttached,
    ResponseApproved,
    ResponsePublished,
    SignatureUploaded,
    MessagePosted,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub response_id: String,
    pub subject: String,
}

impl Notification {
    pub fn new(kind: NotificationKind, response_id: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            kind,
            response_id: response_id.into(),
            subject: subject.into(),
        }
    }
}

/// Outbound notification channel (mail in production).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification) -> anyhow::Result<()>;
}

/// Writes notifications to the log.
#[derive(Debug, Default, Clone)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, notification: Notification) -> anyhow::Result<()> {
        info!(
            kind = ?notification.kind,
            response_id = %notification.response_id,
            "notification: {}",
            notification.subject
        );
        Ok(())
    }
}

/// Fire and forget. The caller never observes the outcome.
pub fn dispatch(notifier: &Arc<dyn Notifier>, notification: Notification) {
    let notifier = Arc::clone(notifier);
    tokio::spawn(async move {
        let kind = notification.kind;
        if let Err(e) = notifier.notify(notification).await {
            warn!("Failed to send {:?} notification: {}", kind, e);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    struct Channel(mpsc::UnboundedSender<Notification>);

    #[async_trait]
    impl Notifier for Channel {
        async fn notify(&self, notification: Notification) -> anyhow::Result<()> {
            self.0.send(notification)?;
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl Notifier for Failing {
        async fn notify(&self, _: Notification) -> anyhow::Result<()> {
            anyhow::bail!("smtp down")
        }
    }

    #[tokio::test]
    async fn dispatch_runs_in_background() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notifier: Arc<dyn Notifier> = Arc::new(Channel(tx));
        dispatch(&notifier, Notification::new(NotificationKind::ResponseApproved, "r1", "Aprobado"));
        let got = rx.recv().await.unwrap();
        assert_eq!(got.response_id, "r1");
        assert_eq!(got.kind, NotificationKind::ResponseApproved);
    }

    #[tokio::test]
    async fn failures_are_swallowed() {
        let notifier: Arc<dyn Notifier> = Arc::new(Failing);
        dispatch(&notifier, Notification::new(NotificationKind::MessagePosted, "r1", "x"));
        tokio::task::yield_now().await;
    }
}
