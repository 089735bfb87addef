//! New-mail notifications.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::{sink::Sink, EmailRecord};

/// Broadcasts every accepted message to any number of subscribers.
///
/// Publishing never waits. The queue is bounded; a subscriber that falls
/// behind loses the oldest notifications and is told how many it missed.
#[derive(Debug, Clone)]
pub struct Hub {
    tx: broadcast::Sender<Arc<EmailRecord>>,
}

impl Hub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<EmailRecord>> {
        self.tx.subscribe()
    }
}

impl Sink for Hub {
    fn record(&self, email: EmailRecord) {
        match self.tx.send(Arc::new(email)) {
            Ok(subscribers) => tracing::trace!(subscribers, "Broadcast new mail"),
            Err(_) => tracing::trace!("No subscribers for new mail"),
        }
    }
}

/// Log a one-line summary for every message published on the hub.
pub async fn log_new_mail(mut rx: broadcast::Receiver<Arc<EmailRecord>>) {
    loop {
        match rx.recv().await {
            Ok(email) => tracing::info!(
                from = %email.sender,
                to = %email.recipients.join(", "),
                subject = %email.subject,
                "New mail"
            ),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "Mail log fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
