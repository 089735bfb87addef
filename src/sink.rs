//! Where accepted messages go.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::EmailRecord;

/// Receives every accepted message.
///
/// Called from many sessions at once. Implementations must not block the
/// calling session; queueing, retries and error reporting are their own
/// business.
pub trait Sink: Send + Sync {
    fn record(&self, email: EmailRecord);
}

impl<T: Sink + ?Sized> Sink for Arc<T> {
    fn record(&self, email: EmailRecord) {
        (**self).record(email)
    }
}

impl Sink for mpsc::UnboundedSender<EmailRecord> {
    fn record(&self, email: EmailRecord) {
        if self.send(email).is_err() {
            tracing::warn!("Mail receiver is gone, dropping message");
        }
    }
}

/// Forwards every message to each of its sinks, in order.
#[derive(Default)]
pub struct Tee {
    sinks: Vec<Arc<dyn Sink>>,
}

impl Tee {
    pub fn new(sinks: Vec<Arc<dyn Sink>>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: Arc<dyn Sink>) {
        self.sinks.push(sink);
    }
}

impl Sink for Tee {
    fn record(&self, email: EmailRecord) {
        let Some((last, rest)) = self.sinks.split_last() else {
            return;
        };
        for sink in rest {
            sink.record(email.clone());
        }
        last.record(email);
    }
}
