pub mod config;
pub mod database;
pub mod mime;
pub mod notify;
pub mod sink;
pub mod smtp;

use chrono::{DateTime, Utc};

/// A message accepted at the end of a DATA phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailRecord {
    pub sender: String,
    pub recipients: Vec<String>,
    pub subject: String,
    pub plain_body: String,
    pub html_body: String,
    /// Bytes the client sent between `DATA` and the final `.`, with dot
    /// stuffing removed.
    pub raw_source: Vec<u8>,
    pub received_at: DateTime<Utc>,
}

impl EmailRecord {
    /// Decode `raw_source` and stamp the record with the current time.
    pub fn new(sender: String, recipients: Vec<String>, raw_source: impl Into<Vec<u8>>) -> Self {
        let raw_source = raw_source.into();
        let mime::Decoded {
            subject,
            plain,
            html,
        } = mime::decode(&raw_source);

        Self {
            sender,
            recipients,
            subject,
            plain_body: plain,
            html_body: html,
            raw_source,
            received_at: Utc::now(),
        }
    }
}
