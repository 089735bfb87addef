use anyhow::{Context, Result};
use libsql_client::{args, Statement};
use tokio::sync::mpsc;

use crate::{sink::Sink, EmailRecord};

pub struct Client {
    db: libsql_client::client::Client,
}

impl Client {
    /// Create a new database client.
    ///
    /// `url` takes precedence over the `LIBSQL_CLIENT_URL` environment
    /// variable. If neither is set, fallback to a local database in the
    /// temp directory.
    ///
    /// The `mail` table will be created on startup if it has not been created
    /// earlier.
    pub async fn new(url: Option<&str>) -> Result<Self> {
        if let Some(url) = url {
            std::env::set_var("LIBSQL_CLIENT_URL", url);
        } else if std::env::var("LIBSQL_CLIENT_URL").is_err() {
            let mut db_path = std::env::temp_dir();
            db_path.push("mailcatch.db");

            let db_path = db_path.display();
            tracing::warn!(
                "LIBSQL_CLIENT_URL not set, using default local database {}",
                db_path
            );
            std::env::set_var("LIBSQL_CLIENT_URL", format!("file://{}", db_path));
        }

        let db = libsql_client::client::Client::from_env()
            .await
            .context("failed to open mail database")?;
        db.batch([
            "CREATE TABLE IF NOT EXISTS mail (id INTEGER PRIMARY KEY AUTOINCREMENT, date text, sender text, recipients text, subject text, body text, html text, raw blob)",
            "CREATE INDEX IF NOT EXISTS mail_date ON mail(date)",
            "CREATE INDEX IF NOT EXISTS mail_recipients ON mail(recipients)",
        ])
        .await?;

        Ok(Self { db })
    }

    pub async fn insert(&self, mail: &EmailRecord) -> Result<()> {
        self.db
            .execute(Statement::with_args(
                "INSERT INTO mail (date, sender, recipients, subject, body, html, raw) VALUES (?, ?, ?, ?, ?, ?, ?)",
                args!(
                    mail.received_at.to_rfc3339(),
                    mail.sender.clone(),
                    mail.recipients.join(", "),
                    mail.subject.clone(),
                    mail.plain_body.clone(),
                    mail.html_body.clone(),
                    mail.raw_source.clone(),
                ),
            ))
            .await
            .context("failed to insert mail")?;

        Ok(())
    }

    /// Delete every stored message.
    pub async fn clear(&self) -> Result<()> {
        self.db
            .execute("DELETE FROM mail")
            .await
            .context("failed to clear mail table")?;

        Ok(())
    }
}

/// Sink half of the store: queues messages for the [`Writer`].
#[derive(Clone)]
pub struct Store {
    tx: mpsc::UnboundedSender<EmailRecord>,
}

impl Sink for Store {
    fn record(&self, email: EmailRecord) {
        self.tx.record(email)
    }
}

/// Owns the database client and writes queued messages one at a time.
pub struct Writer {
    db: Client,
    rx: mpsc::UnboundedReceiver<EmailRecord>,
}

/// Split a client into a [`Store`] that sessions can share and the
/// [`Writer`] that drains it.
pub fn channel(db: Client) -> (Store, Writer) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Store { tx }, Writer { db, rx })
}

impl Writer {
    /// Store messages until every [`Store`] handle has been dropped.
    ///
    /// A failed insert is logged and the message is lost.
    pub async fn run(&mut self) {
        while let Some(mail) = self.rx.recv().await {
            self.store(&mail).await;
        }
    }

    /// Store whatever is already queued without waiting for more.
    pub async fn flush(&mut self) {
        while let Ok(mail) = self.rx.try_recv() {
            self.store(&mail).await;
        }
    }

    /// Drop queued messages and empty the table.
    pub async fn clear(&mut self) -> Result<()> {
        while self.rx.try_recv().is_ok() {}
        self.db.clear().await
    }

    async fn store(&self, mail: &EmailRecord) {
        match self.db.insert(mail).await {
            Ok(()) => tracing::debug!("Stored mail from {}", mail.sender),
            Err(err) => tracing::error!(?err, "Failed to store mail"),
        }
    }
}
