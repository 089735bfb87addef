use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use tokio::net::{TcpListener, ToSocketAddrs};

use crate::sink::Sink;

use super::session::Session;
use super::state_machine::{Sequencing, StateMachine};

/// Settings shared by every session of a listener.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Name announced in the `220` greeting.
    pub service_name: String,
    pub sequencing: Sequencing,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            service_name: "mailcatch".to_string(),
            sequencing: Sequencing::default(),
        }
    }
}

/// SMTP server
///
/// Accepts connections and runs one [`Session`] per connection on its own
/// task. Every session hands its messages to the same sink.
pub struct Server {
    listener: TcpListener,
    config: SessionConfig,
    sink: Arc<dyn Sink>,
}

impl Server {
    pub async fn bind(
        addr: impl ToSocketAddrs,
        config: SessionConfig,
        sink: Arc<dyn Sink>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .context("failed to bind SMTP listener")?;

        Ok(Self {
            listener,
            config,
            sink,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().map_err(Into::into)
    }

    /// Run the accept loop
    ///
    /// Accept errors are logged and do not stop the server.
    pub async fn run(self) -> Result<()> {
        tracing::info!("SMTP server listening on {}", self.local_addr()?);

        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    tracing::error!(%err, "Failed to accept connection");
                    continue;
                }
            };

            let state_machine =
                StateMachine::new(&self.config.service_name, self.config.sequencing);
            let session = Session::new(stream, state_machine, Arc::clone(&self.sink));

            tokio::spawn(async move {
                tracing::debug!(%peer, "Connection opened");
                if let Err(err) = session.serve().await {
                    tracing::debug!(%peer, ?err, "Session ended with error");
                }
                tracing::debug!(%peer, "Connection closed");
            });
        }
    }
}
