use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};

use crate::sink::Sink;

use super::line::LineReader;
use super::state_machine::{StateMachine, Step};

/// One SMTP conversation.
///
/// Owns the connection and its state machine, and forwards accepted
/// messages to the sink.
pub struct Session<S> {
    lines: LineReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
    state_machine: StateMachine,
    sink: Arc<dyn Sink>,
}

impl<S: AsyncRead + AsyncWrite> Session<S> {
    pub fn new(stream: S, state_machine: StateMachine, sink: Arc<dyn Sink>) -> Self {
        let (reader, writer) = tokio::io::split(stream);

        Self {
            lines: LineReader::new(reader),
            writer,
            state_machine,
            sink,
        }
    }

    /// Run the session loop
    ///
    /// Returns once the client quits or the connection goes away. Read
    /// failures end the session quietly; only write failures are errors.
    pub async fn serve(mut self) -> Result<()> {
        self.writer
            .write_all(self.state_machine.greet())
            .await
            .context("failed to send greeting")?;
        self.writer.flush().await?;

        loop {
            let line = match self.lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    tracing::debug!("Received EOF");
                    break;
                }
                Err(err) => {
                    tracing::debug!(%err, "Read failed, ending session");
                    break;
                }
            };

            match self.state_machine.handle_smtp(&line) {
                Step::Silent => {}
                Step::Reply(reply) => self.reply(reply).await?,
                Step::Deliver(email) => {
                    tracing::info!(
                        sender = %email.sender,
                        recipients = email.recipients.len(),
                        bytes = email.raw_source.len(),
                        "Message accepted"
                    );
                    self.sink.record(email);
                    self.reply(StateMachine::ACCEPTED).await?;
                }
                Step::Close => {
                    self.reply(StateMachine::BYE).await?;
                    break;
                }
            }
        }

        if let Err(err) = self.writer.shutdown().await {
            tracing::trace!(%err, "shutdown after session end");
        }

        Ok(())
    }

    async fn reply(&mut self, reply: &[u8]) -> Result<()> {
        self.writer
            .write_all(reply)
            .await
            .context("failed to write reply")?;
        self.writer.flush().await.context("failed to flush reply")
    }
}
