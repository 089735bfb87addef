use crate::EmailRecord;

use super::data::DataCollector;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    Fresh,
    Ready,
    MailSet,
    RcptSet,
    ReceivingData(DataCollector),
    Closed,
}

/// Sender and recipients of the transaction in progress.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub sender: Option<String>,
    pub recipients: Vec<String>,
}

/// How strictly MAIL, RCPT and DATA must follow each other.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Sequencing {
    /// Any order is accepted.
    #[default]
    Permissive,
    /// RCPT needs a sender and DATA needs a recipient, otherwise `503`.
    Strict,
}

/// What the connection has to do after a line was handled.
#[derive(Debug)]
pub enum Step {
    Reply(&'static [u8]),
    /// Nothing to send, read the next line.
    Silent,
    /// Hand the message to the sink, then send [`StateMachine::ACCEPTED`].
    Deliver(EmailRecord),
    /// Send [`StateMachine::BYE`] and close the connection.
    Close,
}

/// State machine which is capable of handling SMTP commands
/// for receiving mail.
///
/// # Usage
///
/// Send `greet` once, then feed every received line to `handle_smtp`.
pub struct StateMachine {
    pub state: State,
    pub envelope: Envelope,
    sequencing: Sequencing,
    greeting: String,
}

impl StateMachine {
    pub const HELLO: &'static [u8] = b"250 Hello\r\n";
    pub const OK: &'static [u8] = b"250 OK\r\n";
    pub const SEND_DATA: &'static [u8] = b"354 Start mail input; end with <CRLF>.<CRLF>\r\n";
    pub const ACCEPTED: &'static [u8] = b"250 OK: Message accepted\r\n";
    pub const BYE: &'static [u8] = b"221 Bye\r\n";
    pub const SYNTAX_ERROR: &'static [u8] = b"501 Syntax error\r\n";
    pub const NOT_IMPLEMENTED: &'static [u8] = b"502 Command not implemented\r\n";
    pub const BAD_SEQUENCE: &'static [u8] = b"503 Bad sequence of commands\r\n";

    pub fn new(service_name: impl AsRef<str>, sequencing: Sequencing) -> Self {
        Self {
            state: State::Fresh,
            envelope: Envelope::default(),
            sequencing,
            greeting: format!("220 {} ready\r\n", service_name.as_ref()),
        }
    }

    /// The `220` banner. Moves a fresh session to `Ready`.
    pub fn greet(&mut self) -> &[u8] {
        if self.state == State::Fresh {
            self.state = State::Ready;
        }
        self.greeting.as_bytes()
    }

    /// Handle a single line received from the client.
    pub fn handle_smtp(&mut self, line: &[u8]) -> Step {
        if let State::ReceivingData(collector) = &mut self.state {
            if !collector.push(line) {
                return Step::Silent;
            }
            tracing::trace!("End of data after {} bytes", collector.len());
            let raw = std::mem::take(collector).into_data();
            return self.deliver(raw);
        }

        let line = String::from_utf8_lossy(line);
        let Some(command) = line.split_ascii_whitespace().next() else {
            return Step::Silent;
        };
        tracing::trace!("Received {} in state {:?}", line.trim_end(), self.state);

        match command.to_ascii_uppercase().as_str() {
            "HELO" | "EHLO" => Step::Reply(Self::HELLO),
            "MAIL" => match angle_span(&line) {
                Some(sender) => {
                    tracing::debug!("FROM: {}", sender);
                    self.envelope.sender = Some(sender);
                    self.state = State::MailSet;
                    Step::Reply(Self::OK)
                }
                None => Step::Reply(Self::SYNTAX_ERROR),
            },
            "RCPT" => {
                if self.sequencing == Sequencing::Strict && self.envelope.sender.is_none() {
                    return Step::Reply(Self::BAD_SEQUENCE);
                }
                match angle_span(&line) {
                    Some(recipient) => {
                        tracing::debug!("TO: {}", recipient);
                        self.envelope.recipients.push(recipient);
                        self.state = State::RcptSet;
                        Step::Reply(Self::OK)
                    }
                    None => Step::Reply(Self::SYNTAX_ERROR),
                }
            }
            "DATA" => {
                if self.sequencing == Sequencing::Strict && self.envelope.recipients.is_empty() {
                    return Step::Reply(Self::BAD_SEQUENCE);
                }
                self.state = State::ReceivingData(DataCollector::default());
                Step::Reply(Self::SEND_DATA)
            }
            "RSET" => {
                self.reset();
                Step::Reply(Self::OK)
            }
            "NOOP" => Step::Reply(Self::OK),
            "QUIT" => {
                self.state = State::Closed;
                Step::Close
            }
            _ => Step::Reply(Self::NOT_IMPLEMENTED),
        }
    }

    /// Forget the current transaction.
    pub fn reset(&mut self) {
        self.envelope = Envelope::default();
        self.state = State::Ready;
    }

    fn deliver(&mut self, raw: Vec<u8>) -> Step {
        let Envelope { sender, recipients } = std::mem::take(&mut self.envelope);
        self.reset();

        Step::Deliver(EmailRecord::new(sender.unwrap_or_default(), recipients, raw))
    }
}

/// Text between the first `<` and the first `>` of a line.
fn angle_span(line: &str) -> Option<String> {
    let start = line.find('<')?;
    let end = line.find('>')?;

    (end > start).then(|| line[start + 1..end].to_string())
}
