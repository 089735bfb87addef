use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::smtp::{Sequencing, SessionConfig};

/// Disposable SMTP inbox for development and tests.
///
/// Every option can also be given through the environment variable shown
/// next to it.
#[derive(Debug, Clone, Parser)]
#[command(name = "mailcatch", version, about)]
pub struct Config {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    #[arg(long, env = "SMTP_PORT", default_value_t = 2525)]
    pub smtp_port: u16,

    /// Name announced in the SMTP greeting.
    #[arg(long, env = "SERVICE_NAME", default_value = "mailcatch")]
    pub service_name: String,

    /// libsql database URL; a file in the temp directory when unset.
    #[arg(long, env = "LIBSQL_CLIENT_URL")]
    pub db_url: Option<String>,

    /// Delete all stored mail when the server shuts down.
    #[arg(long, env = "CLEAR_ON_SHUTDOWN", default_value_t = true, action = ArgAction::Set)]
    pub clear_on_shutdown: bool,

    /// Reject RCPT before MAIL and DATA before RCPT with 503.
    #[arg(long, env = "STRICT_ORDERING")]
    pub strict_ordering: bool,

    /// How many new-mail notifications a slow subscriber may fall behind.
    #[arg(long, env = "NOTIFY_CAPACITY", default_value_t = 100)]
    pub notify_capacity: usize,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Also write logs to this file.
    #[arg(long, env = "LOG_PATH")]
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn smtp_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.smtp_port)
    }

    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            service_name: self.service_name.clone(),
            sequencing: if self.strict_ordering {
                Sequencing::Strict
            } else {
                Sequencing::Permissive
            },
        }
    }
}
