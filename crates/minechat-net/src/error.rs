//! Error taxonomy for the chat client.
//!
//! The supervisor is the only component that makes retry decisions, so every
//! error boils down to one bit it inspects: transient (reconnect after the
//! backoff interval) or fatal (stop the run and surface to the caller).

use std::time::Duration;

/// Errors produced anywhere in the connection engine.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The TCP connect did not complete within the configured deadline.
    #[error("connect to {host}:{port} timed out after {timeout:?}")]
    ConnectTimeout {
        /// Host we tried to reach.
        host: String,
        /// Port we tried to reach.
        port: u16,
        /// The configured connect deadline.
        timeout: Duration,
    },

    /// The server actively refused the connection.
    #[error("connection to {host}:{port} refused")]
    ConnectRefused {
        /// Host we tried to reach.
        host: String,
        /// Port we tried to reach.
        port: u16,
    },

    /// The hostname did not resolve to any address.
    #[error("failed to resolve host {host}")]
    DnsFailure {
        /// The hostname that failed to resolve.
        host: String,
    },

    /// No line arrived on the read socket within the configured deadline.
    #[error("no line received within {0:?}")]
    ReadTimeout(Duration),

    /// The peer closed the connection (EOF on a line read).
    #[error("server closed the connection")]
    ConnectionClosed,

    /// A read or write on an established socket failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The watchdog saw no liveness event within its window.
    #[error("no liveness event within {0:?}")]
    WatchdogTimeout(Duration),

    /// A handshake response was not the JSON the protocol calls for.
    #[error("malformed server response during {context}: {detail}")]
    ProtocolParse {
        /// Which handshake step produced the bad line.
        context: &'static str,
        /// What was wrong with it.
        detail: String,
    },

    /// The server explicitly rejected the auth token.
    #[error("server rejected the auth token")]
    AuthRejected,
}

impl ClientError {
    /// Whether the supervisor should stop permanently instead of reconnecting.
    ///
    /// A rejected token can only be fixed by the user, and a handshake line
    /// that fails to parse means the server speaks a different protocol;
    /// retrying either would loop forever without progress. Everything else
    /// is a flavor of "connection lost" and is retried after backoff.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AuthRejected | Self::ProtocolParse { .. })
    }
}
