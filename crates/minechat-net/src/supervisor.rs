//! Top-level supervision: run connection attempts forever, reconnecting
//! after transient failures and stopping on fatal ones.
//!
//! One connection attempt is the linked unit {send session, read session,
//! watchdog}. The three run as futures joined by `select!`, so the first
//! one to fail cancels the siblings by drop — their transports close with
//! them — before the backoff sleep begins. Nothing below this module
//! retries anything.

use std::time::Duration;

use crate::channels::{ChatChannels, ConnectionState, SessionRole, StatusEvent};
use crate::error::ClientError;
use crate::{session, watchdog};

/// Everything the engine needs to run, fixed for the lifetime of one
/// [`run_client`] call. Only the token ever changes, and that happens at
/// most once, inside the engine, right after registration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Chat server hostname.
    pub host: String,
    /// Port streaming broadcast messages.
    pub read_port: u16,
    /// Port accepting authentication and outgoing messages.
    pub send_port: u16,
    /// Auth token; `None` triggers a one-time registration.
    pub token: Option<String>,
    /// Display name used if registration is needed.
    pub user_name: String,
    /// Deadline for establishing a TCP connection.
    pub connect_timeout: Duration,
    /// Deadline for each broadcast line read.
    pub read_timeout: Duration,
    /// Longest tolerated gap between liveness events.
    pub watchdog_timeout: Duration,
    /// Delay between keepalive pings on the send socket.
    pub ping_interval: Duration,
    /// Fixed backoff between failed connection attempts.
    pub reconnect_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "minechat.dvmn.org".to_string(),
            read_port: 5000,
            send_port: 5050,
            token: None,
            user_name: "anonymous".to_string(),
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(120),
            watchdog_timeout: Duration::from_secs(120),
            ping_interval: Duration::from_secs(60),
            reconnect_interval: Duration::from_secs(5),
        }
    }
}

/// Run the client until a fatal error or a clean frontend shutdown.
///
/// Per attempt: emit Initiated for both roles, run the linked unit, emit
/// Closed for both roles, then classify. Transient failures sleep the
/// backoff interval and start over; [`ClientError::AuthRejected`] and
/// [`ClientError::ProtocolParse`] stop the run and surface to the caller.
pub async fn run_client(
    config: ClientConfig,
    mut channels: ChatChannels,
) -> Result<(), ClientError> {
    let mut token = config.token.clone();

    loop {
        emit_both(&channels, ConnectionState::Initiated);

        let outcome = run_attempt(&config, &mut token, &mut channels).await;

        emit_both(&channels, ConnectionState::Closed);

        match outcome {
            Ok(()) => {
                tracing::info!("frontend hung up, shutting down");
                return Ok(());
            }
            Err(err) if err.is_fatal() => {
                tracing::error!(error = %err, "fatal error, giving up");
                return Err(err);
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    backoff = ?config.reconnect_interval,
                    "connection lost, reconnecting"
                );
            }
        }

        tokio::time::sleep(config.reconnect_interval).await;
    }
}

/// One connection attempt: the three children race, the first to finish
/// wins and the rest are dropped mid-await, closing their sockets.
async fn run_attempt(
    config: &ClientConfig,
    token: &mut Option<String>,
    channels: &mut ChatChannels,
) -> Result<(), ClientError> {
    tokio::select! {
        result = session::run_send_session(
            config,
            token,
            &mut channels.outbound_rx,
            &channels.liveness_tx,
            &channels.status_tx,
        ) => result,
        result = session::run_read_session(
            config,
            &channels.inbound_tx,
            &channels.persist_tx,
            &channels.liveness_tx,
            &channels.status_tx,
        ) => result,
        result = watchdog::run_watchdog(config.watchdog_timeout, &mut channels.liveness_rx) => result,
    }
}

fn emit_both(channels: &ChatChannels, state: ConnectionState) {
    let _ = channels
        .status_tx
        .send(StatusEvent::Connection(SessionRole::Send, state));
    let _ = channels
        .status_tx
        .send(StatusEvent::Connection(SessionRole::Read, state));
}
