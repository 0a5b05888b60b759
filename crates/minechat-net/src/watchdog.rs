//! Liveness watchdog for one connection attempt.
//!
//! Both sessions push a [`LivenessEvent`] whenever the connection provably
//! did something (ping acked, message sent, message received). The watchdog
//! waits on that stream with a timeout; silence longer than the window means
//! the connection is dead even if no socket call has failed yet.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::channels::LivenessEvent;
use crate::error::ClientError;

/// Tracing target for the liveness log; `minechat-log` gives this target
/// its own bare output format.
pub const WATCHDOG_TARGET: &str = "watchdog";

/// Consume liveness events until `timeout` elapses without one.
///
/// Every event is logged on [`WATCHDOG_TARGET`] and resets the window.
/// Returns `Err(WatchdogTimeout)` on a silent gap — a transient failure the
/// supervisor treats like any lost connection. Returns `Ok(())` only when
/// every producer handle is gone, i.e. the run is shutting down.
pub async fn run_watchdog(
    timeout: Duration,
    liveness_rx: &mut mpsc::UnboundedReceiver<LivenessEvent>,
) -> Result<(), ClientError> {
    loop {
        match tokio::time::timeout(timeout, liveness_rx.recv()).await {
            Ok(Some(event)) => tracing::info!(target: "watchdog", "{event}"),
            Ok(None) => return Ok(()),
            Err(_) => return Err(ClientError::WatchdogTimeout(timeout)),
        }
    }
}
