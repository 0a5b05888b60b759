//! Channel fabric decoupling the core from its collaborators.
//!
//! The core and the frontend (display, history writer, input, status
//! consumer) never share mutable state; everything crosses one of these
//! queues. Within the core, the outbound and liveness channels are the only
//! cross-task state, and each has a single consumer, so ordering needs no
//! extra coordination.

use tokio::sync::mpsc;

/// Connection lifecycle state, reported independently for each socket role.
///
/// Transitions are one-directional within a connection attempt; a new
/// attempt restarts at [`ConnectionState::Initiated`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// A connection attempt has started.
    Initiated,
    /// The socket is open and the session is active.
    Established,
    /// The attempt ended; the socket is closed.
    Closed,
}

/// Which of the two sockets a state change refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRole {
    /// The authenticated sending socket.
    Send,
    /// The unauthenticated broadcast-reading socket.
    Read,
}

/// Events surfaced to the status collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// A connection state transition for one socket role.
    Connection(SessionRole, ConnectionState),
    /// Authentication succeeded under this nickname.
    NicknameReceived(String),
    /// Registration issued this token; the collaborator persists it.
    TokenRegistered(String),
}

/// Liveness signals produced by the sessions, consumed only by the watchdog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessEvent {
    /// A ping went out and the server echoed back.
    PingOk,
    /// An outbound chat message was written.
    MessageSent,
    /// A broadcast line arrived on the read socket.
    MessageReceived,
}

impl std::fmt::Display for LivenessEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::PingOk => "Connection is alive. Ping message was successful",
            Self::MessageSent => "Connection is alive. Message sent",
            Self::MessageReceived => "Connection is alive. New message in chat",
        };
        f.write_str(text)
    }
}

/// The core's side of the fabric, consumed by [`crate::supervisor::run_client`].
///
/// Holds the receiving ends of the channels the core consumes (outbound,
/// liveness) and the sending ends of the channels it produces. Receivers
/// are borrowed, not moved, by each connection attempt, so queued outbound
/// messages survive a reconnect.
pub struct ChatChannels {
    /// Messages submitted by the frontend, written to the wire in order.
    pub outbound_rx: mpsc::UnboundedReceiver<String>,
    /// Incoming chat lines, for display.
    pub inbound_tx: mpsc::UnboundedSender<String>,
    /// Incoming chat lines, for history persistence.
    pub persist_tx: mpsc::UnboundedSender<String>,
    /// Connection state changes and auth/registration notices.
    pub status_tx: mpsc::UnboundedSender<StatusEvent>,
    /// Liveness producer handle, cloned into both sessions.
    pub liveness_tx: mpsc::UnboundedSender<LivenessEvent>,
    /// Liveness consumer, owned by the watchdog.
    pub liveness_rx: mpsc::UnboundedReceiver<LivenessEvent>,
}

/// The frontend's side of the fabric.
pub struct FrontendChannels {
    /// Submit a chat message for sending.
    pub outbound_tx: mpsc::UnboundedSender<String>,
    /// Receive incoming chat lines for display.
    pub inbound_rx: mpsc::UnboundedReceiver<String>,
    /// Receive incoming chat lines for history persistence.
    pub persist_rx: mpsc::UnboundedReceiver<String>,
    /// Receive status events.
    pub status_rx: mpsc::UnboundedReceiver<StatusEvent>,
}

/// Build the connected core/frontend channel pair.
pub fn chat_channels() -> (ChatChannels, FrontendChannels) {
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (persist_tx, persist_rx) = mpsc::unbounded_channel();
    let (status_tx, status_rx) = mpsc::unbounded_channel();
    let (liveness_tx, liveness_rx) = mpsc::unbounded_channel();

    let core = ChatChannels {
        outbound_rx,
        inbound_tx,
        persist_tx,
        status_tx,
        liveness_tx,
        liveness_rx,
    };
    let frontend = FrontendChannels {
        outbound_tx,
        inbound_rx,
        persist_rx,
        status_rx,
    };
    (core, frontend)
}
