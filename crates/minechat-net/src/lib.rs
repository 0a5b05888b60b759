//! Connection-supervision and protocol-session engine for the minechat
//! line-oriented TCP chat protocol.
//!
//! Two independent sockets — one streaming broadcast messages, one for
//! authentication and sending — run as supervised sessions that reconnect
//! with backoff on any transient failure and stop only when the server
//! rejects the credentials or speaks a different protocol.

pub mod channels;
pub mod error;
pub mod protocol;
pub mod session;
pub mod supervisor;
pub mod transport;
pub mod watchdog;

pub use channels::{
    ChatChannels, ConnectionState, FrontendChannels, LivenessEvent, SessionRole, StatusEvent,
    chat_channels,
};
pub use error::ClientError;
pub use supervisor::{ClientConfig, run_client};
pub use transport::Connection;
pub use watchdog::WATCHDOG_TARGET;
