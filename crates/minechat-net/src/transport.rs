//! TCP transport: connect with a deadline and classify connection failures.
//!
//! Name resolution is done explicitly so a DNS failure is distinguishable
//! from a refused or timed-out connect; the supervisor treats them the same
//! today, but the user-facing message differs.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::error::ClientError;

/// One open duplex connection, split for independent reading and writing.
///
/// Owned exclusively by the session loop that opened it. Dropping it closes
/// the socket, which is how every exit path — error or cancellation —
/// releases the handle.
#[derive(Debug)]
pub struct Connection {
    /// Buffered read half; the protocol is line-oriented.
    pub reader: BufReader<OwnedReadHalf>,
    /// Write half.
    pub writer: OwnedWriteHalf,
}

/// Open a TCP connection to `host:port`, failing after `timeout`.
pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<Connection, ClientError> {
    tracing::debug!(host, port, "connecting");

    let addr = resolve(host, port).await?;
    let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| ClientError::ConnectTimeout {
            host: host.to_string(),
            port,
            timeout,
        })?
        .map_err(|e| classify_connect_error(e, host, port))?;
    stream.set_nodelay(true)?;

    tracing::debug!(host, port, "connected");
    let (reader, writer) = stream.into_split();
    Ok(Connection {
        reader: BufReader::new(reader),
        writer,
    })
}

/// Resolve `host:port` to the first address, mapping failure to [`ClientError::DnsFailure`].
async fn resolve(host: &str, port: u16) -> Result<SocketAddr, ClientError> {
    let mut addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|_| ClientError::DnsFailure {
            host: host.to_string(),
        })?;
    addrs.next().ok_or_else(|| ClientError::DnsFailure {
        host: host.to_string(),
    })
}

fn classify_connect_error(err: io::Error, host: &str, port: u16) -> ClientError {
    if err.kind() == io::ErrorKind::ConnectionRefused {
        ClientError::ConnectRefused {
            host: host.to_string(),
            port,
        }
    } else {
        ClientError::Io(err)
    }
}
