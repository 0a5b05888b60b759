//! Line codec for the chat protocol.
//!
//! Everything on the wire is newline-delimited UTF-8 text:
//!
//! ```text
//! server -> client   one greeting line on connect
//! client -> server   ""            enter registration mode
//! client -> server   "<name>"      register; reply {"account_hash": "..."}
//! client -> server   "<token>"     authenticate; reply {"nickname": "..."} or null
//! client -> server   "<line>\n"    chat line, terminated by a blank line
//! client -> server   ""            ping; the server echoes a line back
//! ```
//!
//! A chat message is split on its internal line breaks and every resulting
//! line is written with a double newline, so message content can never
//! inject a premature frame terminator.

use std::time::Duration;

use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ClientError;

/// Server reply to a successful registration.
#[derive(Debug, Deserialize)]
struct RegisterResponse {
    account_hash: String,
}

/// Consume the single line the server sends on connect. Logged, never acted on.
pub async fn read_greeting<R>(reader: &mut R) -> Result<(), ClientError>
where
    R: AsyncBufRead + Unpin,
{
    let line = read_raw_line(reader).await?;
    tracing::debug!(greeting = line.trim_end(), "server greeting");
    Ok(())
}

/// Run one registration round-trip and return the issued token.
///
/// An empty first line switches the server into registration mode; it then
/// prompts for a display name and replies with JSON carrying `account_hash`.
pub async fn register<R, W>(
    reader: &mut R,
    writer: &mut W,
    display_name: &str,
) -> Result<String, ClientError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    writer.write_all(b"\n").await?;
    writer.flush().await?;

    let prompt = read_raw_line(reader).await?;
    tracing::debug!(prompt = prompt.trim_end(), "registration prompt");

    // The name goes on the wire as a single line; embedded breaks would be
    // read as the name plus a stray chat frame.
    let name = display_name.lines().next().unwrap_or("").trim();
    writer.write_all(format!("{name}\n").as_bytes()).await?;
    writer.flush().await?;

    let response = read_raw_line(reader).await?;
    let parsed: RegisterResponse =
        serde_json::from_str(response.trim_end()).map_err(|e| ClientError::ProtocolParse {
            context: "registration",
            detail: e.to_string(),
        })?;
    Ok(parsed.account_hash)
}

/// Authenticate with an existing token and return the account's nickname.
///
/// The server answers JSON `null` (some deployments an empty object) when
/// it does not recognize the token; that is [`ClientError::AuthRejected`],
/// the one error the supervisor never retries. Any other well-formed reply
/// must carry a `nickname`.
pub async fn authenticate<R, W>(
    reader: &mut R,
    writer: &mut W,
    token: &str,
) -> Result<String, ClientError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    writer.write_all(format!("{token}\n").as_bytes()).await?;
    writer.flush().await?;

    let response = read_raw_line(reader).await?;
    let parsed: serde_json::Value =
        serde_json::from_str(response.trim_end()).map_err(|e| ClientError::ProtocolParse {
            context: "authentication",
            detail: e.to_string(),
        })?;
    if is_rejection(&parsed) {
        return Err(ClientError::AuthRejected);
    }
    match parsed.get("nickname").and_then(serde_json::Value::as_str) {
        Some(nickname) => Ok(nickname.to_string()),
        None => Err(ClientError::ProtocolParse {
            context: "authentication",
            detail: "reply carries no nickname".to_string(),
        }),
    }
}

/// A reply with no content in it means the token was not recognized.
fn is_rejection(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Object(map) => map.is_empty(),
        serde_json::Value::Array(items) => items.is_empty(),
        serde_json::Value::String(text) => text.is_empty(),
        _ => false,
    }
}

/// Write one chat message.
///
/// The message is split on line breaks and each line is terminated with a
/// blank line, the server's message delimiter. `"a\nb"` therefore goes out
/// as two frames, `"a\n\n"` then `"b\n\n"`.
pub async fn send_message<W>(writer: &mut W, text: &str) -> Result<(), ClientError>
where
    W: AsyncWrite + Unpin,
{
    for line in text.lines() {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n\n").await?;
    }
    writer.flush().await?;
    Ok(())
}

/// Write a bare newline. The server echoes a line in response to any write,
/// which the send session uses as a keepalive ack.
pub async fn send_ping<W>(writer: &mut W) -> Result<(), ClientError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

/// Read one broadcast line, bounded by `timeout`.
///
/// Returns `None` for a blank line — the server's keepalive padding, never
/// forwarded downstream. EOF is [`ClientError::ConnectionClosed`], a
/// transient failure the supervisor handles like any other lost connection.
pub async fn read_line<R>(reader: &mut R, timeout: Duration) -> Result<Option<String>, ClientError>
where
    R: AsyncBufRead + Unpin,
{
    let line = tokio::time::timeout(timeout, read_raw_line(reader))
        .await
        .map_err(|_| ClientError::ReadTimeout(timeout))??;
    let text = line.trim_end_matches(['\r', '\n']);
    if text.is_empty() {
        Ok(None)
    } else {
        Ok(Some(text.to_string()))
    }
}

/// Read one newline-terminated line, erroring on EOF.
pub(crate) async fn read_raw_line<R>(reader: &mut R) -> Result<String, ClientError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let n = reader.read_line(&mut line).await?;
    if n == 0 {
        return Err(ClientError::ConnectionClosed);
    }
    Ok(line)
}
