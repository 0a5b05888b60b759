//! The two protocol sessions: the authenticated send loop and the
//! broadcast read loop.
//!
//! Each session owns exactly one [`Connection`] at a time and runs until an
//! I/O failure, which bubbles up for the supervisor to classify. Neither
//! session retries anything on its own.

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::channels::{ConnectionState, LivenessEvent, SessionRole, StatusEvent};
use crate::error::ClientError;
use crate::protocol;
use crate::supervisor::ClientConfig;
use crate::transport;

/// Run the sending session: register once if needed, authenticate, then
/// multiplex outbound messages and periodic pings over one socket.
///
/// `token` is filled in after a successful registration so later attempts
/// skip straight to authentication. Returns `Ok(())` only when the frontend
/// has dropped its outbound handle, which means the run is shutting down.
pub async fn run_send_session(
    config: &ClientConfig,
    token: &mut Option<String>,
    outbound_rx: &mut mpsc::UnboundedReceiver<String>,
    liveness_tx: &mpsc::UnboundedSender<LivenessEvent>,
    status_tx: &mpsc::UnboundedSender<StatusEvent>,
) -> Result<(), ClientError> {
    let token_value = match token {
        Some(t) => t.clone(),
        None => {
            let t = register_once(config, status_tx).await?;
            *token = Some(t.clone());
            t
        }
    };

    let mut conn =
        transport::connect(&config.host, config.send_port, config.connect_timeout).await?;
    protocol::read_greeting(&mut conn.reader).await?;
    let nickname = protocol::authenticate(&mut conn.reader, &mut conn.writer, &token_value).await?;
    tracing::info!(%nickname, "authenticated");

    let _ = status_tx.send(StatusEvent::Connection(
        SessionRole::Send,
        ConnectionState::Established,
    ));
    let _ = status_tx.send(StatusEvent::NicknameReceived(nickname));

    // The first tick fires immediately, so the connection proves itself
    // alive right after authentication.
    let mut ping = tokio::time::interval(config.ping_interval);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            maybe_msg = outbound_rx.recv() => {
                let Some(text) = maybe_msg else {
                    return Ok(());
                };
                protocol::send_message(&mut conn.writer, &text).await?;
                tracing::debug!(chars = text.len(), "message sent");
                let _ = liveness_tx.send(LivenessEvent::MessageSent);
            }
            _ = ping.tick() => {
                protocol::send_ping(&mut conn.writer).await?;
                // The server echoes one line for any write. A dead socket
                // surfaces here as an I/O error or EOF, so no separate
                // pong deadline is needed.
                protocol::read_raw_line(&mut conn.reader).await?;
                let _ = liveness_tx.send(LivenessEvent::PingOk);
            }
        }
    }
}

/// One registration round-trip on a dedicated connection, closed before the
/// long-lived send connection opens.
async fn register_once(
    config: &ClientConfig,
    status_tx: &mpsc::UnboundedSender<StatusEvent>,
) -> Result<String, ClientError> {
    tracing::info!(user_name = %config.user_name, "no token configured, registering");

    let mut conn =
        transport::connect(&config.host, config.send_port, config.connect_timeout).await?;
    protocol::read_greeting(&mut conn.reader).await?;
    let token = protocol::register(&mut conn.reader, &mut conn.writer, &config.user_name).await?;

    tracing::info!("registered, token issued");
    let _ = status_tx.send(StatusEvent::TokenRegistered(token.clone()));
    Ok(token)
}

/// Run the reading session: stream broadcast lines from the read port.
///
/// Every non-empty line goes to the display channel, the persistence
/// channel, and produces a liveness event. A read deadline expiring is a
/// failure of this attempt, not something to ride out in place.
pub async fn run_read_session(
    config: &ClientConfig,
    inbound_tx: &mpsc::UnboundedSender<String>,
    persist_tx: &mpsc::UnboundedSender<String>,
    liveness_tx: &mpsc::UnboundedSender<LivenessEvent>,
    status_tx: &mpsc::UnboundedSender<StatusEvent>,
) -> Result<(), ClientError> {
    let mut conn =
        transport::connect(&config.host, config.read_port, config.connect_timeout).await?;
    let _ = status_tx.send(StatusEvent::Connection(
        SessionRole::Read,
        ConnectionState::Established,
    ));

    loop {
        if let Some(line) = protocol::read_line(&mut conn.reader, config.read_timeout).await? {
            let _ = inbound_tx.send(line.clone());
            let _ = persist_tx.send(line);
            let _ = liveness_tx.send(LivenessEvent::MessageReceived);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    fn test_config(addr: SocketAddr) -> ClientConfig {
        ClientConfig {
            host: addr.ip().to_string(),
            send_port: addr.port(),
            read_port: addr.port(),
            token: None,
            user_name: "tester".to_string(),
            connect_timeout: Duration::from_secs(1),
            read_timeout: Duration::from_millis(200),
            watchdog_timeout: Duration::from_millis(500),
            ping_interval: Duration::from_millis(50),
            reconnect_interval: Duration::from_millis(20),
        }
    }

    /// Chat server double for the send port: greets, authenticates any
    /// token as "tester", then echoes a line per write (the keepalive ack).
    /// Counts how many connections chose registration mode.
    async fn spawn_send_server(registrations: Arc<AtomicUsize>) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(pair) => pair,
                    Err(_) => break,
                };
                let registrations = Arc::clone(&registrations);
                tokio::spawn(async move {
                    let (read_half, mut write_half) = stream.into_split();
                    let mut reader = BufReader::new(read_half);

                    write_half.write_all(b"Hello from chat\n").await.unwrap();

                    let mut first = String::new();
                    if reader.read_line(&mut first).await.unwrap() == 0 {
                        return;
                    }
                    if first == "\n" {
                        // Registration mode.
                        registrations.fetch_add(1, Ordering::SeqCst);
                        write_half.write_all(b"Enter nickname:\n").await.unwrap();
                        let mut name = String::new();
                        reader.read_line(&mut name).await.unwrap();
                        write_half
                            .write_all(b"{\"account_hash\": \"fresh-token\"}\n")
                            .await
                            .unwrap();
                        return;
                    }

                    // Auth mode: accept anything.
                    write_half
                        .write_all(b"{\"nickname\": \"tester\"}\n")
                        .await
                        .unwrap();

                    // Echo one line per client write.
                    loop {
                        let mut line = String::new();
                        match reader.read_line(&mut line).await {
                            Ok(0) | Err(_) => break,
                            Ok(_) => {
                                if write_half.write_all(b"ack\n").await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                });
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_send_session_registers_exactly_once_without_token() {
        let registrations = Arc::new(AtomicUsize::new(0));
        let addr = spawn_send_server(Arc::clone(&registrations)).await;
        let config = test_config(addr);

        let mut token = None;
        let (_outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (liveness_tx, _liveness_rx) = mpsc::unbounded_channel();
        let (status_tx, mut status_rx) = mpsc::unbounded_channel();

        // The session loops forever once active; give it time to get
        // through registration + auth, then stop looking.
        let session = tokio::time::timeout(
            Duration::from_millis(300),
            run_send_session(&config, &mut token, &mut outbound_rx, &liveness_tx, &status_tx),
        )
        .await;
        assert!(session.is_err(), "session should still be running when we stop it");

        assert_eq!(registrations.load(Ordering::SeqCst), 1);
        assert_eq!(token.as_deref(), Some("fresh-token"));

        let mut saw_token = false;
        let mut saw_nickname = false;
        while let Ok(event) = status_rx.try_recv() {
            match event {
                StatusEvent::TokenRegistered(t) => {
                    assert_eq!(t, "fresh-token");
                    saw_token = true;
                }
                StatusEvent::NicknameReceived(n) => {
                    assert_eq!(n, "tester");
                    saw_nickname = true;
                }
                _ => {}
            }
        }
        assert!(saw_token, "registration should be reported on the status channel");
        assert!(saw_nickname, "auth success should be reported on the status channel");
    }

    #[tokio::test]
    async fn test_send_session_skips_registration_with_token() {
        let registrations = Arc::new(AtomicUsize::new(0));
        let addr = spawn_send_server(Arc::clone(&registrations)).await;
        let config = test_config(addr);

        let mut token = Some("existing-token".to_string());
        let (_outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (liveness_tx, _liveness_rx) = mpsc::unbounded_channel();
        let (status_tx, _status_rx) = mpsc::unbounded_channel();

        let _ = tokio::time::timeout(
            Duration::from_millis(300),
            run_send_session(&config, &mut token, &mut outbound_rx, &liveness_tx, &status_tx),
        )
        .await;

        assert_eq!(registrations.load(Ordering::SeqCst), 0);
        assert_eq!(token.as_deref(), Some("existing-token"));
    }

    #[tokio::test]
    async fn test_send_session_writes_messages_and_pings_with_liveness() {
        let registrations = Arc::new(AtomicUsize::new(0));
        let addr = spawn_send_server(registrations).await;
        let config = test_config(addr);

        let mut token = Some("tok".to_string());
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (liveness_tx, mut liveness_rx) = mpsc::unbounded_channel();
        let (status_tx, _status_rx) = mpsc::unbounded_channel();

        outbound_tx.send("hi there".to_string()).unwrap();

        let _ = tokio::time::timeout(
            Duration::from_millis(300),
            run_send_session(&config, &mut token, &mut outbound_rx, &liveness_tx, &status_tx),
        )
        .await;

        let mut events = Vec::new();
        while let Ok(event) = liveness_rx.try_recv() {
            events.push(event);
        }
        assert!(
            events.contains(&LivenessEvent::MessageSent),
            "message send should produce liveness, got {events:?}"
        );
        assert!(
            events.contains(&LivenessEvent::PingOk),
            "pings should produce liveness, got {events:?}"
        );
    }

    #[tokio::test]
    async fn test_send_session_ends_cleanly_when_frontend_hangs_up() {
        let registrations = Arc::new(AtomicUsize::new(0));
        let addr = spawn_send_server(registrations).await;
        let mut config = test_config(addr);
        // Keep pings out of the way.
        config.ping_interval = Duration::from_secs(60);

        let mut token = Some("tok".to_string());
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (liveness_tx, _liveness_rx) = mpsc::unbounded_channel();
        let (status_tx, _status_rx) = mpsc::unbounded_channel();

        drop(outbound_tx);

        let result = tokio::time::timeout(
            Duration::from_secs(1),
            run_send_session(&config, &mut token, &mut outbound_rx, &liveness_tx, &status_tx),
        )
        .await
        .expect("session should notice the closed outbound channel");
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_auth_rejection_surfaces_from_send_session() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = stream.into_split();
            let mut reader = BufReader::new(read_half);

            write_half.write_all(b"Hello\n").await.unwrap();
            let mut token = String::new();
            reader.read_line(&mut token).await.unwrap();
            write_half.write_all(b"null\n").await.unwrap();
        });

        let config = test_config(addr);
        let mut token = Some("stale-token".to_string());
        let (_outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (liveness_tx, _liveness_rx) = mpsc::unbounded_channel();
        let (status_tx, _status_rx) = mpsc::unbounded_channel();

        let err = run_send_session(&config, &mut token, &mut outbound_rx, &liveness_tx, &status_tx)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::AuthRejected));
    }

    #[tokio::test]
    async fn test_read_session_forwards_lines_everywhere() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            stream.write_all(b"alice: hello\n").await.unwrap();
            stream.write_all(b"\n").await.unwrap(); // keepalive padding, dropped
            stream.write_all(b"bob: hi back\n").await.unwrap();
            // Hold the socket open so the session keeps waiting.
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let config = test_config(addr);
        let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel();
        let (persist_tx, mut persist_rx) = mpsc::unbounded_channel();
        let (liveness_tx, mut liveness_rx) = mpsc::unbounded_channel();
        let (status_tx, mut status_rx) = mpsc::unbounded_channel();

        let _ = tokio::time::timeout(
            Duration::from_millis(150),
            run_read_session(&config, &inbound_tx, &persist_tx, &liveness_tx, &status_tx),
        )
        .await;

        assert_eq!(inbound_rx.try_recv().ok().as_deref(), Some("alice: hello"));
        assert_eq!(inbound_rx.try_recv().ok().as_deref(), Some("bob: hi back"));
        assert!(inbound_rx.try_recv().is_err(), "blank line must not be forwarded");

        assert_eq!(persist_rx.try_recv().ok().as_deref(), Some("alice: hello"));
        assert_eq!(persist_rx.try_recv().ok().as_deref(), Some("bob: hi back"));

        assert_eq!(liveness_rx.try_recv().ok(), Some(LivenessEvent::MessageReceived));
        assert_eq!(liveness_rx.try_recv().ok(), Some(LivenessEvent::MessageReceived));

        assert_eq!(
            status_rx.try_recv().ok(),
            Some(StatusEvent::Connection(
                SessionRole::Read,
                ConnectionState::Established
            ))
        );
    }

    #[tokio::test]
    async fn test_read_session_times_out_on_silence() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            // Accept and say nothing.
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(stream);
        });

        let config = test_config(addr);
        let (inbound_tx, _inbound_rx) = mpsc::unbounded_channel();
        let (persist_tx, _persist_rx) = mpsc::unbounded_channel();
        let (liveness_tx, _liveness_rx) = mpsc::unbounded_channel();
        let (status_tx, _status_rx) = mpsc::unbounded_channel();

        let err = run_read_session(&config, &inbound_tx, &persist_tx, &liveness_tx, &status_tx)
            .await
            .unwrap_err();
        assert!(
            matches!(err, ClientError::ReadTimeout(_)),
            "silence past the deadline must fail the attempt, got {err}"
        );
    }

    #[tokio::test]
    async fn test_read_session_reports_closed_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            stream.write_all(b"last words\n").await.unwrap();
            // Socket drops here.
        });

        let config = test_config(addr);
        let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel();
        let (persist_tx, _persist_rx) = mpsc::unbounded_channel();
        let (liveness_tx, _liveness_rx) = mpsc::unbounded_channel();
        let (status_tx, _status_rx) = mpsc::unbounded_channel();

        let err = run_read_session(&config, &inbound_tx, &persist_tx, &liveness_tx, &status_tx)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::ConnectionClosed));
        assert_eq!(inbound_rx.try_recv().ok().as_deref(), Some("last words"));
    }
}
