//! Terminal entry point for the minechat client.
//!
//! Thin collaborators around the connection engine: config loading with CLI
//! overrides, history replay and append, stdin as the message source,
//! stdout as the display, and a status consumer that logs state changes and
//! persists a freshly registered token.

mod history;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;

use minechat_config::{CliArgs, Config, default_config_dir};
use minechat_net::{
    ClientConfig, ClientError, FrontendChannels, StatusEvent, chat_channels, run_client,
};

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config_dir = match args.config.clone().map_or_else(default_config_dir, Ok) {
        Ok(dir) => dir,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    let mut config = match Config::load_or_create(&config_dir) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    config.apply_cli_overrides(&args);
    minechat_log::init_logging(&config.debug.log_level);

    // Show where the last session left off before going online.
    match history::replay(&config.history.path).await {
        Ok(saved) => {
            for line in saved {
                println!("{line}");
            }
        }
        Err(err) => tracing::warn!(error = %err, "could not replay history"),
    }

    let (core, frontend) = chat_channels();
    let FrontendChannels {
        outbound_tx,
        mut inbound_rx,
        persist_rx,
        status_rx,
    } = frontend;

    let display = tokio::spawn(async move {
        while let Some(line) = inbound_rx.recv().await {
            println!("{line}");
        }
    });
    let writer = tokio::spawn(history::writer_task(config.history.path.clone(), persist_rx));
    let status = tokio::spawn(status_task(status_rx, config_dir));
    let input = tokio::spawn(input_task(outbound_tx));

    let result = tokio::select! {
        result = run_client(client_config(&config), core) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted, exiting");
            Ok(())
        }
    };

    for task in [display, writer, status, input] {
        task.abort();
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(ClientError::AuthRejected) => {
            eprintln!(
                "The server did not recognize the auth token. Remove it from the \
                 config or register a new account with minechat-register."
            );
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

/// Map the persisted settings onto the engine's run config.
fn client_config(config: &Config) -> ClientConfig {
    ClientConfig {
        host: config.connection.host.clone(),
        read_port: config.connection.read_port,
        send_port: config.connection.send_port,
        token: config.connection.token.clone(),
        user_name: config.connection.user_name.clone(),
        connect_timeout: Duration::from_secs(config.timing.connect_timeout_secs),
        read_timeout: Duration::from_secs(config.timing.read_timeout_secs),
        watchdog_timeout: Duration::from_secs(config.timing.watchdog_timeout_secs),
        ping_interval: Duration::from_secs(config.timing.ping_interval_secs),
        reconnect_interval: Duration::from_secs(config.timing.reconnect_interval_secs),
    }
}

/// Log connection state changes and persist a freshly registered token.
async fn status_task(mut status_rx: mpsc::UnboundedReceiver<StatusEvent>, config_dir: PathBuf) {
    while let Some(event) = status_rx.recv().await {
        match event {
            StatusEvent::Connection(role, state) => {
                tracing::info!(?role, ?state, "connection state changed");
            }
            StatusEvent::NicknameReceived(nickname) => {
                tracing::info!(%nickname, "chatting as");
            }
            StatusEvent::TokenRegistered(token) => {
                match Config::save_token(&config_dir, &token) {
                    Ok(()) => tracing::info!("new token saved to config"),
                    Err(err) => tracing::error!(error = %err, "could not persist token"),
                }
            }
        }
    }
}

/// Feed stdin lines into the outbound channel. Ends on EOF, dropping the
/// sender, which the engine takes as a clean shutdown request.
async fn input_task(outbound_tx: mpsc::UnboundedSender<String>) {
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        if outbound_tx.send(line).is_err() {
            break;
        }
    }
}
