//! Standalone account registration.
//!
//! One registration round-trip against the send port: prints the issued
//! token and writes it into the config file so the client picks it up on
//! its next start.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use minechat_config::{Config, default_config_dir};
use minechat_net::{ClientError, protocol, transport};

/// Registration command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "minechat-register", about = "Register a new chat account")]
struct RegisterArgs {
    /// Chat server hostname.
    #[arg(long)]
    host: Option<String>,

    /// Port accepting registration.
    #[arg(long)]
    send_port: Option<u16>,

    /// Display name for the new account.
    #[arg(short, long)]
    user_name: Option<String>,

    /// Path to the config directory (overrides the default location).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = RegisterArgs::parse();

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
    if let Some(host) = args.host {
        config.connection.host = host;
    }
    if let Some(port) = args.send_port {
        config.connection.send_port = port;
    }
    if let Some(name) = args.user_name {
        config.connection.user_name = name;
    }
    minechat_log::init_logging(&config.debug.log_level);

    match register(&config).await {
        Ok(token) => {
            println!("Registered as {}.", config.connection.user_name);
            println!("Your token: {token}");
            if let Err(err) = Config::save_token(&config_dir, &token) {
                eprintln!("Token could not be saved ({err}); note it down manually.");
                return ExitCode::FAILURE;
            }
            println!("Saved to {}.", config_dir.join("config.ron").display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Registration failed: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn register(config: &Config) -> Result<String, ClientError> {
    let mut conn = transport::connect(
        &config.connection.host,
        config.connection.send_port,
        Duration::from_secs(config.timing.connect_timeout_secs),
    )
    .await?;
    protocol::read_greeting(&mut conn.reader).await?;
    protocol::register(&mut conn.reader, &mut conn.writer, &config.connection.user_name).await
}
