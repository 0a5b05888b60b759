//! Command-line argument parsing for the chat client.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Chat client command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug)]
#[command(name = "minechat", about = "Resilient terminal chat client")]
pub struct CliArgs {
    /// Chat server hostname.
    #[arg(long)]
    pub host: Option<String>,

    /// Port streaming broadcast messages.
    #[arg(long)]
    pub read_port: Option<u16>,

    /// Port accepting authentication and outgoing messages.
    #[arg(long)]
    pub send_port: Option<u16>,

    /// Auth token. Without one, a new account is registered on first connect.
    #[arg(short, long)]
    pub token: Option<String>,

    /// Display name used when registering a new account.
    #[arg(short, long)]
    pub user_name: Option<String>,

    /// Path of the chat history file.
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to the config directory (overrides the default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref host) = args.host {
            self.connection.host = host.clone();
        }
        if let Some(port) = args.read_port {
            self.connection.read_port = port;
        }
        if let Some(port) = args.send_port {
            self.connection.send_port = port;
        }
        if let Some(ref token) = args.token {
            self.connection.token = Some(token.clone());
        }
        if let Some(ref name) = args.user_name {
            self.connection.user_name = name.clone();
        }
        if let Some(ref path) = args.history {
            self.history.path = path.clone();
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
