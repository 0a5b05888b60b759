//! Configuration system for the minechat client.
//!
//! Settings persist to disk as a RON file, with CLI overrides via clap.
//! The only field the running client ever writes back is the auth token,
//! once, right after a successful registration.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    Config, ConnectionConfig, DebugConfig, HistoryConfig, TimingConfig, default_config_dir,
};
pub use error::ConfigError;
