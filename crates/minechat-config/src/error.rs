//! Configuration error types.

use std::path::PathBuf;

/// Errors that can occur when loading, saving, or parsing configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the config file from disk.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// The file we tried to read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the config file to disk.
    #[error("failed to write config {path}: {source}")]
    Write {
        /// The file we tried to write.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file did not parse as RON.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// The offending file.
        path: PathBuf,
        /// The parse error with position information.
        #[source]
        source: ron::error::SpannedError,
    },

    /// Failed to serialize the config to RON.
    #[error("failed to serialize config: {0}")]
    Serialize(#[source] ron::Error),

    /// No config directory could be determined for this platform.
    #[error("no config directory available on this platform")]
    NoConfigDir,
}
