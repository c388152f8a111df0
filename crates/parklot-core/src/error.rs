//! Error types for the `Parklot` core library.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures while resolving configuration.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to read config file {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The config files are valid on their own but not once combined.
    #[error("Failed to combine config files: {0}")]
    ConfigMerge(#[source] serde_json::Error),

    /// An environment variable is set but cannot be parsed.
    #[error("Invalid value for {key}: {value:?}")]
    InvalidEnv { key: &'static str, value: String },
}
