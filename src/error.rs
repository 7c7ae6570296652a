//! Error types for TLSA synchronization
//!
//! Every error is fatal to a run. Nothing here is retried.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while syncing TLSA records
#[derive(Debug, Error)]
pub enum SyncError {
    /// Missing or invalid configuration input
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Key file could not be read
    #[error("Failed to read key file {}: {source}", .path.display())]
    KeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Key type could not be detected or the public key could not be extracted
    #[error("Failed to parse key file {}: {reason}", .path.display())]
    KeyParse { path: PathBuf, reason: String },

    /// The DNS provider answered with a non-success response
    #[error("DNS provider error {status}: {body}")]
    Provider { status: u16, body: String },

    /// The request never produced a usable response
    #[error("DNS provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl SyncError {
    pub(crate) fn key_parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        SyncError::KeyParse {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = SyncError> = std::result::Result<T, E>;
