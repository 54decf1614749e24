//! Error types shared across the player

use thiserror::Error;

/// Failures of the key-value store backing channels and theme.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Rejections from the channel store. Shown to the user as a prompt.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Please enter a channel name")]
    MissingName,
    #[error("Please enter a stream URL")]
    MissingUrl,
}

/// Playlist import failures (file, download or parse).
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Request failed: {0}")]
    Http(String),
    #[error("HTTP error: {0}")]
    Status(u16),
    #[error("Read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Not a recognised playlist: {0}")]
    Parse(String),
    #[error("Blocked by content policy: {0}")]
    Blocked(String),
}

/// Embedded engine failures. Logged, never retried.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("probe failed: {0}")]
    Probe(String),
    #[error("no video stream found")]
    NoVideo,
    #[error("decoder error: {0}")]
    Decode(String),
}
