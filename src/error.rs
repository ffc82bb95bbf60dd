//! Error types for lucid_lane

use thiserror::Error;

/// Result type alias for lucid_lane operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading or writing LANE data
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The stream ended in the middle of a record
    #[error("Truncated LANE data: {0}")]
    Truncated(String),

    /// The stream is complete but structurally inconsistent
    #[error("Malformed LANE data: {0}")]
    Malformed(String),

    #[error("Channel {channel} holds {count} frames, more than a LANE file can index")]
    TooManyFrames { channel: u32, count: usize },

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// True for failures caused by the file contents rather than the filesystem
    pub fn is_content_error(&self) -> bool {
        matches!(
            self,
            Error::Truncated(_) | Error::Malformed(_) | Error::Serialization(_)
        )
    }
}
