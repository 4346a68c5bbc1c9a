//! Event stream error types

use thiserror::Error;

/// Errors raised while consuming the data stream
#[derive(Error, Debug)]
pub enum StreamError {
    /// The connection could not be established
    #[error("Failed to connect to event stream: {0}")]
    Connect(#[source] reqwest::Error),

    /// The server answered with a non-success status
    #[error("Event stream returned HTTP {0}")]
    Status(u16),

    /// The connection broke while reading the body
    #[error("Event stream body error: {0}")]
    Body(#[source] reqwest::Error),

    /// An event carried data that is not a valid frame
    #[error("Malformed frame: {0}")]
    Decode(#[from] serde_json::Error),
}

impl StreamError {
    /// Transport errors end the current connection; decode errors only drop a frame
    pub fn is_transport(&self) -> bool {
        !matches!(self, StreamError::Decode(_))
    }
}
