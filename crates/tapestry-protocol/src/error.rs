//! Protocol error types.

use std::io;

use thiserror::Error;

use crate::decode::MAX_IMAGE_LENGTH;

/// A violation of the engine wire protocol.
///
/// The protocol has no resynchronization mechanism, so any of these leaves
/// the stream in an unknown position and must be treated as fatal for the
/// connection.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The stream ended before a frame field was complete.
    #[error("engine stream ended inside {field}: expected {expected} bytes, received {received}")]
    Truncated {
        field: &'static str,
        expected: u64,
        received: u64,
    },

    /// A response declared an image larger than any frame we accept.
    #[error("declared image length {0} exceeds the {MAX_IMAGE_LENGTH}-byte limit")]
    ImageTooLarge(u64),

    /// A request frame did not follow the line layout.
    #[error("malformed request frame: {0}")]
    MalformedRequest(String),

    #[error("engine stream I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ProtocolError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        ProtocolError::MalformedRequest(message.into())
    }
}
