//! Error types for scanlink-core.

use thiserror::Error;

/// Errors from decoding inbound frames.
///
/// These are always recovered locally: the caller logs the error, drops the
/// frame, and the channel stays usable.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Text frame is not valid JSON or is missing required fields.
    #[error("malformed payload: {detail}")]
    MalformedPayload { detail: String },

    /// Text frame is valid JSON but carries an unrecognized message type.
    #[error("unknown message type: {message_type}")]
    UnknownType { message_type: String },

    /// Binary payload failed gzip inflation.
    #[error("decompression failed: {detail}")]
    DecompressionFailed { detail: String },
}

/// Main error type for scanlink operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from underlying system calls.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame decode failure (malformed, unknown type, bad compression).
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Encoding an outbound command failed.
    #[error("codec error: {message}")]
    Codec { message: String },

    /// Unexpected message type at the current protocol state.
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// Transport-level failure; the channel transitions to faulted.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// The peer closed the connection.
    #[error("connection closed")]
    ConnectionClosed,

    /// Operation attempted in the wrong channel state.
    #[error("invalid state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },
}

impl Error {
    /// Returns true if the channel remains usable after this error.
    ///
    /// Decode failures are dropped frames and protocol errors are scoped to
    /// the operation that triggered them; transport-level failures are not.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Decode(_) | Error::Codec { .. } | Error::Protocol { .. })
    }
}

/// Convenience result type for scanlink operations.
pub type Result<T> = std::result::Result<T, Error>;
