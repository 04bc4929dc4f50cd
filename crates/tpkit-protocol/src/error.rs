//! Errors raised while framing, decoding, or encoding host messages.

use thiserror::Error;

/// Failures in the wire layer.
///
/// Every variant except [`ProtocolError::Encode`] describes a malformed or
/// hostile byte stream from the host and is fatal for the connection.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A complete frame did not contain valid JSON.
    #[error("failed to decode host message: {source}")]
    Decode {
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The unterminated tail of the receive buffer outgrew the configured cap.
    #[error("unterminated frame of {pending} bytes exceeds the {limit} byte limit")]
    FrameTooLarge {
        /// Bytes buffered without a newline.
        pending: usize,
        /// Configured cap.
        limit: usize,
    },

    /// An outbound message could not be serialised.
    #[error("failed to encode message: {source}")]
    Encode {
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A message did not match the typed view requested for its kind.
    #[error("'{kind}' message has an unexpected shape: {source}")]
    InvalidShape {
        /// Wire name of the message type.
        kind: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}
