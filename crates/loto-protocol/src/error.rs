//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding room traffic.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed bytes, missing fields, or an
    /// unknown event tag.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message decoded but violates a protocol rule.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The broadcast name does not match the tag inside the payload.
    #[error("event mismatch: broadcast as {expected:?} but payload is {got:?}")]
    EventMismatch { expected: String, got: String },
}
