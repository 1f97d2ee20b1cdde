//! Codec trait and implementations.
//!
//! A codec turns wire types into bytes and back. Rooms only ever talk to
//! the [`Codec`] trait, so the format can change without touching the
//! room logic. [`JsonCodec`] is the default: readable in logs and in any
//! browser devtools attached to the same channel.

use serde::{de::DeserializeOwned, Serialize};

use crate::{ProtocolError, RoomEvent};

/// Encodes Rust values to bytes and decodes bytes back.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or do
    /// not match `T`.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;

    /// Encodes a room event as its full tagged form.
    ///
    /// The returned bytes are meant to travel as the payload of a broadcast
    /// named [`RoomEvent::name`].
    fn encode_event(&self, event: &RoomEvent) -> Result<Vec<u8>, ProtocolError> {
        self.encode(event)
    }

    /// Decodes a broadcast payload received under the name `event`.
    ///
    /// # Errors
    /// Returns `ProtocolError::EventMismatch` when the tag inside the
    /// payload names a different event than the broadcast did.
    fn decode_event(&self, event: &str, data: &[u8]) -> Result<RoomEvent, ProtocolError> {
        let decoded: RoomEvent = self.decode(data)?;
        if decoded.name() != event {
            return Err(ProtocolError::EventMismatch {
                expected: event.to_string(),
                got: decoded.name().to_string(),
            });
        }
        Ok(decoded)
    }
}

/// A [`Codec`] backed by `serde_json`.
///
/// ```rust
/// use loto_protocol::{Codec, JsonCodec, RoomEvent};
///
/// let codec = JsonCodec;
/// let event = RoomEvent::NumberDraw { epoch: 1, number: 17 };
///
/// let bytes = codec.encode_event(&event).unwrap();
/// let decoded = codec.decode_event("number_draw", &bytes).unwrap();
/// assert_eq!(event, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
