//! Unified error type for Loto.

use loto_protocol::ProtocolError;
use loto_room::RoomError;
use loto_transport::TransportError;

/// Top-level error wrapping every crate-specific error.
///
/// The `#[from]` conversions let `?` lift sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum LotoError {
    /// Subscribing, tracking, or broadcasting failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Encoding or decoding a wire value failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room command was rejected.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A joiner was built without a usable room or player name.
    #[error("invalid join request: {0}")]
    InvalidJoin(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err: LotoError = TransportError::ChannelClosed("chan-1".into()).into();
        assert!(matches!(err, LotoError::Transport(_)));
        assert!(err.to_string().contains("chan-1"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err: LotoError = ProtocolError::InvalidMessage("bad".into()).into();
        assert!(matches!(err, LotoError::Protocol(_)));
    }

    #[test]
    fn test_from_room_error() {
        let err: LotoError = RoomError::AlreadyDrawn(17).into();
        assert!(matches!(err, LotoError::Room(RoomError::AlreadyDrawn(17))));
        assert_eq!(err.to_string(), "number 17 was already drawn");
    }
}
