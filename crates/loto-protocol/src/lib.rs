//! Wire protocol for Loto rooms.
//!
//! - **Types**: presence metadata, the round snapshot, and the
//!   [`RoomEvent`] catalogue of everything a room broadcasts.
//! - **Codec**: the [`Codec`] trait and [`JsonCodec`], which also check
//!   that a broadcast's name agrees with the event inside it.
//! - **Errors**: [`ProtocolError`].
//!
//! ```text
//! Transport (bytes) → Protocol (RoomEvent / PresenceMeta) → Room replica
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ChatMessage, Epoch, GameStatus, PlayerRecord, PlayerStatus, PresenceMeta, RoomEvent,
    RoundSnapshot, WinnerRecord,
};
