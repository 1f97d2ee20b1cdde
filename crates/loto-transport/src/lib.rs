//! Publish/subscribe transport abstraction for Loto rooms.
//!
//! A room maps onto one named channel. A channel offers two mechanisms:
//!
//! - **Presence**: an ephemeral `key → [metadata]` registry that the
//!   transport keeps up to date as members track, leave, or disconnect.
//! - **Broadcast**: fire-and-forget events, at-most-once, with no ordering
//!   guarantee across senders and no delivery back to the sender.
//!
//! The [`PubSub`] and [`Channel`] traits describe that contract. Instead of
//! registering callbacks, consumers pull [`ChannelEvent`]s from
//! [`Channel::recv`] inside their own event loop.
//!
//! # Feature Flags
//!
//! - `local` (default): [`LocalHub`], an in-process implementation with
//!   configurable message loss, used by tests and the demo.

mod error;
#[cfg(feature = "local")]
mod local;

pub use error::TransportError;
#[cfg(feature = "local")]
pub use local::{LocalChannel, LocalHub, LocalHubConfig};

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;

/// Raw presence registry: presence key → metadata blobs tracked under it.
///
/// A key may carry zero blobs (subscribed but never tracked) or several
/// (the same key tracked from more than one connection).
pub type PresenceState = BTreeMap<String, Vec<Vec<u8>>>;

/// Opaque identifier for a channel subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(u64);

impl ChannelId {
    /// Creates a new `ChannelId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chan-{}", self.0)
    }
}

/// Something that happened on a subscribed channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The full presence registry after any change.
    PresenceSync(PresenceState),

    /// A member tracked (or re-tracked) its metadata.
    PresenceJoin { key: String, metas: Vec<Vec<u8>> },

    /// A member left or disconnected.
    PresenceLeave { key: String },

    /// A broadcast from another member.
    Broadcast { event: String, payload: Vec<u8> },
}

/// Opens channels on a named-room pub/sub substrate.
pub trait PubSub: Send + Sync + 'static {
    /// The channel type produced by this transport.
    type Channel: Channel;
    /// The error type for subscribe operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Subscribes to `room`, registering presence under `presence_key`.
    ///
    /// Resolves once the transport has acknowledged the subscription.
    fn subscribe(
        &self,
        room: &str,
        presence_key: &str,
    ) -> impl Future<Output = Result<Self::Channel, Self::Error>> + Send;
}

/// A subscription to a single room channel.
pub trait Channel: Send + Sync + 'static {
    /// The error type for channel operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Upserts this member's presence metadata.
    ///
    /// Resolves once the transport has acknowledged the update.
    fn track(
        &self,
        meta: Vec<u8>,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Broadcasts an event to every other member.
    ///
    /// Fire-and-forget: returning `Ok` says nothing about delivery.
    fn broadcast(&self, event: &str, payload: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next channel event.
    ///
    /// Returns `None` once the channel is closed.
    fn recv(&self) -> impl Future<Output = Option<ChannelEvent>> + Send;

    /// Leaves the room. Other members observe a presence leave.
    fn unsubscribe(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Returns the unique identifier for this subscription.
    fn id(&self) -> ChannelId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_id_new_and_into_inner() {
        let id = ChannelId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_channel_id_display() {
        assert_eq!(ChannelId::new(7).to_string(), "chan-7");
    }

    #[test]
    fn test_channel_id_orders_by_raw_value() {
        let mut ids = vec![ChannelId::new(3), ChannelId::new(1), ChannelId::new(2)];
        ids.sort();
        assert_eq!(ids, vec![ChannelId::new(1), ChannelId::new(2), ChannelId::new(3)]);
    }
}
