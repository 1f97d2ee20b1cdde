//! `RoomJoiner` builder: subscribe, announce, and start the room actor.

use std::sync::Arc;

use loto_protocol::{Codec, JsonCodec};
use loto_room::{spawn_room, wall_ms, ReplicaOptions, RoomConfig, RoomHandle, RoomReplica};
use loto_ticket::Ticket;
use loto_transport::{Channel, PubSub};
use tokio::time::Instant;

use crate::LotoError;

/// A joined room: the handle to drive it, and the channel underneath.
pub struct JoinedRoom<C> {
    pub handle: RoomHandle,
    pub channel: Arc<C>,
}

/// Builder for joining a room.
///
/// # Example
///
/// ```rust,no_run
/// # async fn demo() -> Result<(), loto::LotoError> {
/// use loto::prelude::*;
///
/// let hub = LocalHub::new();
/// let joined = RoomJoiner::new("ABC123", "alice").host(true).join(&hub).await?;
/// joined.handle.start_game().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RoomJoiner {
    room: String,
    player: String,
    host: bool,
    config: RoomConfig,
    joined_at: Option<u64>,
    ticket: Option<Ticket>,
}

impl RoomJoiner {
    pub fn new(room: impl Into<String>, player: impl Into<String>) -> Self {
        Self {
            room: room.into(),
            player: player.into(),
            host: false,
            config: RoomConfig::default(),
            joined_at: None,
            ticket: None,
        }
    }

    /// Whether this client created the room and starts as host.
    pub fn host(mut self, host: bool) -> Self {
        self.host = host;
        self
    }

    pub fn config(mut self, config: RoomConfig) -> Self {
        self.config = config;
        self
    }

    /// Overrides the wall-clock join time used for seniority.
    pub fn joined_at(mut self, joined_at: u64) -> Self {
        self.joined_at = Some(joined_at);
        self
    }

    /// Starts with this ticket instead of a freshly generated one.
    pub fn ticket(mut self, ticket: Ticket) -> Self {
        self.ticket = Some(ticket);
        self
    }

    /// Subscribes to the room, tracks the initial presence, and spawns
    /// the room actor.
    ///
    /// # Errors
    /// `InvalidJoin` for a blank room or player name; otherwise whatever
    /// the transport reports for subscribe or track.
    pub async fn join<P>(self, pubsub: &P) -> Result<JoinedRoom<P::Channel>, LotoError>
    where
        P: PubSub,
        LotoError: From<P::Error> + From<<P::Channel as Channel>::Error>,
    {
        let room = self.room.trim().to_string();
        let player = self.player.trim().to_string();
        if room.is_empty() {
            return Err(LotoError::InvalidJoin("room code is empty"));
        }
        if player.is_empty() {
            return Err(LotoError::InvalidJoin("player name is empty"));
        }

        let channel = Arc::new(pubsub.subscribe(&room, &player).await?);
        let mut replica = RoomReplica::new(
            ReplicaOptions {
                room: room.clone(),
                name: player.clone(),
                host_hint: self.host,
                joined_at: self.joined_at.unwrap_or_else(wall_ms),
                config: self.config,
                ticket: self.ticket,
            },
            Instant::now(),
        );

        let codec = JsonCodec;
        let meta = codec.encode(&replica.initial_meta())?;
        channel.track(meta).await?;
        tracing::info!(%room, %player, host = self.host, channel = %channel.id(), "joined room");

        let handle = spawn_room(Arc::clone(&channel), codec, replica);
        Ok(JoinedRoom { handle, channel })
    }
}
