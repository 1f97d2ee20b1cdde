//! Wire types shared by every replica in a room.
//!
//! Presence metadata and broadcast payloads are the only things that leave
//! a client, so everything here derives `Serialize`/`Deserialize` and stays
//! free of local-only state. Field names are `snake_case` on the wire.

use std::collections::BTreeSet;

use loto_ticket::Ticket;
use serde::{Deserialize, Serialize};

/// Round counter. Every start and every reset moves it forward by one.
pub type Epoch = u64;

// ---------------------------------------------------------------------------
// Status enums
// ---------------------------------------------------------------------------

/// Where a single player stands in the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    #[default]
    Waiting,
    Playing,
    Won,
}

/// Lifecycle of a round.
///
/// The derived ordering is the merge order: a replica that sees two
/// statuses for the same epoch keeps the greater one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    #[default]
    Waiting,
    Playing,
    Ended,
}

impl GameStatus {
    /// The player status that goes with this round status.
    pub fn player_status(self) -> PlayerStatus {
        match self {
            Self::Playing => PlayerStatus::Playing,
            Self::Waiting | Self::Ended => PlayerStatus::Waiting,
        }
    }
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// What a client publishes about itself through presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceMeta {
    pub name: String,
    pub is_host: bool,
    #[serde(default)]
    pub status: PlayerStatus,
    #[serde(default)]
    pub waiting_numbers: Vec<u8>,
    /// Wall-clock milliseconds at which the player entered the room.
    #[serde(default)]
    pub joined_at: u64,
    /// The owner's logical clock. Bumped on every re-track.
    #[serde(default)]
    pub revision: u64,
}

impl PresenceMeta {
    /// Seniority key. The smaller key joined first.
    pub fn seniority(&self) -> (u64, &str) {
        (self.joined_at, &self.name)
    }
}

/// One row of the local roster.
///
/// Built from [`PresenceMeta`] plus `last_seen_at`, which is local: the
/// millisecond offset on this client's room clock at which it last heard
/// from the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Presence key. Equal to the display name.
    pub id: String,
    pub display_name: String,
    pub is_host: bool,
    pub status: PlayerStatus,
    pub waiting_numbers: Vec<u8>,
    pub last_seen_at: u64,
    pub joined_at: u64,
    pub revision: u64,
}

impl PlayerRecord {
    /// Builds a record from published metadata.
    pub fn from_meta(meta: PresenceMeta, last_seen_at: u64) -> Self {
        Self {
            id: meta.name.clone(),
            display_name: meta.name,
            is_host: meta.is_host,
            status: meta.status,
            waiting_numbers: meta.waiting_numbers,
            last_seen_at,
            joined_at: meta.joined_at,
            revision: meta.revision,
        }
    }

    /// The metadata this record would publish.
    pub fn to_meta(&self) -> PresenceMeta {
        PresenceMeta {
            name: self.display_name.clone(),
            is_host: self.is_host,
            status: self.status,
            waiting_numbers: self.waiting_numbers.clone(),
            joined_at: self.joined_at,
            revision: self.revision,
        }
    }

    /// Seniority key. The smaller key joined first.
    pub fn seniority(&self) -> (u64, &str) {
        (self.joined_at, &self.display_name)
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// A chat line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Random id, used to drop duplicate deliveries.
    pub id: String,
    pub sender_name: String,
    pub text: String,
    /// Wall-clock milliseconds at the sender.
    pub timestamp: u64,
}

// ---------------------------------------------------------------------------
// Rounds
// ---------------------------------------------------------------------------

/// The claim a player broadcasts when they call a win.
///
/// Every replica keeps it verbatim so anyone can audit the marks against
/// the numbers actually drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerRecord {
    pub name: String,
    pub is_host: bool,
    pub ticket: Ticket,
    pub marked_numbers: BTreeSet<u8>,
}

/// Round state carried by the leader's heartbeat.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoundSnapshot {
    pub epoch: Epoch,
    pub status: GameStatus,
    /// In draw order.
    pub drawn_numbers: Vec<u8>,
    pub winner: Option<WinnerRecord>,
}

// ---------------------------------------------------------------------------
// Broadcast catalogue
// ---------------------------------------------------------------------------

/// Every broadcast a room understands.
///
/// Serialized adjacently tagged, so a number draw looks like
/// `{"event":"number_draw","payload":{"epoch":3,"number":17}}`. The
/// broadcast itself is sent under [`RoomEvent::name`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum RoomEvent {
    /// The host started a round.
    GameStart { epoch: Epoch },

    /// The host reset the room to waiting.
    GameReset { epoch: Epoch, keep_tickets: bool },

    /// The host drew a number.
    NumberDraw { epoch: Epoch, number: u8 },

    Chat(ChatMessage),

    /// A player called a win and ended the round.
    PlayerWin { epoch: Epoch, winner: WinnerRecord },

    /// A player is one number away from completing a row.
    WaitingKinh { player: PresenceMeta },

    /// The sender claims the host role.
    HostChange { new_host: String },

    /// Periodic liveness and state beacon from the host.
    Heartbeat {
        host: String,
        active_players: Vec<String>,
        snapshot: RoundSnapshot,
    },

    /// Host asks everyone to answer with a pong.
    HeartbeatPing,

    /// Answer to a ping.
    HeartbeatPong { name: String },

    /// The host dropped a silent player from the roster.
    PlayerEvicted { name: String },

    /// The sender is leaving the room.
    PlayerLeave { name: String },
}

impl RoomEvent {
    /// The broadcast event name, identical to the serialized tag.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GameStart { .. } => "game_start",
            Self::GameReset { .. } => "game_reset",
            Self::NumberDraw { .. } => "number_draw",
            Self::Chat(_) => "chat",
            Self::PlayerWin { .. } => "player_win",
            Self::WaitingKinh { .. } => "waiting_kinh",
            Self::HostChange { .. } => "host_change",
            Self::Heartbeat { .. } => "heartbeat",
            Self::HeartbeatPing => "heartbeat_ping",
            Self::HeartbeatPong { .. } => "heartbeat_pong",
            Self::PlayerEvicted { .. } => "player_evicted",
            Self::PlayerLeave { .. } => "player_leave",
        }
    }

    /// Epoch stamped on round events. `None` for everything else.
    pub fn epoch(&self) -> Option<Epoch> {
        match self {
            Self::GameStart { epoch }
            | Self::GameReset { epoch, .. }
            | Self::NumberDraw { epoch, .. }
            | Self::PlayerWin { epoch, .. } => Some(*epoch),
            Self::Heartbeat { snapshot, .. } => Some(snapshot.epoch),
            _ => None,
        }
    }
}
