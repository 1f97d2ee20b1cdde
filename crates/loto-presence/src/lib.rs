//! Membership for Loto rooms.
//!
//! Two pieces sit between the raw transport and the room replica:
//!
//! 1. **[`PresenceTracker`]**: a pure projection of the transport's
//!    `key → [metadata]` registry into sorted [`PlayerRecord`]s.
//! 2. **[`Roster`]**: the replica's own member table. It merges presence
//!    syncs and broadcasts last-writer-wins on the owner's revision,
//!    records when each peer was last heard from, and remembers evictions.
//!
//! ```text
//! Room replica (above)     ← asks who is here, who is stale, who is senior
//!     ↕
//! Presence layer (this crate)
//!     ↕
//! Protocol layer (below)   ← PresenceMeta, PlayerRecord
//! ```
//!
//! [`PlayerRecord`]: loto_protocol::PlayerRecord

mod roster;
mod tracker;

pub use roster::{MergeOutcome, Roster, SyncDiff};
pub use tracker::{PresenceTracker, SyncOutcome, DEFAULT_MAX_PLAYERS};
