//! # Loto
//!
//! Multiplayer Lô Tô rooms with no game server. Every client keeps its own
//! replica of the room and the replicas converge over a lossy pub/sub
//! channel with presence: one client hosts and draws, the others follow
//! and take over if the host disappears.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use loto::prelude::*;
//!
//! # async fn demo() -> Result<(), LotoError> {
//! let hub = LocalHub::new();
//! let host = RoomJoiner::new("ABC123", "alice").host(true).join(&hub).await?;
//! let guest = RoomJoiner::new("ABC123", "bob").join(&hub).await?;
//!
//! host.handle.start_game().await?;
//! let n = host.handle.draw_random().await?;
//! guest.handle.subscribe_view().wait_for(|v| v.drawn_numbers.contains(&n)).await.ok();
//! # Ok(())
//! # }
//! ```

mod error;
mod joiner;

pub use error::LotoError;
pub use joiner::{JoinedRoom, RoomJoiner};

pub use loto_presence as presence;
pub use loto_protocol as protocol;
pub use loto_room as room;
pub use loto_tick as tick;
pub use loto_ticket as ticket;
pub use loto_transport as transport;

/// Installs a `tracing` subscriber filtered by `RUST_LOG`, defaulting to
/// `info`. Does nothing if a global subscriber is already set.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub mod prelude {
    pub use crate::{init_tracing, JoinedRoom, LotoError, RoomJoiner};
    pub use loto_protocol::{ChatMessage, GameStatus, PlayerRecord, PlayerStatus, RoomEvent};
    pub use loto_room::{ChatError, Role, RoomConfig, RoomError, RoomHandle, RoomView};
    pub use loto_ticket::{Card, Ticket, WinKind};
    pub use loto_transport::{Channel, LocalChannel, LocalHub, LocalHubConfig, PubSub};
}
