//! Room coordination for Loto.
//!
//! There is no server. Every client runs a full replica of the room and
//! the replicas converge over a pub/sub channel: one of them acts as
//! host, draws numbers and heartbeats; the others follow, and take over
//! when the host goes quiet.
//!
//! # Key types
//!
//! - [`RoomReplica`]: the synchronous replica, driven by events and timers
//! - [`spawn_room`] / [`RoomHandle`]: the actor that runs a replica
//! - [`GameStateMachine`]: the round, merged across replicas by epoch
//! - [`HostElection`]: follower, candidate, leader
//! - [`ChatRelay`]: throttled chat with a bounded history
//! - [`RoomConfig`]: timing and capacity settings

mod chat;
mod config;
mod election;
mod error;
mod game;
mod replica;
mod room;

pub use chat::ChatRelay;
pub use config::RoomConfig;
pub use election::{successor, ElectionStep, HostElection, HostSignal, Role};
pub use error::{ChatError, RoomError};
pub use game::{GameStateMachine, Merge, WinVerification};
pub use replica::{wall_ms, Outbound, ReplicaOptions, RoomReplica, RoomView};
pub use room::{spawn_room, RoomHandle};
