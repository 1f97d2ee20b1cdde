//! Error types for the room layer.

use std::time::Duration;

use loto_protocol::GameStatus;

/// Why a chat send was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    /// Blank or whitespace-only text.
    #[error("message is empty")]
    Empty,

    /// Sent again before the throttle elapsed.
    #[error("sending too fast, wait {remaining:?}")]
    Throttled { remaining: Duration },
}

/// Errors returned by room commands.
///
/// All of them are local rejections: nothing was broadcast.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// Only the host may do this.
    #[error("only the host can {0}")]
    NotHost(&'static str),

    /// The round is in the wrong state.
    #[error("cannot {action} while the round is {status:?}")]
    InvalidTransition {
        status: GameStatus,
        action: &'static str,
    },

    /// Outside 1–90.
    #[error("number {0} is outside 1-90")]
    InvalidNumber(u8),

    #[error("number {0} was already drawn")]
    AlreadyDrawn(u8),

    /// Every number has been drawn.
    #[error("all numbers have been drawn")]
    Exhausted,

    /// Only drawn numbers can be marked.
    #[error("number {0} has not been drawn")]
    NotDrawn(u8),

    /// The marked numbers complete no row or frame of the ticket.
    #[error("marked numbers do not complete a row")]
    NotAWinningTicket,

    #[error("chat rejected: {0}")]
    ChatRejected(#[from] ChatError),

    /// The room actor has stopped.
    #[error("room {0} is unavailable")]
    Unavailable(String),
}
