//! Loto tickets: generation and win predicates.
//!
//! A [`Ticket`] holds three [`Card`]s ("frames"). Each card is a 3×9 grid
//! with exactly five numbers per row, one column per decade of the 1–90
//! domain, numbers ascending down each column, and no number repeated
//! anywhere on the ticket.
//!
//! Everything here is pure: the generator takes any [`rand::Rng`], and the
//! predicates in [`verify`] only look at their arguments.

mod card;
mod generator;
pub mod verify;

pub use card::{column_of, Card, Ticket, COLUMNS, COLUMN_RANGES, MAX_NUMBER, ROWS};
pub use generator::{generate_card, generate_ticket, short_id, CELLS_PER_ROW, FRAMES, PALETTE};
pub use verify::{
    card_complete, row_complete, unverified_numbers, waiting_numbers, winning_frame, WinKind,
};
