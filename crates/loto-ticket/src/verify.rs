//! Win predicates over a card and a set of numbers.
//!
//! The set is usually the numbers a player has marked, or the numbers the
//! host has drawn when auditing someone else's claim.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{Card, Ticket};

/// Which part of a ticket satisfied the win condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WinKind {
    /// A single row of a frame is complete.
    Row { frame: usize, row: usize },
    /// A whole frame is complete.
    FullCard { frame: usize },
}

/// True iff every number in `row` is in `drawn`.
///
/// A row with no numbers is never complete.
pub fn row_complete(row: &[Option<u8>], drawn: &BTreeSet<u8>) -> bool {
    let mut numbers = row.iter().flatten().peekable();
    if numbers.peek().is_none() {
        return false;
    }
    numbers.all(|n| drawn.contains(n))
}

/// True iff all three rows of the card are complete.
pub fn card_complete(card: &Card, drawn: &BTreeSet<u8>) -> bool {
    card.rows().iter().all(|row| row_complete(row, drawn))
}

/// The missing number of a row that is exactly one number away.
fn row_waiting(row: &[Option<u8>], drawn: &BTreeSet<u8>) -> Option<u8> {
    let mut missing = row.iter().flatten().filter(|&&n| !drawn.contains(&n));
    match (missing.next(), missing.next()) {
        (Some(&n), None) => Some(n),
        _ => None,
    }
}

/// Numbers that would each complete some row of the card.
///
/// Empty when no row is one number away.
pub fn waiting_numbers(card: &Card, drawn: &BTreeSet<u8>) -> BTreeSet<u8> {
    card.rows()
        .iter()
        .filter_map(|row| row_waiting(row, drawn))
        .collect()
}

/// Finds the first frame that wins against `marked`.
///
/// A full card is reported in preference to a row of the same frame.
pub fn winning_frame(ticket: &Ticket, marked: &BTreeSet<u8>) -> Option<WinKind> {
    ticket.frames.iter().enumerate().find_map(|(frame, card)| {
        if card_complete(card, marked) {
            return Some(WinKind::FullCard { frame });
        }
        card.rows()
            .iter()
            .position(|row| row_complete(row, marked))
            .map(|row| WinKind::Row { frame, row })
    })
}

/// Marked numbers that were never drawn.
///
/// A non-empty result flags a win claim as unverified.
pub fn unverified_numbers(marked: &BTreeSet<u8>, drawn: &BTreeSet<u8>) -> BTreeSet<u8> {
    marked.difference(drawn).copied().collect()
}
