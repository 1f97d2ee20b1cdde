//! Card and ticket data types.

use serde::{Deserialize, Serialize};

/// Rows per card.
pub const ROWS: usize = 3;

/// Columns per card, one per decade.
pub const COLUMNS: usize = 9;

/// Highest number that can be drawn.
pub const MAX_NUMBER: u8 = 90;

/// Inclusive value range of each column. The last column also takes 90.
pub const COLUMN_RANGES: [(u8, u8); COLUMNS] = [
    (1, 9),
    (10, 19),
    (20, 29),
    (30, 39),
    (40, 49),
    (50, 59),
    (60, 69),
    (70, 79),
    (80, 90),
];

/// Returns the column a number belongs to, or `None` outside 1–90.
pub fn column_of(n: u8) -> Option<usize> {
    COLUMN_RANGES
        .iter()
        .position(|&(lo, hi)| (lo..=hi).contains(&n))
}

/// One 3×9 frame of a ticket. `None` is an empty cell.
///
/// Serializes as a plain nested array: `[[5, null, ...], [...], [...]]`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Card {
    rows: [[Option<u8>; COLUMNS]; ROWS],
}

impl Card {
    /// Builds a card from raw rows. No invariants are checked.
    pub fn from_rows(rows: [[Option<u8>; COLUMNS]; ROWS]) -> Self {
        Self { rows }
    }

    /// All three rows.
    pub fn rows(&self) -> &[[Option<u8>; COLUMNS]; ROWS] {
        &self.rows
    }

    /// A single row.
    pub fn row(&self, index: usize) -> Option<&[Option<u8>; COLUMNS]> {
        self.rows.get(index)
    }

    /// Every number on the card, row by row.
    pub fn numbers(&self) -> impl Iterator<Item = u8> + '_ {
        self.rows.iter().flatten().filter_map(|cell| *cell)
    }

    pub(crate) fn set(&mut self, row: usize, col: usize, value: u8) {
        self.rows[row][col] = Some(value);
    }
}

/// A player's ticket: three frames sharing no numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Short random identifier.
    pub id: String,
    /// Display color, a `#rrggbb` string from [`PALETTE`](crate::PALETTE).
    pub color: String,
    /// The three frames.
    pub frames: [Card; 3],
}

impl Ticket {
    /// Generates a fresh ticket with the thread-local RNG.
    pub fn generate() -> Self {
        crate::generate_ticket(&mut rand::rng())
    }

    /// Every number on the ticket.
    pub fn numbers(&self) -> impl Iterator<Item = u8> + '_ {
        self.frames.iter().flat_map(Card::numbers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_of_maps_decades() {
        assert_eq!(column_of(1), Some(0));
        assert_eq!(column_of(9), Some(0));
        assert_eq!(column_of(10), Some(1));
        assert_eq!(column_of(79), Some(7));
        assert_eq!(column_of(80), Some(8));
        assert_eq!(column_of(90), Some(8));
    }

    #[test]
    fn test_column_of_rejects_out_of_domain() {
        assert_eq!(column_of(0), None);
        assert_eq!(column_of(91), None);
    }

    #[test]
    fn test_column_ranges_cover_domain_exactly_once() {
        for n in 1..=MAX_NUMBER {
            let hits = COLUMN_RANGES
                .iter()
                .filter(|&&(lo, hi)| (lo..=hi).contains(&n))
                .count();
            assert_eq!(hits, 1, "number {n} covered {hits} times");
        }
    }

    #[test]
    fn test_card_serializes_as_nested_array() {
        let mut card = Card::default();
        card.set(0, 0, 5);
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json[0][0], 5);
        assert!(json[0][1].is_null());
        assert_eq!(json.as_array().unwrap().len(), ROWS);
    }

    #[test]
    fn test_card_numbers_skips_empty_cells() {
        let mut card = Card::default();
        card.set(0, 0, 5);
        card.set(2, 8, 81);
        assert_eq!(card.numbers().collect::<Vec<_>>(), vec![5, 81]);
    }
}
