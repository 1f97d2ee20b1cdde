//! Ticket generation.
//!
//! Each frame is laid out in three passes:
//!
//! 1. Every column that still has unused numbers gets one cell, in a random
//!    row that has not reached its five-cell cap.
//! 2. Each row is topped up to five cells, choosing uniformly among columns
//!    that have spare numbers and no cell in that row yet.
//! 3. Each column draws its values without replacement from its unused
//!    numbers and places them ascending from top to bottom.
//!
//! Numbers used by earlier frames are excluded, so the three frames of a
//! ticket never share a number. A column whose range is exhausted is simply
//! skipped. With 45 cells against 90 numbers generation always completes.

use std::collections::BTreeSet;

use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;

use crate::{Card, Ticket, COLUMNS, COLUMN_RANGES, ROWS};

/// Numbers per row.
pub const CELLS_PER_ROW: usize = 5;

/// Frames per ticket.
pub const FRAMES: usize = 3;

/// Ticket colors.
pub const PALETTE: [&str; 8] = [
    "#fcd34d", "#fb923c", "#f87171", "#ec4899", "#a855f7", "#3b82f6", "#4ade80", "#94a3b8",
];

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Returns a random lowercase base-36 string of `len` characters.
pub fn short_id<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

/// Generates a full ticket: three frames with disjoint numbers.
pub fn generate_ticket<R: Rng + ?Sized>(rng: &mut R) -> Ticket {
    let mut used = BTreeSet::new();
    let frames = [
        generate_card(&mut used, rng),
        generate_card(&mut used, rng),
        generate_card(&mut used, rng),
    ];
    let color = PALETTE.choose(rng).copied().unwrap_or(PALETTE[0]).to_string();

    Ticket {
        id: short_id(rng, 7),
        color,
        frames,
    }
}

/// Generates one frame, skipping every number in `used` and adding the
/// numbers it places.
pub fn generate_card<R: Rng + ?Sized>(used: &mut BTreeSet<u8>, rng: &mut R) -> Card {
    let mut layout = [[false; COLUMNS]; ROWS];
    let mut row_counts = [0usize; ROWS];
    let mut col_remaining = COLUMN_RANGES.map(|(lo, hi)| {
        (lo..=hi).filter(|n| !used.contains(n)).count()
    });

    // Pass 1: one cell per column that still has numbers.
    let mut rows = [0, 1, 2];
    for col in 0..COLUMNS {
        if col_remaining[col] == 0 {
            continue;
        }
        rows.shuffle(rng);
        if let Some(&row) = rows.iter().find(|&&r| row_counts[r] < CELLS_PER_ROW) {
            layout[row][col] = true;
            row_counts[row] += 1;
            col_remaining[col] -= 1;
        }
    }

    // Pass 2: top every row up to five cells.
    for row in 0..ROWS {
        while row_counts[row] < CELLS_PER_ROW {
            let candidates: Vec<usize> = (0..COLUMNS)
                .filter(|&c| !layout[row][c] && col_remaining[c] > 0)
                .collect();
            let Some(&col) = candidates.choose(rng) else {
                tracing::warn!(row, cells = row_counts[row], "no column left to fill row");
                break;
            };
            layout[row][col] = true;
            row_counts[row] += 1;
            col_remaining[col] -= 1;
        }
    }

    // Pass 3: assign sorted values per column.
    let mut card = Card::default();
    for (col, &(lo, hi)) in COLUMN_RANGES.iter().enumerate() {
        let rows_in_col: Vec<usize> = (0..ROWS).filter(|&r| layout[r][col]).collect();
        if rows_in_col.is_empty() {
            continue;
        }

        let mut pool: Vec<u8> = (lo..=hi).filter(|n| !used.contains(n)).collect();
        pool.shuffle(rng);
        let mut picked: Vec<u8> = pool.into_iter().take(rows_in_col.len()).collect();
        picked.sort_unstable();

        for (row, value) in rows_in_col.into_iter().zip(picked) {
            card.set(row, col, value);
            used.insert(value);
        }
    }

    card
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_short_id_length_and_alphabet() {
        let mut rng = StdRng::seed_from_u64(1);
        let id = short_id(&mut rng, 7);
        assert_eq!(id.len(), 7);
        assert!(id.bytes().all(|b| ID_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_generate_card_marks_used_numbers() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut used = BTreeSet::new();
        let card = generate_card(&mut used, &mut rng);
        let on_card: BTreeSet<u8> = card.numbers().collect();
        assert_eq!(on_card, used);
        assert_eq!(used.len(), ROWS * CELLS_PER_ROW);
    }

    #[test]
    fn test_generate_card_skips_exhausted_column() {
        // Every number of the first column already taken.
        let mut rng = StdRng::seed_from_u64(3);
        let mut used: BTreeSet<u8> = (1..=9).collect();
        let card = generate_card(&mut used, &mut rng);

        for row in card.rows() {
            assert!(row[0].is_none());
            assert_eq!(row.iter().flatten().count(), CELLS_PER_ROW);
        }
    }

    #[test]
    fn test_generate_ticket_color_from_palette() {
        let mut rng = StdRng::seed_from_u64(4);
        let ticket = generate_ticket(&mut rng);
        assert!(PALETTE.contains(&ticket.color.as_str()));
        assert_eq!(ticket.id.len(), 7);
    }
}
