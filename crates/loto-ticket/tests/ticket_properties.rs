//! Property checks over many generated tickets, plus the classic
//! three-draw scenario.

use std::collections::BTreeSet;

use loto_ticket::{
    card_complete, column_of, generate_ticket, row_complete, waiting_numbers, winning_frame, Card,
    Ticket, WinKind, CELLS_PER_ROW, COLUMNS, COLUMN_RANGES, ROWS,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn tickets(count: u64) -> Vec<Ticket> {
    (0..count)
        .map(|seed| generate_ticket(&mut StdRng::seed_from_u64(seed)))
        .collect()
}

fn set(nums: &[u8]) -> BTreeSet<u8> {
    nums.iter().copied().collect()
}

// =========================================================================
// Card invariants
// =========================================================================

#[test]
fn test_every_row_has_exactly_five_numbers() {
    for ticket in tickets(300) {
        for card in &ticket.frames {
            for row in card.rows() {
                assert_eq!(row.iter().flatten().count(), CELLS_PER_ROW, "{ticket:?}");
            }
        }
    }
}

#[test]
fn test_values_stay_inside_their_column_range() {
    for ticket in tickets(300) {
        for card in &ticket.frames {
            for row in card.rows() {
                for (col, cell) in row.iter().enumerate() {
                    if let Some(n) = cell {
                        let (lo, hi) = COLUMN_RANGES[col];
                        assert!((lo..=hi).contains(n), "{n} in column {col}");
                        assert_eq!(column_of(*n), Some(col));
                    }
                }
            }
        }
    }
}

#[test]
fn test_columns_ascend_top_to_bottom() {
    for ticket in tickets(300) {
        for card in &ticket.frames {
            for col in 0..COLUMNS {
                let values: Vec<u8> = (0..ROWS).filter_map(|r| card.rows()[r][col]).collect();
                let mut sorted = values.clone();
                sorted.sort_unstable();
                assert_eq!(values, sorted);
            }
        }
    }
}

#[test]
fn test_no_number_repeats_within_a_ticket() {
    for ticket in tickets(300) {
        let all: Vec<u8> = ticket.numbers().collect();
        let unique: BTreeSet<u8> = all.iter().copied().collect();
        assert_eq!(all.len(), 45);
        assert_eq!(unique.len(), 45);
    }
}

#[test]
fn test_same_seed_same_ticket() {
    let a = generate_ticket(&mut StdRng::seed_from_u64(99));
    let b = generate_ticket(&mut StdRng::seed_from_u64(99));
    assert_eq!(a, b);
}

#[test]
fn test_ticket_generate_uses_thread_rng() {
    let ticket = Ticket::generate();
    assert_eq!(ticket.numbers().count(), 45);
}

// =========================================================================
// Scenario: host draws 5, 23, 81
// =========================================================================

fn scenario_card() -> Card {
    let mut first = [None; 9];
    first[0] = Some(5);
    first[2] = Some(23);
    first[4] = Some(40);
    first[6] = Some(62);
    first[8] = Some(81);
    let mut second = [None; 9];
    for (col, v) in [(1, 12), (3, 34), (5, 56), (7, 71), (8, 86)] {
        second[col] = Some(v);
    }
    let mut third = [None; 9];
    for (col, v) in [(0, 8), (2, 27), (4, 48), (6, 69), (7, 78)] {
        third[col] = Some(v);
    }
    Card::from_rows([first, second, third])
}

#[test]
fn test_scenario_three_draws_not_complete_not_waiting() {
    let card = scenario_card();
    let drawn = set(&[5, 23, 81]);

    assert!(!card_complete(&card, &drawn));
    assert!(waiting_numbers(&card, &drawn).is_empty());
    assert!(!row_complete(card.row(0).unwrap(), &drawn));
}

#[test]
fn test_scenario_fourth_draw_makes_row_waiting() {
    let card = scenario_card();
    let drawn = set(&[5, 23, 81, 40]);
    assert_eq!(waiting_numbers(&card, &drawn), set(&[62]));
}

#[test]
fn test_scenario_all_five_completes_row() {
    let card = scenario_card();
    let drawn = set(&[5, 23, 81, 40, 62]);
    assert!(row_complete(card.row(0).unwrap(), &drawn));
    assert!(!card_complete(&card, &drawn));
}

#[test]
fn test_winning_frame_reports_row_then_full_card() {
    let card = scenario_card();
    let ticket = Ticket {
        id: "abc1234".into(),
        color: "#fcd34d".into(),
        frames: [Card::default(), card.clone(), Card::default()],
    };

    assert_eq!(winning_frame(&ticket, &set(&[5, 23, 81])), None);
    assert_eq!(
        winning_frame(&ticket, &set(&[5, 23, 81, 40, 62])),
        Some(WinKind::Row { frame: 1, row: 0 })
    );

    let everything: BTreeSet<u8> = card.numbers().collect();
    assert_eq!(
        winning_frame(&ticket, &everything),
        Some(WinKind::FullCard { frame: 1 })
    );
}
