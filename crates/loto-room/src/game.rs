//! Round state machine.
//!
//! ```text
//! Waiting ──start──▶ Playing ──win──▶ Ended
//!    ▲                                  │
//!    └──────────────reset───────────────┘
//! ```
//!
//! Every start and every reset opens a new epoch. Remote events merge by
//! epoch: a newer epoch replaces the round wholesale, the same epoch
//! unions drawn numbers and keeps the furthest status, an older epoch is
//! ignored. A winner, once recorded for an epoch, stays.

use std::collections::BTreeSet;

use loto_protocol::{Epoch, GameStatus, RoomEvent, RoundSnapshot, WinnerRecord};
use loto_ticket::{unverified_numbers, winning_frame, WinKind, MAX_NUMBER};
use rand::seq::IndexedRandom;
use rand::Rng;

use crate::RoomError;

/// What merging a remote event or snapshot did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    /// From an older epoch. Ignored.
    Stale,
    /// Same epoch, nothing new.
    Unchanged,
    /// Same epoch, state moved forward.
    Updated,
    /// A newer epoch was adopted. Per-round local state must be reset.
    NewRound,
}

/// Audit of a recorded win against the drawn numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinVerification {
    /// Marked numbers that were never drawn.
    pub invalid_numbers: BTreeSet<u8>,
    /// What the marks complete on the claimed ticket, if anything.
    pub kind: Option<WinKind>,
}

impl WinVerification {
    /// No undrawn marks and the marks really complete something.
    pub fn is_verified(&self) -> bool {
        self.invalid_numbers.is_empty() && self.kind.is_some()
    }
}

/// The replicated round.
#[derive(Debug, Clone, Default)]
pub struct GameStateMachine {
    epoch: Epoch,
    status: GameStatus,
    drawn: Vec<u8>,
    drawn_set: BTreeSet<u8>,
    winner: Option<WinnerRecord>,
}

impl GameStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Local transitions
    // -----------------------------------------------------------------------

    /// Opens a new round. Allowed from `Waiting`, and from `Ended`, which
    /// implies a reset.
    pub fn start(&mut self) -> Result<Epoch, RoomError> {
        if self.status == GameStatus::Playing {
            return Err(self.invalid("start the game"));
        }
        self.begin(self.epoch + 1, GameStatus::Playing);
        Ok(self.epoch)
    }

    /// Appends `number` to the drawn sequence.
    pub fn draw(&mut self, number: u8) -> Result<(), RoomError> {
        if self.status != GameStatus::Playing {
            return Err(self.invalid("draw"));
        }
        if !(1..=MAX_NUMBER).contains(&number) {
            return Err(RoomError::InvalidNumber(number));
        }
        if !self.drawn_set.insert(number) {
            return Err(RoomError::AlreadyDrawn(number));
        }
        self.drawn.push(number);
        Ok(())
    }

    /// Draws a uniformly random number that has not come up yet.
    pub fn draw_random<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<u8, RoomError> {
        if self.status != GameStatus::Playing {
            return Err(self.invalid("draw"));
        }
        let remaining = self.remaining();
        let number = *remaining.choose(rng).ok_or(RoomError::Exhausted)?;
        self.draw(number)?;
        Ok(number)
    }

    /// Records the winner and ends the round.
    pub fn declare_win(&mut self, winner: WinnerRecord) -> Result<(), RoomError> {
        if self.status != GameStatus::Playing {
            return Err(self.invalid("declare a win"));
        }
        self.winner = Some(winner);
        self.status = GameStatus::Ended;
        Ok(())
    }

    /// Back to `Waiting` in a fresh epoch. Not allowed mid-round.
    pub fn reset(&mut self) -> Result<Epoch, RoomError> {
        if self.status == GameStatus::Playing {
            return Err(self.invalid("reset the game"));
        }
        self.begin(self.epoch + 1, GameStatus::Waiting);
        Ok(self.epoch)
    }

    fn begin(&mut self, epoch: Epoch, status: GameStatus) {
        self.epoch = epoch;
        self.status = status;
        self.drawn.clear();
        self.drawn_set.clear();
        self.winner = None;
    }

    fn invalid(&self, action: &'static str) -> RoomError {
        RoomError::InvalidTransition {
            status: self.status,
            action,
        }
    }

    // -----------------------------------------------------------------------
    // Remote merges
    // -----------------------------------------------------------------------

    /// Merges a round event from a peer. Non-round events are `Unchanged`.
    pub fn apply(&mut self, event: &RoomEvent) -> Merge {
        match event {
            RoomEvent::GameStart { epoch } => self.advance(*epoch, GameStatus::Playing, |_| false),
            RoomEvent::GameReset { epoch, .. } => {
                self.advance(*epoch, GameStatus::Waiting, |_| false)
            }
            RoomEvent::NumberDraw { epoch, number } => {
                let number = *number;
                if !(1..=MAX_NUMBER).contains(&number) {
                    tracing::debug!(number, "ignoring out-of-range draw");
                    return Merge::Unchanged;
                }
                self.advance(*epoch, GameStatus::Playing, |game| game.insert_drawn(number))
            }
            RoomEvent::PlayerWin { epoch, winner } => {
                self.advance(*epoch, GameStatus::Ended, |game| {
                    if game.winner.is_some() {
                        return false;
                    }
                    game.winner = Some(winner.clone());
                    true
                })
            }
            RoomEvent::Heartbeat { snapshot, .. } => self.merge_snapshot(snapshot),
            _ => Merge::Unchanged,
        }
    }

    /// Merges a heartbeat snapshot.
    pub fn merge_snapshot(&mut self, snapshot: &RoundSnapshot) -> Merge {
        if snapshot.epoch < self.epoch {
            return Merge::Stale;
        }
        if snapshot.epoch > self.epoch {
            self.begin(snapshot.epoch, snapshot.status);
            for &n in &snapshot.drawn_numbers {
                self.insert_drawn(n);
            }
            self.winner = snapshot.winner.clone();
            return Merge::NewRound;
        }

        let mut changed = false;
        for &n in &snapshot.drawn_numbers {
            changed |= self.insert_drawn(n);
        }
        if snapshot.status > self.status {
            self.status = snapshot.status;
            changed = true;
        }
        if self.winner.is_none() && snapshot.winner.is_some() {
            self.winner = snapshot.winner.clone();
            changed = true;
        }
        if changed { Merge::Updated } else { Merge::Unchanged }
    }

    /// Shared epoch logic for single events: adopt a newer epoch, then
    /// raise the status and run `update` within the current one.
    fn advance(
        &mut self,
        epoch: Epoch,
        status: GameStatus,
        update: impl FnOnce(&mut Self) -> bool,
    ) -> Merge {
        if epoch < self.epoch {
            return Merge::Stale;
        }
        let new_round = epoch > self.epoch;
        if new_round {
            self.begin(epoch, status);
        }
        let mut changed = update(self);
        if status > self.status {
            self.status = status;
            changed = true;
        }
        match (new_round, changed) {
            (true, _) => Merge::NewRound,
            (false, true) => Merge::Updated,
            (false, false) => Merge::Unchanged,
        }
    }

    fn insert_drawn(&mut self, number: u8) -> bool {
        if (1..=MAX_NUMBER).contains(&number) && self.drawn_set.insert(number) {
            self.drawn.push(number);
            true
        } else {
            false
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// Drawn numbers in the order this replica learned them.
    pub fn drawn_numbers(&self) -> &[u8] {
        &self.drawn
    }

    pub fn drawn_set(&self) -> &BTreeSet<u8> {
        &self.drawn_set
    }

    pub fn is_drawn(&self, number: u8) -> bool {
        self.drawn_set.contains(&number)
    }

    /// The most recent draw.
    pub fn current_number(&self) -> Option<u8> {
        self.drawn.last().copied()
    }

    pub fn winner(&self) -> Option<&WinnerRecord> {
        self.winner.as_ref()
    }

    /// Numbers that can still be drawn, ascending.
    pub fn remaining(&self) -> Vec<u8> {
        (1..=MAX_NUMBER).filter(|n| !self.drawn_set.contains(n)).collect()
    }

    pub fn snapshot(&self) -> RoundSnapshot {
        RoundSnapshot {
            epoch: self.epoch,
            status: self.status,
            drawn_numbers: self.drawn.clone(),
            winner: self.winner.clone(),
        }
    }

    /// Audits the recorded winner against what was drawn here.
    ///
    /// Advisory: an unverified win is flagged, never retracted.
    pub fn verify_winner(&self) -> Option<WinVerification> {
        let winner = self.winner.as_ref()?;
        Some(WinVerification {
            invalid_numbers: unverified_numbers(&winner.marked_numbers, &self.drawn_set),
            kind: winning_frame(&winner.ticket, &winner.marked_numbers),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loto_ticket::Ticket;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn playing() -> GameStateMachine {
        let mut game = GameStateMachine::new();
        game.start().unwrap();
        game
    }

    fn winner(marked: &[u8]) -> WinnerRecord {
        WinnerRecord {
            name: "an".into(),
            is_host: false,
            ticket: Ticket::generate(),
            marked_numbers: marked.iter().copied().collect(),
        }
    }

    // --- local transitions ---

    #[test]
    fn test_start_from_waiting_opens_epoch() {
        let mut game = GameStateMachine::new();
        assert_eq!(game.start(), Ok(1));
        assert_eq!(game.status(), GameStatus::Playing);
    }

    #[test]
    fn test_start_while_playing_rejected() {
        let mut game = playing();
        assert!(matches!(game.start(), Err(RoomError::InvalidTransition { .. })));
    }

    #[test]
    fn test_start_from_ended_clears_round() {
        let mut game = playing();
        game.draw(5).unwrap();
        game.declare_win(winner(&[5])).unwrap();
        assert_eq!(game.start(), Ok(2));
        assert!(game.drawn_numbers().is_empty());
        assert!(game.winner().is_none());
    }

    #[test]
    fn test_draw_same_number_twice_keeps_one() {
        let mut game = playing();
        game.draw(17).unwrap();
        assert_eq!(game.draw(17), Err(RoomError::AlreadyDrawn(17)));
        assert_eq!(game.drawn_numbers(), [17]);
        assert_eq!(game.current_number(), Some(17));
    }

    #[test]
    fn test_draw_out_of_range_rejected() {
        let mut game = playing();
        assert_eq!(game.draw(0), Err(RoomError::InvalidNumber(0)));
        assert_eq!(game.draw(91), Err(RoomError::InvalidNumber(91)));
    }

    #[test]
    fn test_draw_while_waiting_rejected() {
        let mut game = GameStateMachine::new();
        assert!(matches!(game.draw(5), Err(RoomError::InvalidTransition { .. })));
    }

    #[test]
    fn test_draw_random_exhausts_after_ninety() {
        let mut game = playing();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..90 {
            game.draw_random(&mut rng).unwrap();
        }
        assert_eq!(game.drawn_set().len(), 90);
        assert_eq!(game.draw_random(&mut rng), Err(RoomError::Exhausted));
    }

    #[test]
    fn test_reset_while_playing_rejected() {
        let mut game = playing();
        assert!(matches!(game.reset(), Err(RoomError::InvalidTransition { .. })));
    }

    #[test]
    fn test_reset_from_ended_back_to_waiting() {
        let mut game = playing();
        game.declare_win(winner(&[])).unwrap();
        assert_eq!(game.reset(), Ok(2));
        assert_eq!(game.status(), GameStatus::Waiting);
        assert!(game.winner().is_none());
    }

    // --- remote merges ---

    #[test]
    fn test_apply_stale_epoch_draw_ignored() {
        let mut game = GameStateMachine::new();
        game.apply(&RoomEvent::GameStart { epoch: 3 });
        let merge = game.apply(&RoomEvent::NumberDraw { epoch: 2, number: 40 });
        assert_eq!(merge, Merge::Stale);
        assert!(game.drawn_numbers().is_empty());
    }

    #[test]
    fn test_apply_draw_from_newer_epoch_adopts_round() {
        let mut game = playing();
        game.draw(5).unwrap();

        let merge = game.apply(&RoomEvent::NumberDraw { epoch: 4, number: 9 });
        assert_eq!(merge, Merge::NewRound);
        assert_eq!(game.epoch(), 4);
        assert_eq!(game.status(), GameStatus::Playing);
        assert_eq!(game.drawn_numbers(), [9]);
    }

    #[test]
    fn test_apply_duplicate_draw_unchanged() {
        let mut game = playing();
        assert_eq!(game.apply(&RoomEvent::NumberDraw { epoch: 1, number: 9 }), Merge::Updated);
        assert_eq!(game.apply(&RoomEvent::NumberDraw { epoch: 1, number: 9 }), Merge::Unchanged);
        assert_eq!(game.drawn_numbers(), [9]);
    }

    #[test]
    fn test_apply_first_winner_kept() {
        let mut game = playing();
        game.apply(&RoomEvent::PlayerWin { epoch: 1, winner: winner(&[1]) });
        let mut second = winner(&[2]);
        second.name = "binh".into();
        let merge = game.apply(&RoomEvent::PlayerWin { epoch: 1, winner: second });

        assert_eq!(merge, Merge::Unchanged);
        assert_eq!(game.winner().unwrap().name, "an");
        assert_eq!(game.status(), GameStatus::Ended);
    }

    #[test]
    fn test_apply_late_draw_after_end_keeps_ended() {
        let mut game = playing();
        game.declare_win(winner(&[])).unwrap();
        game.apply(&RoomEvent::NumberDraw { epoch: 1, number: 33 });
        assert_eq!(game.status(), GameStatus::Ended);
        assert!(game.is_drawn(33));
    }

    #[test]
    fn test_merge_snapshot_same_epoch_unions() {
        let mut game = playing();
        game.draw(5).unwrap();
        game.draw(23).unwrap();

        let merge = game.merge_snapshot(&RoundSnapshot {
            epoch: 1,
            status: GameStatus::Playing,
            drawn_numbers: vec![23, 81],
            winner: None,
        });
        assert_eq!(merge, Merge::Updated);
        assert_eq!(game.drawn_numbers(), [5, 23, 81]);
    }

    #[test]
    fn test_merge_snapshot_newer_epoch_replaces() {
        let mut game = playing();
        game.draw(5).unwrap();

        let merge = game.merge_snapshot(&RoundSnapshot {
            epoch: 3,
            status: GameStatus::Waiting,
            drawn_numbers: vec![],
            winner: None,
        });
        assert_eq!(merge, Merge::NewRound);
        assert_eq!(game.status(), GameStatus::Waiting);
        assert!(game.drawn_numbers().is_empty());
    }

    #[test]
    fn test_merge_snapshot_identical_is_unchanged() {
        let mut game = playing();
        game.draw(5).unwrap();
        let snapshot = game.snapshot();
        assert_eq!(game.merge_snapshot(&snapshot), Merge::Unchanged);
    }

    // --- verification ---

    #[test]
    fn test_verify_winner_flags_undrawn_marks() {
        let mut game = playing();
        let ticket = Ticket::generate();
        let row: Vec<u8> = ticket.frames[0].rows()[0].iter().flatten().copied().collect();
        for &n in &row[..4] {
            game.draw(n).unwrap();
        }
        game.declare_win(WinnerRecord {
            name: "an".into(),
            is_host: false,
            ticket,
            marked_numbers: row.iter().copied().collect(),
        })
        .unwrap();

        let audit = game.verify_winner().unwrap();
        assert_eq!(audit.invalid_numbers, BTreeSet::from([row[4]]));
        assert!(audit.kind.is_some());
        assert!(!audit.is_verified());
    }

    #[test]
    fn test_verify_winner_none_without_winner() {
        assert!(playing().verify_winner().is_none());
    }
}
