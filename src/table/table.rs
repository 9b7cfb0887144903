use crate::dice::*;
use crate::round::*;
use crate::{Millis, PlayerId, RoundId};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy)]
pub struct Seat {
    pub player: PlayerId,
    pub human: bool,
}

/// Fixed seating for a table across rounds. Each deal produces a fresh
/// round document with turn order rotated so the seat after the dealer
/// acts first; the dealer button moves one seat per round.
#[derive(Debug, Clone)]
pub struct Table {
    seats: Vec<Seat>,
    dealer: usize,
    variant: Variant,
}

impl Table {
    pub fn new(seats: Vec<Seat>, variant: Variant) -> Self {
        Self {
            seats,
            dealer: 0,
            variant,
        }
    }

    /// Turn order relative to the dealer: left of the button first, dealer
    /// last. Fixed for the round once dealt.
    pub fn turn_order(&self) -> Vec<PlayerId> {
        let n = self.seats.len();
        (1..=n)
            .map(|i| self.seats[(self.dealer + i) % n].player)
            .collect()
    }

    pub fn bots(&self) -> BTreeSet<PlayerId> {
        self.seats
            .iter()
            .filter(|s| !s.human)
            .map(|s| s.player)
            .collect()
    }

    /// Fresh round document, open and pointing at the first seat.
    pub fn deal(&self, round: RoundId, now: Millis) -> RoundState {
        RoundState::new(round, self.variant, self.turn_order(), self.bots()).open(now)
    }

    /// Pass the button for the next round.
    pub fn rotate(&mut self) {
        self.dealer = (self.dealer + 1) % self.seats.len().max(1);
    }
}
