use super::*;
use crate::dice::*;
use crate::{Millis, PlayerId, RoundId, UserId};
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::collections::BTreeSet;

/// The shared round document: one JSON row per hand, read and written by
/// every connected client and by the deadline enforcer. The store stamps it
/// with a version; all safety-critical transitions go through conditional
/// writes against that version.
///
/// Invariants while `phase == Playing`:
/// - `current`, when Some, is a member of `turn_order` and its entry has
///   `complete == false`
/// - exactly one player is incomplete-and-current at a time, except
///   transiently during turn advancement
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct RoundState {
    pub round: RoundId,
    pub variant: Variant,
    /// Fixed for the round once computed from seat position relative to the
    /// dealer.
    pub turn_order: Vec<PlayerId>,
    pub bots: BTreeSet<PlayerId>,
    pub current: Option<PlayerId>,
    pub phase: Phase,
    /// Entries added lazily, on a player's first write.
    pub players: BTreeMap<PlayerId, PlayerDiceState>,
    /// The single client elected to simulate every bot turn this round.
    pub controller: Option<UserId>,
    /// Wall-clock instant after which the current turn counts as abandoned.
    pub deadline: Option<Millis>,
    pub winners: Vec<PlayerId>,
    /// Claimed once, by the client that processes settlement.
    pub settled_by: Option<UserId>,
}

impl RoundState {
    pub fn new(round: RoundId, variant: Variant, order: Vec<PlayerId>, bots: BTreeSet<PlayerId>) -> Self {
        Self {
            round,
            variant,
            turn_order: order,
            bots,
            current: None,
            phase: Phase::Waiting,
            players: BTreeMap::new(),
            controller: None,
            deadline: None,
            winners: Vec::new(),
            settled_by: None,
        }
    }

    /// Open the round: first player in turn order is up.
    pub fn open(mut self, now: Millis) -> Self {
        self.phase = Phase::Playing;
        self.current = self.turn_order.first().copied();
        self.deadline = self.current.map(|p| now + self.allowance(p));
        self
    }

    pub fn is_bot(&self, player: PlayerId) -> bool {
        self.bots.contains(&player)
    }

    /// Deterministic controller election: the first non-bot in turn order.
    /// Committed through an atomic set-if-absent claim at the store, so two
    /// racing clients converge on a single winner.
    pub fn elected(&self) -> Option<UserId> {
        self.turn_order.iter().find(|p| !self.is_bot(**p)).copied()
    }

    pub fn state_of(&self, player: PlayerId) -> Option<&PlayerDiceState> {
        self.players.get(&player)
    }

    pub fn entry(&mut self, player: PlayerId) -> &mut PlayerDiceState {
        let variant = self.variant;
        self.players
            .entry(player)
            .or_insert_with(|| PlayerDiceState::from(variant))
    }

    pub fn is_complete(&self, player: PlayerId) -> bool {
        self.state_of(player).map(|s| s.complete).unwrap_or(false)
    }

    pub fn all_complete(&self) -> bool {
        self.turn_order.iter().all(|p| self.is_complete(*p))
    }

    /// Next incomplete player after the current one, in turn order.
    pub fn up_next(&self) -> Option<PlayerId> {
        let from = match self.current {
            Some(current) => self.turn_order.iter().position(|p| *p == current)? + 1,
            None => 0,
        };
        self.turn_order
            .iter()
            .skip(from)
            .find(|p| !self.is_complete(**p))
            .copied()
    }

    /// Move the turn pointer forward, or finish the round when nobody is
    /// left to act.
    pub fn advance(&mut self, now: Millis) {
        match self.up_next() {
            Some(next) => {
                self.current = Some(next);
                self.deadline = Some(now + self.allowance(next));
            }
            None => self.finish(),
        }
    }

    /// Compute winners (all of them, on a tie) and close the round.
    pub fn finish(&mut self) {
        let best = self
            .turn_order
            .iter()
            .filter_map(|p| self.state_of(*p).and_then(|s| s.result))
            .max();
        self.winners = match best {
            Some(best) => self
                .turn_order
                .iter()
                .filter(|p| self.state_of(**p).and_then(|s| s.result) == Some(best))
                .copied()
                .collect(),
            None => Vec::new(),
        };
        self.current = None;
        self.deadline = None;
        self.phase = Phase::Complete;
    }

    /// Best completed result among everyone but `player`. Input to the bot
    /// stop heuristic.
    pub fn best_rival(&self, player: PlayerId) -> Option<HandResult> {
        self.players
            .iter()
            .filter(|(p, _)| **p != player)
            .filter(|(_, s)| s.complete)
            .filter_map(|(_, s)| s.result)
            .max()
    }

    /// Turn allowance in milliseconds. Bots get a much longer window: their
    /// turns normally resolve in seconds via the controller, so a bot still
    /// on the clock this long means no client is driving it at all.
    fn allowance(&self, player: PlayerId) -> Millis {
        match self.is_bot(player) {
            true => Self::bot_recovery().as_millis() as Millis,
            false => Self::turn_timeout().as_millis() as Millis,
        }
    }

    pub fn turn_timeout() -> std::time::Duration {
        std::time::Duration::from_secs(45)
    }
    pub fn bot_recovery() -> std::time::Duration {
        std::time::Duration::from_secs(120)
    }
}

impl std::fmt::Display for RoundState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "round {} {} {}", self.round, self.variant, self.phase)?;
        if let Some(current) = self.current {
            write!(f, " on P{}", current)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round() -> RoundState {
        RoundState::new(
            7,
            Variant::Horses,
            vec![10, 20, 30],
            BTreeSet::from([30]),
        )
        .open(1_000)
    }

    #[test]
    fn open_points_at_first_seat() {
        let state = round();
        assert!(state.phase == Phase::Playing);
        assert!(state.current == Some(10));
        assert!(state.deadline == Some(1_000 + 45_000));
    }

    #[test]
    fn bot_turns_get_longer_deadlines() {
        let mut state = round();
        state.entry(10).finish(Variant::Horses);
        state.entry(20).finish(Variant::Horses);
        state.advance(3_000);
        assert!(state.current == Some(30));
        assert!(state.deadline == Some(3_000 + 120_000));
    }

    #[test]
    fn elected_skips_bots() {
        let state = RoundState::new(1, Variant::Horses, vec![5, 6], BTreeSet::from([5]));
        assert!(state.elected() == Some(6));
    }

    #[test]
    fn advance_past_everyone_finishes() {
        let mut state = round();
        for player in [10, 20, 30] {
            let entry = state.entry(player);
            entry.dice = vec![
                Die { value: 2, held: false, tag: None };
                5
            ];
            entry.finish(Variant::Horses);
            state.advance(5_000);
        }
        assert!(state.phase == Phase::Complete);
        assert!(state.current == None);
        assert!(state.deadline == None);
        assert!(state.winners == vec![10, 20, 30]);
    }

    #[test]
    fn finish_collects_every_tied_winner() {
        let mut state = round();
        state.entry(10).result = Some(HandResult::Horses(Ranking::OnePair(4)));
        state.entry(10).complete = true;
        state.entry(20).result = Some(HandResult::Horses(Ranking::OnePair(4)));
        state.entry(20).complete = true;
        state.entry(30).result = Some(HandResult::Horses(Ranking::HighDie(6)));
        state.entry(30).complete = true;
        state.finish();
        assert!(state.winners == vec![10, 20]);
    }

    #[test]
    fn single_incomplete_current_player() {
        let mut state = round();
        state.entry(10).finish(Variant::Horses);
        state.advance(2_000);
        let current = state.current.unwrap();
        assert!(state.turn_order.contains(&current));
        assert!(!state.is_complete(current));
        let open = state
            .turn_order
            .iter()
            .filter(|p| !state.is_complete(**p) && Some(**p) == state.current)
            .count();
        assert!(open == 1);
    }
}
