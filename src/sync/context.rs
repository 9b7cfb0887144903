use super::*;
use crate::dice::*;
use crate::round::*;
use crate::store::*;
use crate::{Millis, PlayerId, RollKey, RoundId};
use std::collections::BTreeMap;
use std::collections::BTreeSet;

/// Per-round reconciliation state for one connected client.
///
/// Constructed when a round is first observed and discarded when the round
/// ends, so nothing leaks across rounds in a long-lived session. Everything
/// the transport refuses to guarantee (ordering, dedup) is rebuilt here:
/// roll keys only move forward, held counts only grow within a roll, and
/// completion never reverts. Rows that would regress any of those are
/// dropped whole, producing no visible change.
#[derive(Debug)]
pub struct Context {
    round: RoundId,
    started: bool,
    current: Option<PlayerId>,
    /// Highest accepted roll key per player.
    seen: BTreeMap<PlayerId, RollKey>,
    /// Highest held count observed under the current roll key.
    held: BTreeMap<PlayerId, usize>,
    /// Last accepted rolls_remaining, for telling a genuine final roll from
    /// a post-completion bookkeeping bump.
    rolls: BTreeMap<PlayerId, u8>,
    done: BTreeSet<PlayerId>,
    finished: bool,
    intent: Option<LocalIntent>,
    accepted: Option<Stamped>,
}

impl Context {
    pub fn new(round: RoundId) -> Self {
        Self {
            round,
            started: false,
            current: None,
            seen: BTreeMap::new(),
            held: BTreeMap::new(),
            rolls: BTreeMap::new(),
            done: BTreeSet::new(),
            finished: false,
            intent: None,
            accepted: None,
        }
    }

    pub fn round(&self) -> RoundId {
        self.round
    }
    pub fn current(&self) -> Option<PlayerId> {
        self.current
    }
    pub fn finished(&self) -> bool {
        self.finished
    }
    /// Last accepted remote row, if any.
    pub fn accepted(&self) -> Option<&Stamped> {
        self.accepted.as_ref()
    }

    /// Record a local optimistic edit; incoming rows merge against it until
    /// the protection window closes.
    pub fn intend(&mut self, intent: LocalIntent) {
        self.intent = Some(intent);
    }

    /// Adopt a row this client just wrote itself, without emitting cues:
    /// the local animation already played when the edit was made.
    pub fn absorb(&mut self, row: &Stamped) {
        if row.state.round != self.round {
            return;
        }
        self.started = true;
        self.current = row.state.current;
        for (player, entry) in row.state.players.iter() {
            self.seen.insert(*player, entry.roll_key);
            self.held.insert(*player, entry.held());
            self.rolls.insert(*player, entry.rolls_remaining);
            if entry.complete {
                self.done.insert(*player);
            }
        }
        self.finished = self.finished || row.state.phase == Phase::Complete;
        self.accepted = Some(row.clone());
    }

    /// Reconcile one incoming row against everything accepted so far.
    /// Returns the presentation cues to play; an empty vec with no internal
    /// change means the row was rejected as stale.
    pub fn observe(&mut self, row: &Stamped, now: Millis) -> Vec<Cue> {
        if row.state.round != self.round {
            log::warn!("row for round {} reached context for round {}", row.state.round, self.round);
            return Vec::new();
        }
        if let Some(why) = self.staleness(&row.state) {
            log::debug!("round {}: dropped stale row: {}", self.round, why);
            return Vec::new();
        }
        if let Some(ref intent) = self.intent {
            if let Verdict::Reject(why) = reconcile(intent, &row.state, now) {
                log::debug!("round {}: shielded local intent: {}", self.round, why);
                return Vec::new();
            }
        }
        self.apply(row)
    }

    /// Monotonicity guards over every player this context has tracked.
    fn staleness(&self, state: &RoundState) -> Option<&'static str> {
        for (player, seen) in self.seen.iter() {
            // a vanished entry reads as unrolled, which regresses too
            let (key, held) = state
                .state_of(*player)
                .map(|e| (e.roll_key, e.held()))
                .unwrap_or((0, 0));
            if key < *seen {
                return Some("roll key regression");
            }
            if key == *seen && held < self.held.get(player).copied().unwrap_or(0) {
                return Some("held count regression");
            }
        }
        for player in self.done.iter() {
            match state.state_of(*player) {
                Some(entry) if entry.complete => continue,
                _ => return Some("completion regression"),
            }
        }
        None
    }

    fn apply(&mut self, row: &Stamped) -> Vec<Cue> {
        let mut cues = Vec::new();
        if !self.started || row.state.current != self.current {
            // new turn: drop local intent and held memory immediately, or a
            // prior turn's dice can wedge the fresh state out of view
            self.intent = None;
            self.held.clear();
            self.started = true;
            self.current = row.state.current;
            cues.push(Cue::TurnChanged {
                player: self.current,
            });
        }
        let variant = row.state.variant;
        for player in row.state.turn_order.iter().copied() {
            let Some(entry) = row.state.state_of(player) else {
                continue;
            };
            let fresh = entry.roll_key > self.seen.get(&player).copied().unwrap_or(0);
            let settled = self.done.contains(&player);
            let before = self.rolls.get(&player).copied().unwrap_or(variant.rolls());
            if entry.complete {
                if !settled {
                    self.done.insert(player);
                    if let Some(result) = entry.result {
                        cues.push(Cue::Completed { player, result });
                    }
                }
            } else if fresh {
                if entry.rolls_remaining < before {
                    cues.push(Cue::Roll {
                        player,
                        first: entry.rolls_remaining + 1 == variant.rolls(),
                    });
                } else {
                    cues.push(Cue::Settle {
                        player,
                        dice: entry.dice.clone(),
                    });
                }
            } else if entry.held() > self.held.get(&player).copied().unwrap_or(0) {
                cues.push(Cue::Held {
                    player,
                    mask: held_mask(&entry.dice),
                });
            }
            self.seen.insert(player, entry.roll_key);
            self.held.insert(player, entry.held());
            self.rolls.insert(player, entry.rolls_remaining);
        }
        if row.state.phase == Phase::Complete && !self.finished {
            self.finished = true;
            cues.push(Cue::Finished {
                winners: row.state.winners.clone(),
            });
        }
        self.accepted = Some(row.clone());
        cues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn base() -> RoundState {
        RoundState::new(1, Variant::Horses, vec![10, 20], BTreeSet::new()).open(0)
    }

    fn rolled(state: &RoundState, player: PlayerId, key: RollKey, rolls: u8, values: [u8; 5]) -> RoundState {
        let mut next = state.clone();
        let entry = next.entry(player);
        entry.roll_key = key;
        entry.rolls_remaining = rolls;
        entry.dice = values
            .iter()
            .map(|v| Die {
                value: *v,
                held: false,
                tag: None,
            })
            .collect();
        next
    }

    fn row(state: RoundState, version: u64) -> Stamped {
        Stamped { version, state }
    }

    #[test]
    fn first_row_announces_turn() {
        let mut context = Context::new(1);
        let cues = context.observe(&row(base(), 1), 0);
        assert!(cues == vec![Cue::TurnChanged { player: Some(10) }]);
    }

    #[test]
    fn roll_key_only_moves_forward() {
        let mut context = Context::new(1);
        context.observe(&row(base(), 1), 0);
        let newer = rolled(&base(), 10, 500, 2, [3, 3, 3, 5, 6]);
        let older = rolled(&base(), 10, 400, 3, [1, 1, 1, 1, 1]);
        assert!(!context.observe(&row(newer.clone(), 3), 0).is_empty());
        // late delivery of the older write produces no visible change
        assert!(context.observe(&row(older, 2), 0).is_empty());
        assert!(context.accepted().unwrap().state == newer);
    }

    #[test]
    fn held_never_shrinks_within_a_roll() {
        let mut context = Context::new(1);
        context.observe(&row(base(), 1), 0);
        context.observe(&row(rolled(&base(), 10, 500, 2, [3, 3, 1, 5, 6]), 2), 0);
        let mut two = rolled(&base(), 10, 500, 2, [3, 3, 1, 5, 6]);
        two.entry(10).dice[0].held = true;
        two.entry(10).dice[1].held = true;
        let mut one = rolled(&base(), 10, 500, 2, [3, 3, 1, 5, 6]);
        one.entry(10).dice[0].held = true;
        let cues = context.observe(&row(two, 4), 0);
        assert!(cues.contains(&Cue::Held {
            player: 10,
            mask: vec![true, true, false, false, false],
        }));
        assert!(context.observe(&row(one, 3), 0).is_empty());
    }

    #[test]
    fn final_roll_animates_but_bookkeeping_does_not() {
        let mut context = Context::new(1);
        context.observe(&row(base(), 1), 0);
        context.observe(&row(rolled(&base(), 10, 500, 1, [2, 2, 3, 4, 5]), 2), 0);
        // 1 -> 0 is a genuine last roll
        let last = rolled(&base(), 10, 600, 0, [2, 2, 3, 4, 6]);
        let cues = context.observe(&row(last.clone(), 3), 0);
        assert!(cues == vec![Cue::Roll { player: 10, first: false }]);
        // 0 -> 0 with a key bump is bookkeeping, shown instantly
        let bump = rolled(&last, 10, 700, 0, [2, 2, 3, 4, 6]);
        let cues = context.observe(&row(bump.clone(), 4), 0);
        assert!(matches!(cues.as_slice(), [Cue::Settle { player: 10, .. }]));
    }

    #[test]
    fn first_roll_flagged_for_short_window() {
        let mut context = Context::new(1);
        context.observe(&row(base(), 1), 0);
        let first = rolled(&base(), 10, 500, 2, [1, 2, 3, 4, 5]);
        let cues = context.observe(&row(first, 2), 0);
        assert!(cues == vec![Cue::Roll { player: 10, first: true }]);
    }

    #[test]
    fn completion_sticks() {
        let mut context = Context::new(1);
        context.observe(&row(base(), 1), 0);
        let mut done = rolled(&base(), 10, 500, 0, [2, 2, 2, 4, 5]);
        done.entry(10).finish(Variant::Horses);
        let cues = context.observe(&row(done, 2), 0);
        assert!(matches!(cues.as_slice(), [Cue::Completed { player: 10, .. }]));
        // stale incomplete snapshot of the same player is dropped
        let stale = rolled(&base(), 10, 500, 1, [2, 2, 2, 4, 5]);
        assert!(context.observe(&row(stale, 3), 0).is_empty());
    }

    #[test]
    fn turn_change_clears_local_shield() {
        let mut context = Context::new(1);
        context.observe(&row(base(), 1), 0);
        context.intend(LocalIntent {
            round: 1,
            player: 10,
            dice: vec![Die { value: 4, held: false, tag: None }; 5],
            rolls_remaining: 1,
            roll_key: 900,
            touched: 0,
        });
        // while shielded, a regressive row for our own turn is dropped
        let echo = rolled(&base(), 10, 0, 3, [0, 0, 0, 0, 0]);
        assert!(context.observe(&row(echo, 2), 10).is_empty());
        // a forced handoff lands unconditionally
        let mut moved = rolled(&base(), 10, 950, 0, [4, 4, 4, 4, 4]);
        moved.entry(10).finish(Variant::Horses);
        moved.advance(0);
        let cues = context.observe(&row(moved, 3), 10);
        assert!(cues.contains(&Cue::TurnChanged { player: Some(20) }));
    }

    #[test]
    fn round_completion_reports_winners() {
        let mut context = Context::new(1);
        context.observe(&row(base(), 1), 0);
        let mut state = base();
        for player in [10, 20] {
            let entry = state.entry(player);
            entry.dice = vec![Die { value: 5, held: false, tag: None }; 5];
            entry.roll_key = 100 + player;
            entry.rolls_remaining = 0;
            entry.finish(Variant::Horses);
        }
        state.finish();
        let cues = context.observe(&row(state, 5), 0);
        assert!(cues.contains(&Cue::Finished { winners: vec![10, 20] }));
    }
}
