use super::*;
use crate::dice::*;
use crate::round::*;
use crate::{Millis, PlayerId, RollKey, RoundId};

/// The acting player's optimistic slot. Updated on every local edit before
/// the write lands; incoming rows are merged against it instead of being
/// trusted blindly, because the write-then-read path is not ordered and a
/// late echo would snap the dice backward under the player's cursor.
#[derive(Debug, Clone)]
pub struct LocalIntent {
    pub round: RoundId,
    pub player: PlayerId,
    pub dice: Vec<Die>,
    pub rolls_remaining: u8,
    pub roll_key: RollKey,
    /// When the most recent local edit started.
    pub touched: Millis,
}

impl LocalIntent {
    /// The protection window is bounded so a genuine external correction
    /// (a server-forced timeout) still lands once animations are over.
    pub fn shielded(&self, now: Millis) -> bool {
        now < self.touched + Self::window().as_millis() as Millis
    }
    /// Longest possible animation span: a re-roll plus the settle dwell.
    pub fn window() -> std::time::Duration {
        Cue::reroll() + Cue::dwell()
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Verdict {
    Accept,
    Reject(&'static str),
}

/// Merge predicate between the local optimistic slot and an incoming row.
/// Returns Reject only while the protection window is open and only for
/// rows that would visibly regress the acting player's own dice.
pub fn reconcile(local: &LocalIntent, incoming: &RoundState, now: Millis) -> Verdict {
    if incoming.round != local.round {
        return Verdict::Accept;
    }
    if incoming.current != Some(local.player) {
        // the turn moved on under us; local memory gets cleared either way
        return Verdict::Accept;
    }
    if !local.shielded(now) {
        return Verdict::Accept;
    }
    let Some(remote) = incoming.state_of(local.player) else {
        return Verdict::Reject("own entry missing from snapshot");
    };
    if remote.rolls_remaining > local.rolls_remaining {
        return Verdict::Reject("behind on rolls");
    }
    if !remote.rolled() && any_rolled(&local.dice) {
        return Verdict::Reject("unrolled echo of a rolled hand");
    }
    if remote.rolls_remaining == local.rolls_remaining {
        let values = |dice: &[Die]| dice.iter().map(|d| d.value).collect::<Vec<_>>();
        if values(&remote.dice) != values(&local.dice) {
            return Verdict::Reject("divergent dice for same roll");
        }
        if remote.held() < held_count(&local.dice) {
            return Verdict::Reject("held regression for same roll");
        }
    }
    Verdict::Accept
}
