use super::*;
use crate::dice::*;
use crate::round::*;
use crate::store::*;
use crate::{Millis, PlayerId, RoundId, now_ms};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::sync::Arc;

/// Stateless deadline watchdog. Any connected client may invoke it, as
/// often as it likes, including concurrently: every mutation is a
/// version-conditional write, so when two passes race, exactly one set of
/// corrections lands and the loser observes a conflict and stops. This is
/// the liveness backstop for clients that vanish mid-turn.
pub struct Enforcer<S> {
    store: Arc<S>,
}

impl<S: RoundStore> Enforcer<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn enforce(&self, round: RoundId) -> anyhow::Result<Vec<Correction>> {
        self.enforce_at(round, now_ms()).await
    }

    pub async fn enforce_at(&self, round: RoundId, now: Millis) -> anyhow::Result<Vec<Correction>> {
        let Some(row) = self.store.fetch(round).await? else {
            return Ok(Vec::new());
        };
        if row.state.phase != Phase::Playing {
            return Ok(Vec::new());
        }
        if row.state.all_complete() {
            // the owning client declared complete and vanished before
            // advancing; finish on its behalf
            return self.finalize(row).await;
        }
        match (row.state.current, row.state.deadline) {
            (None, _) => self.nudge(row, now).await,
            (Some(player), Some(deadline)) if now >= deadline => {
                match row.state.is_complete(player) {
                    // locked in, but the client died before handing off:
                    // the hand is final, only the pointer needs moving
                    true => self.nudge(row, now).await,
                    false => self.force(row, player, now).await,
                }
            }
            _ => Ok(Vec::new()),
        }
    }

    /// Force-complete an abandoned turn from whatever state is recorded,
    /// rolling fresh dice only when none were taken at all, then advance.
    /// Humans additionally get the sit-out penalty; for bots this is the
    /// last resort when no controller appears to be driving at all.
    async fn force(&self, row: Stamped, player: PlayerId, now: Millis) -> anyhow::Result<Vec<Correction>> {
        let mut state = row.state.clone();
        let variant = state.variant;
        let bot = state.is_bot(player);
        let entry = state.entry(player);
        if !entry.rolled() {
            let ref mut rng = SmallRng::from_os_rng();
            variant.roll(&mut entry.dice, rng);
        }
        entry.roll_key = std::cmp::max(entry.roll_key + 1, now);
        entry.rolls_remaining = 0;
        entry.sit_out = !bot;
        entry.finish(variant);
        state.advance(now);
        let mut corrections = vec![match bot {
            true => Correction::ForcedBot(player),
            false => Correction::ForcedFold(player),
        }];
        match state.phase {
            Phase::Complete => corrections.push(Correction::Finalized(state.winners.clone())),
            _ => corrections.push(Correction::Advanced(state.current)),
        }
        self.commit(row.version, state, corrections).await
    }

    /// All hands complete, round still open: compute winners and close it.
    async fn finalize(&self, row: Stamped) -> anyhow::Result<Vec<Correction>> {
        let mut state = row.state.clone();
        state.finish();
        let corrections = vec![Correction::Finalized(state.winners.clone())];
        self.commit(row.version, state, corrections).await
    }

    /// Advance without touching any hand: the turn pointer is missing, or
    /// it still sits on a hand that already locked in. No penalty applies.
    async fn nudge(&self, row: Stamped, now: Millis) -> anyhow::Result<Vec<Correction>> {
        let mut state = row.state.clone();
        state.advance(now);
        let corrections = vec![match state.phase {
            Phase::Complete => Correction::Finalized(state.winners.clone()),
            _ => Correction::Advanced(state.current),
        }];
        self.commit(row.version, state, corrections).await
    }

    async fn commit(
        &self,
        expect: u64,
        state: RoundState,
        corrections: Vec<Correction>,
    ) -> anyhow::Result<Vec<Correction>> {
        let round = state.round;
        match self.store.update(expect, state).await? {
            Swap::Applied(_) => {
                for correction in corrections.iter() {
                    log::info!("round {}: {}", round, correction);
                }
                Ok(corrections)
            }
            Swap::Conflict(_) => {
                // success by another actor
                log::debug!("round {}: corrections already applied elsewhere", round);
                Ok(Vec::new())
            }
        }
    }
}
