use crate::dice::*;
use crate::round::*;
use crate::store::*;
use crate::sync::*;
use crate::{Millis, PlayerId, RoundId, now_ms};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Drives one seat's own turn: optimistic local edits first, then a
/// version-conditional write of the acting player's entry. Everything here
/// runs for the local human; the bot driver reuses it verbatim for the seat
/// it simulates, so both paths persist and advance identically.
pub struct ActiveTurn<S> {
    store: Arc<S>,
    context: Arc<Mutex<Context>>,
    round: RoundId,
    player: PlayerId,
}

impl<S: RoundStore> ActiveTurn<S> {
    pub fn new(store: Arc<S>, context: Arc<Mutex<Context>>, round: RoundId, player: PlayerId) -> Self {
        Self {
            store,
            context,
            round,
            player,
        }
    }

    /// Roll every unheld die. The fresh roll key is wall-clock derived and
    /// forced past the previous key, so it is strictly increasing even when
    /// two rolls land within one millisecond.
    pub async fn roll(&self) -> anyhow::Result<Stamped> {
        let row = self.snapshot().await?;
        let state = &row.state;
        anyhow::ensure!(state.phase == Phase::Playing, "round is {}", state.phase);
        anyhow::ensure!(state.current == Some(self.player), "not our turn");
        let variant = state.variant;
        let mut entry = state
            .state_of(self.player)
            .cloned()
            .unwrap_or_else(|| PlayerDiceState::from(variant));
        anyhow::ensure!(!entry.complete, "hand already locked in");
        anyhow::ensure!(entry.rolls_remaining > 0, "no rolls remaining");
        let now = now_ms();
        if entry.rolls_remaining == 1 {
            // layout snapshot for observers reconstructing the last roll
            entry.held_mask = Some(held_mask(&entry.dice));
        }
        let ref mut rng = SmallRng::from_os_rng();
        variant.roll(&mut entry.dice, rng);
        entry.rolls_remaining -= 1;
        entry.roll_key = std::cmp::max(entry.roll_key + 1, now);
        self.intend(&entry, now).await;
        self.persist(row, entry).await
    }

    /// Flip a hold and persist immediately. A lagging hold is worse than a
    /// lagging roll: the next roll would silently un-hold a die the player
    /// believed was protected.
    pub async fn toggle_hold(&self, index: usize) -> anyhow::Result<Stamped> {
        let row = self.snapshot().await?;
        let state = &row.state;
        anyhow::ensure!(state.current == Some(self.player), "not our turn");
        let variant = state.variant;
        let mut entry = state
            .state_of(self.player)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no dice to hold before the first roll"))?;
        anyhow::ensure!(!entry.complete, "hand already locked in");
        anyhow::ensure!(entry.rolled(), "no dice to hold before the first roll");
        anyhow::ensure!(
            variant.can_toggle(&entry.dice, index),
            "die {} cannot be toggled",
            index
        );
        entry.dice[index].held = !entry.dice[index].held;
        self.intend(&entry, now_ms()).await;
        self.persist(row, entry).await
    }

    /// Freeze the dice as final, evaluate, persist, and after a short pause
    /// hand the turn to the next player.
    pub async fn lock_in(&self) -> anyhow::Result<Stamped> {
        let row = self.snapshot().await?;
        let state = &row.state;
        anyhow::ensure!(state.current == Some(self.player), "not our turn");
        let variant = state.variant;
        let mut entry = state
            .state_of(self.player)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("cannot lock in before rolling"))?;
        anyhow::ensure!(!entry.complete, "hand already locked in");
        anyhow::ensure!(entry.rolls_remaining < variant.rolls(), "cannot lock in before rolling");
        entry.finish(variant);
        log::info!("P{} locks in {}", self.player, entry.result.expect("just evaluated"));
        let row = self.persist(row, entry).await?;
        tokio::time::sleep(Self::pause()).await;
        self.advance().await?;
        Ok(row)
    }

    /// Move the turn pointer off our completed hand. Losing this write
    /// means another actor advanced for us, which is just as good.
    pub async fn advance(&self) -> anyhow::Result<()> {
        let Some(row) = self.store.fetch(self.round).await? else {
            anyhow::bail!("round {} missing", self.round);
        };
        if row.state.current != Some(self.player) || !row.state.is_complete(self.player) {
            return Ok(());
        }
        let mut state = row.state.clone();
        state.advance(now_ms());
        match self.store.update(row.version, state).await? {
            Swap::Applied(row) => self.context.lock().await.absorb(&row),
            Swap::Conflict(_) => log::debug!("turn already advanced past P{}", self.player),
        }
        Ok(())
    }

    /// Record the optimistic slot before the write leaves the client.
    async fn intend(&self, entry: &PlayerDiceState, now: Millis) {
        self.context.lock().await.intend(LocalIntent {
            round: self.round,
            player: self.player,
            dice: entry.dice.clone(),
            rolls_remaining: entry.rolls_remaining,
            roll_key: entry.roll_key,
            touched: now,
        });
    }

    /// Conditional write of our entry, rebased onto the current row when a
    /// concurrent bookkeeping write bumps the version under us. The dice we
    /// already showed the player never change across a rebase.
    async fn persist(&self, mut row: Stamped, entry: PlayerDiceState) -> anyhow::Result<Stamped> {
        for _ in 0..Self::retries() {
            anyhow::ensure!(
                row.state.current == Some(self.player) && !row.state.is_complete(self.player),
                "turn moved on mid-write"
            );
            let mut state = row.state.clone();
            *state.entry(self.player) = entry.clone();
            match self.store.update(row.version, state).await? {
                Swap::Applied(applied) => {
                    self.context.lock().await.absorb(&applied);
                    return Ok(applied);
                }
                Swap::Conflict(current) => row = current,
            }
        }
        anyhow::bail!("write for P{} lost {} straight races", self.player, Self::retries())
    }

    async fn snapshot(&self) -> anyhow::Result<Stamped> {
        if let Some(row) = self.context.lock().await.accepted().cloned() {
            return Ok(row);
        }
        self.store
            .fetch(self.round)
            .await?
            .ok_or_else(|| anyhow::anyhow!("round {} missing", self.round))
    }

    fn retries() -> usize {
        4
    }
    /// Dwell between lock-in and turn advance, so the completed hand stays
    /// on the felt instead of flashing straight to the next player.
    fn pause() -> std::time::Duration {
        Cue::dwell()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    async fn setup() -> (Arc<MemoryStore>, ActiveTurn<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        let state = RoundState::new(1, Variant::Horses, vec![10, 20], BTreeSet::new()).open(0);
        store.insert(state).await.unwrap();
        let context = Arc::new(Mutex::new(Context::new(1)));
        let turn = ActiveTurn::new(store.clone(), context, 1, 10);
        (store, turn)
    }

    #[tokio::test(start_paused = true)]
    async fn full_turn_rolls_holds_and_locks_in() {
        let (store, turn) = setup().await;

        let row = turn.roll().await.unwrap();
        let entry = row.state.state_of(10).unwrap().clone();
        assert!(entry.dice.iter().all(|d| (1..=6).contains(&d.value)));
        assert!(entry.rolls_remaining == 2);
        assert!(entry.roll_key > 0);

        let row = turn.toggle_hold(0).await.unwrap();
        let kept = row.state.state_of(10).unwrap().dice[0];
        assert!(kept.held);

        let row = turn.roll().await.unwrap();
        let again = row.state.state_of(10).unwrap().clone();
        assert!(again.dice[0].value == kept.value);
        assert!(again.rolls_remaining == 1);
        assert!(again.roll_key > entry.roll_key);

        turn.lock_in().await.unwrap();
        let row = store.fetch(1).await.unwrap().unwrap();
        let done = row.state.state_of(10).unwrap();
        assert!(done.complete);
        assert!(done.result.is_some());
        // the pause elapsed and the turn moved to the next seat
        assert!(row.state.current == Some(20));
    }

    #[tokio::test]
    async fn roll_requires_the_turn() {
        let (_, turn) = setup().await;
        let intruder = ActiveTurn::new(turn.store.clone(), turn.context.clone(), 1, 20);
        assert!(intruder.roll().await.is_err());
    }

    #[tokio::test]
    async fn holds_rejected_before_first_roll() {
        let (_, turn) = setup().await;
        assert!(turn.toggle_hold(0).await.is_err());
    }

    #[tokio::test]
    async fn lock_in_requires_a_roll() {
        let (_, turn) = setup().await;
        assert!(turn.lock_in().await.is_err());
    }

    #[tokio::test]
    async fn final_roll_records_held_layout() {
        let (_, turn) = setup().await;
        turn.roll().await.unwrap();
        turn.toggle_hold(2).await.unwrap();
        turn.roll().await.unwrap();
        let row = turn.roll().await.unwrap();
        let entry = row.state.state_of(10).unwrap();
        assert!(entry.rolls_remaining == 0);
        assert!(entry.held_mask == Some(vec![false, false, true, false, false]));
    }

    #[tokio::test]
    async fn rebases_over_concurrent_version_bumps() {
        let (store, turn) = setup().await;
        turn.roll().await.unwrap();
        // a controller claim bumps the version between our read and write
        store.claim_controller(1, 999).await.unwrap();
        let row = turn.roll().await.unwrap();
        assert!(row.state.controller == Some(999));
        assert!(row.state.state_of(10).unwrap().rolls_remaining == 1);
    }
}
