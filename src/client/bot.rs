use super::*;
use crate::round::*;
use crate::store::*;
use crate::sync::*;
use crate::{PlayerId, RoundId, UserId};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use tokio::sync::Mutex;

/// Simulates a bot's turn on behalf of the whole table. Exactly one client
/// may do this: the winner of the controller claim. Everyone else displays
/// whatever the winner publishes and never re-simulates.
///
/// The loop is cooperative: the cancel flag and the live row are checked at
/// every suspension point, so a driver whose turn was taken away (client
/// shutdown, enforcer force-completion, a racing controller) becomes a
/// no-op instead of corrupting the round with late writes.
pub struct BotDriver<S> {
    store: Arc<S>,
    context: Arc<Mutex<Context>>,
    round: RoundId,
    user: UserId,
    lock: Arc<BotLock>,
    cancel: Arc<AtomicBool>,
}

impl<S: RoundStore> BotDriver<S> {
    pub fn new(
        store: Arc<S>,
        context: Arc<Mutex<Context>>,
        round: RoundId,
        user: UserId,
        lock: Arc<BotLock>,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            store,
            context,
            round,
            user,
            lock,
            cancel,
        }
    }

    /// Claim the controller role, or adopt whoever already committed it.
    /// Never act on a locally computed candidate without observing the
    /// committed value.
    pub async fn elect(&self) -> anyhow::Result<UserId> {
        self.store.claim_controller(self.round, self.user).await
    }

    /// Run one bot turn to completion. Returns quietly when this client is
    /// not the controller, the turn moved on, or another local driver holds
    /// the lock.
    pub async fn drive(&self, bot: PlayerId) -> anyhow::Result<()> {
        let Some(_permit) = self.lock.acquire() else {
            return Ok(());
        };
        let winner = self.elect().await?;
        if winner != self.user {
            log::debug!("round {}: controller is {}, standing down", self.round, winner);
            return Ok(());
        }
        let turn = ActiveTurn::new(self.store.clone(), self.context.clone(), self.round, bot);
        loop {
            if self.cancel.load(Ordering::Relaxed) {
                log::debug!("round {}: bot driver cancelled", self.round);
                return Ok(());
            }
            // never trust in-memory state across a suspension: re-read the
            // authoritative row before every step
            let Some(row) = self.store.fetch(self.round).await? else {
                return Ok(());
            };
            let state = row.state;
            if state.phase != Phase::Playing || state.current != Some(bot) {
                log::debug!("round {}: turn moved off P{}, stopping driver", self.round, bot);
                return Ok(());
            }
            let entry = state
                .state_of(bot)
                .cloned()
                .unwrap_or_else(|| PlayerDiceState::from(state.variant));
            let choice = match entry.rolled() {
                false => Choice::Roll(vec![false; entry.dice.len()]),
                true => decide(state.variant, &entry, state.best_rival(bot)),
            };
            match choice {
                Choice::Stop => {
                    turn.lock_in().await?;
                    return Ok(());
                }
                Choice::Roll(mask) => {
                    self.hold(&turn, &entry, mask).await?;
                    turn.roll().await?;
                    // pacing so observers watch dice animate rather than
                    // resolve instantly
                    tokio::time::sleep(Self::pace()).await;
                }
            }
        }
    }

    /// Line the holds up with the policy's mask before the next roll.
    async fn hold(
        &self,
        turn: &ActiveTurn<S>,
        entry: &PlayerDiceState,
        mask: Vec<bool>,
    ) -> anyhow::Result<()> {
        for (index, want) in mask.iter().enumerate() {
            let held = entry.dice.get(index).map(|d| d.held).unwrap_or(false);
            if held != *want && entry.rolled() {
                turn.toggle_hold(index).await?;
            }
        }
        Ok(())
    }

    fn pace() -> std::time::Duration {
        std::time::Duration::from_millis(800)
    }
}
