use super::*;
use crate::round::*;
use crate::store::*;
use crate::{RoundId, UserId};
use std::sync::Arc;
use tokio::sync::Mutex;

/// External chip-accounting collaborator. Implementations persist pot
/// settlement however they like; the core only guarantees each round is
/// handed off exactly once.
#[async_trait::async_trait]
pub trait Ledger: Send + Sync {
    async fn settle(&self, outcome: &Outcome) -> anyhow::Result<()>;
}

/// Ledger that records outcomes in memory and logs them. Used by the demo
/// binary and as a test double.
#[derive(Default)]
pub struct Journal {
    settled: Mutex<Vec<Outcome>>,
}

impl Journal {
    pub async fn outcomes(&self) -> Vec<Outcome> {
        self.settled.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl Ledger for Journal {
    async fn settle(&self, outcome: &Outcome) -> anyhow::Result<()> {
        log::info!(
            "round {} settled: winners {:?} (tie: {})",
            outcome.round,
            outcome.winners,
            outcome.tie
        );
        self.settled.lock().await.push(outcome.clone());
        Ok(())
    }
}

/// Claim-then-settle. Every client observing a completed round may call
/// this; the conditional write on `settled_by` guarantees exactly one of
/// them reaches the ledger, and the rest adopt that claim silently.
pub async fn process_win<S: RoundStore>(
    store: &S,
    ledger: &dyn Ledger,
    round: RoundId,
    user: UserId,
) -> anyhow::Result<bool> {
    let Some(row) = store.fetch(round).await? else {
        return Ok(false);
    };
    if row.state.phase != Phase::Complete || row.state.settled_by.is_some() {
        return Ok(false);
    }
    let mut state = row.state.clone();
    state.settled_by = Some(user);
    match store.update(row.version, state).await? {
        Swap::Applied(row) => {
            ledger.settle(&Outcome::from(&row.state)).await?;
            Ok(true)
        }
        Swap::Conflict(_) => Ok(false),
    }
}
