use crate::round::*;
use crate::{RoundId, UserId};
use tokio::sync::broadcast;

/// A versioned copy of the round document as read from the store.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Stamped {
    pub version: u64,
    pub state: RoundState,
}

/// Outcome of a conditional write. A conflict is not an error: it means
/// another actor already advanced the row, and carries the row they wrote so
/// the caller can adopt it instead of retrying blindly.
#[derive(Debug, Clone)]
pub enum Swap {
    Applied(Stamped),
    Conflict(Stamped),
}

impl Swap {
    pub fn applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// The external persistence collaborator: one round document per round,
/// updated only through version-conditional writes, with a push channel
/// carrying full updated rows.
///
/// Neither reads nor notifications are ordered; every consumer rebuilds
/// ordering application-side from roll keys. Writers must never assume
/// their own write is the next thing they read back.
#[async_trait::async_trait]
pub trait RoundStore: Send + Sync {
    async fn fetch(&self, round: RoundId) -> anyhow::Result<Option<Stamped>>;

    /// Create the row for a fresh round. Fails if the round already exists.
    async fn insert(&self, state: RoundState) -> anyhow::Result<Stamped>;

    /// Compare-and-set: applies only while the stored version still equals
    /// `expect`.
    async fn update(&self, expect: u64, state: RoundState) -> anyhow::Result<Swap>;

    /// Atomic set-if-absent on the controller field. Returns the committed
    /// controller whether or not the caller won the race; callers must
    /// adopt the returned value and never act on their own candidate.
    async fn claim_controller(&self, round: RoundId, user: UserId) -> anyhow::Result<UserId>;

    /// Subscribe to full-row change notifications for one round.
    async fn subscribe(&self, round: RoundId) -> anyhow::Result<broadcast::Receiver<Stamped>>;
}
