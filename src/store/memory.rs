use super::*;
use crate::round::*;
use crate::{RoundId, UserId};
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use tokio::sync::broadcast;

/// In-process round store. Rows are kept as the same JSON blobs the real
/// backing table would hold, so every read round-trips through the document
/// encoding rather than sharing memory with writers.
pub struct MemoryStore {
    rows: Mutex<BTreeMap<RoundId, (u64, String)>>,
    feeds: Mutex<BTreeMap<RoundId, broadcast::Sender<Stamped>>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            rows: Mutex::new(BTreeMap::new()),
            feeds: Mutex::new(BTreeMap::new()),
        }
    }
}

impl MemoryStore {
    fn decode(body: &str) -> anyhow::Result<RoundState> {
        serde_json::from_str(body).map_err(|e| anyhow::anyhow!("malformed round document: {}", e))
    }
    fn encode(state: &RoundState) -> anyhow::Result<String> {
        serde_json::to_string(state).map_err(|e| anyhow::anyhow!("unencodable round document: {}", e))
    }
    async fn feed(&self, round: RoundId) -> broadcast::Sender<Stamped> {
        self.feeds
            .lock()
            .await
            .entry(round)
            .or_insert_with(|| broadcast::channel(Self::backlog()).0)
            .clone()
    }
    async fn notify(&self, row: Stamped) {
        // nobody listening is fine
        let _ = self.feed(row.state.round).await.send(row);
    }
    fn backlog() -> usize {
        64
    }
}

#[async_trait::async_trait]
impl RoundStore for MemoryStore {
    async fn fetch(&self, round: RoundId) -> anyhow::Result<Option<Stamped>> {
        match self.rows.lock().await.get(&round) {
            Some((version, body)) => Ok(Some(Stamped {
                version: *version,
                state: Self::decode(body)?,
            })),
            None => Ok(None),
        }
    }

    async fn insert(&self, state: RoundState) -> anyhow::Result<Stamped> {
        let round = state.round;
        let row = {
            let mut rows = self.rows.lock().await;
            if rows.contains_key(&round) {
                anyhow::bail!("round {} already exists", round);
            }
            rows.insert(round, (1, Self::encode(&state)?));
            Stamped { version: 1, state }
        };
        self.notify(row.clone()).await;
        Ok(row)
    }

    async fn update(&self, expect: u64, state: RoundState) -> anyhow::Result<Swap> {
        let round = state.round;
        let swap = {
            let mut rows = self.rows.lock().await;
            let (version, body) = rows
                .get_mut(&round)
                .ok_or_else(|| anyhow::anyhow!("round {} not found", round))?;
            if *version == expect {
                *version += 1;
                *body = Self::encode(&state)?;
                Swap::Applied(Stamped {
                    version: *version,
                    state,
                })
            } else {
                Swap::Conflict(Stamped {
                    version: *version,
                    state: Self::decode(body)?,
                })
            }
        };
        if let Swap::Applied(ref row) = swap {
            self.notify(row.clone()).await;
        }
        Ok(swap)
    }

    async fn claim_controller(&self, round: RoundId, user: UserId) -> anyhow::Result<UserId> {
        let (winner, row) = {
            let mut rows = self.rows.lock().await;
            let (version, body) = rows
                .get_mut(&round)
                .ok_or_else(|| anyhow::anyhow!("round {} not found", round))?;
            let mut state = Self::decode(body)?;
            match state.controller {
                Some(winner) => (winner, None),
                None => {
                    state.controller = Some(user);
                    *version += 1;
                    *body = Self::encode(&state)?;
                    (
                        user,
                        Some(Stamped {
                            version: *version,
                            state,
                        }),
                    )
                }
            }
        };
        if let Some(row) = row {
            self.notify(row).await;
        }
        Ok(winner)
    }

    async fn subscribe(&self, round: RoundId) -> anyhow::Result<broadcast::Receiver<Stamped>> {
        Ok(self.feed(round).await.subscribe())
    }
}
