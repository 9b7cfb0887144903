use super::*;
use crate::enforcer::*;
use crate::round::*;
use crate::store::*;
use crate::sync::*;
use crate::table::*;
use crate::{PlayerId, RoundId, UserId, now_ms};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use tokio::sync::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::mpsc::unbounded_channel;

/// One connected session at the table. Subscribes to the round feed, routes
/// every row through its reconciliation context, and plays its role:
/// - active player: the UI drives the `turn()` handle directly
/// - controller: spawns the bot driver when a bot is up
/// - observer: forwards presentation cues and nothing else
/// Every client also sweeps deadlines on a poll interval; the sweep is
/// idempotent so overlapping clients cost nothing.
pub struct TableClient<S> {
    store: Arc<S>,
    user: UserId,
    round: RoundId,
    ledger: Arc<dyn Ledger>,
    context: Arc<Mutex<Context>>,
    lock: Arc<BotLock>,
    closing: Arc<AtomicBool>,
    cues: UnboundedSender<Cue>,
}

pub struct ClientHandle {
    closing: Arc<AtomicBool>,
    task: tokio::task::JoinHandle<()>,
}

impl ClientHandle {
    pub fn close(&self) {
        self.closing.store(true, Ordering::Relaxed);
    }
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

impl<S: RoundStore + 'static> TableClient<S> {
    /// Returns the client and the stream of presentation cues it emits.
    pub fn new(
        store: Arc<S>,
        user: UserId,
        round: RoundId,
        ledger: Arc<dyn Ledger>,
    ) -> (Self, UnboundedReceiver<Cue>) {
        let (cues, feed) = unbounded_channel();
        let client = Self {
            store,
            user,
            round,
            ledger,
            context: Arc::new(Mutex::new(Context::new(round))),
            lock: Arc::new(BotLock::default()),
            closing: Arc::new(AtomicBool::new(false)),
            cues,
        };
        (client, feed)
    }

    /// Controller for a seat this session owns, sharing our context so its
    /// optimistic edits shield against our own incoming echoes.
    pub fn turn(&self, player: PlayerId) -> ActiveTurn<S> {
        ActiveTurn::new(self.store.clone(), self.context.clone(), self.round, player)
    }

    pub fn spawn(self) -> ClientHandle {
        let closing = self.closing.clone();
        let task = tokio::spawn(self.run());
        ClientHandle { closing, task }
    }

    async fn run(self) {
        let mut feed = match self.store.subscribe(self.round).await {
            Ok(feed) => feed,
            Err(e) => {
                log::warn!("round {}: could not subscribe: {}", self.round, e);
                return;
            }
        };
        let enforcer = Enforcer::new(self.store.clone());
        // catch up before the first notification
        if let Ok(Some(row)) = self.store.fetch(self.round).await {
            self.handle(&row).await;
        }
        loop {
            if self.closing.load(Ordering::Relaxed) || self.settled().await {
                break;
            }
            tokio::select! {
                row = feed.recv() => match row {
                    Ok(row) => self.handle(&row).await,
                    Err(RecvError::Lagged(n)) => {
                        log::warn!("round {}: dropped {} notifications, refetching", self.round, n);
                        if let Ok(Some(row)) = self.store.fetch(self.round).await {
                            self.handle(&row).await;
                        }
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = tokio::time::sleep(Self::poll()) => {
                    // liveness backstop: transient store errors just wait
                    // for the next tick
                    if let Err(e) = enforcer.enforce(self.round).await {
                        log::warn!("round {}: enforcement failed: {}", self.round, e);
                    }
                    if let Ok(Some(row)) = self.store.fetch(self.round).await {
                        self.handle(&row).await;
                    }
                }
            }
        }
    }

    async fn handle(&self, row: &Stamped) {
        let cues = self.context.lock().await.observe(row, now_ms());
        for cue in cues {
            let _ = self.cues.send(cue);
        }
        let Some(state) = self.context.lock().await.accepted().map(|r| r.state.clone()) else {
            return;
        };
        if state.phase == Phase::Playing {
            self.maybe_drive(&state);
        }
        if state.phase == Phase::Complete && state.settled_by.is_none() {
            match process_win(self.store.as_ref(), self.ledger.as_ref(), self.round, self.user).await {
                Ok(true) => log::info!("round {}: settled by {}", self.round, self.user),
                Ok(false) => {}
                Err(e) => log::warn!("round {}: settlement failed: {}", self.round, e),
            }
        }
    }

    /// Start the bot driver when a bot is up and we are (or are about to
    /// be) the controller. The deterministic candidate is the first human
    /// in turn order; the driver still races an atomic claim before acting.
    fn maybe_drive(&self, state: &RoundState) {
        let Some(bot) = state.current.filter(|p| state.is_bot(*p)) else {
            return;
        };
        let candidate = state.controller.or_else(|| state.elected());
        if candidate != Some(self.user) {
            return;
        }
        let driver = BotDriver::new(
            self.store.clone(),
            self.context.clone(),
            self.round,
            self.user,
            self.lock.clone(),
            self.closing.clone(),
        );
        tokio::spawn(async move {
            driver
                .drive(bot)
                .await
                .inspect_err(|e| log::warn!("bot driver for P{} failed: {}", bot, e))
        });
    }

    async fn settled(&self) -> bool {
        let context = self.context.lock().await;
        context.finished()
            && context
                .accepted()
                .map(|row| row.state.settled_by.is_some())
                .unwrap_or(false)
    }

    fn poll() -> std::time::Duration {
        std::time::Duration::from_secs(5)
    }
}
