use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

/// Local single-flight guard around bot simulation, with a bounded lease.
/// If a driver coroutine hangs past the lease (a store call that never
/// resolves), the next acquire steals the lock so the turn can be retried
/// instead of one wedged task stalling the table.
#[derive(Debug, Default)]
pub struct BotLock {
    holder: Mutex<Option<(u64, Instant)>>,
    tokens: AtomicU64,
}

#[derive(Debug)]
pub struct BotPermit {
    lock: Arc<BotLock>,
    token: u64,
}

impl BotLock {
    pub fn acquire(self: &Arc<Self>) -> Option<BotPermit> {
        let mut holder = self.holder.lock().expect("bot lock poisoned");
        if let Some((token, since)) = *holder {
            if since.elapsed() < Self::lease() {
                return None;
            }
            log::warn!("bot driver {} exceeded its lease, stealing the lock", token);
        }
        let token = self.tokens.fetch_add(1, Ordering::Relaxed) + 1;
        *holder = Some((token, Instant::now()));
        Some(BotPermit {
            lock: self.clone(),
            token,
        })
    }

    fn lease() -> Duration {
        Duration::from_secs(10)
    }
}

impl Drop for BotPermit {
    fn drop(&mut self) {
        let mut holder = self.lock.holder.lock().expect("bot lock poisoned");
        // a stolen lock belongs to its new holder now
        if holder.map(|(token, _)| token) == Some(self.token) {
            *holder = None;
        }
    }
}
