//! Demo table: one autopiloted human seat and two bots play a round of
//! Horses over the in-memory store, with a second session watching, until
//! the pot is handed off to the ledger.

use dicefelt::client::*;
use dicefelt::dice::*;
use dicefelt::round::*;
use dicefelt::store::*;
use dicefelt::table::*;
use dicefelt::*;
use std::sync::Arc;

const HUMAN: PlayerId = 7;
const ROUND: RoundId = 1;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    log();
    let store = Arc::new(MemoryStore::default());
    let journal = Arc::new(Journal::default());
    let table = Table::new(
        vec![
            Seat { player: 90, human: false },
            Seat { player: HUMAN, human: true },
            Seat { player: 91, human: false },
        ],
        Variant::Horses,
    );
    store.insert(table.deal(ROUND, now_ms())).await?;

    let (client, _) = TableClient::new(store.clone(), HUMAN, ROUND, journal.clone());
    let turn = client.turn(HUMAN);
    let session = client.spawn();
    // the watching session sees every write fresh, so its cue stream is the
    // interesting one to print
    let (watcher, mut cues) = TableClient::new(store.clone(), 55, ROUND, journal.clone());
    let watching = watcher.spawn();
    tokio::spawn(async move {
        while let Some(cue) = cues.recv().await {
            log::info!("cue: {:?}", cue);
            // hold each animated cue for its window, as a renderer would
            if let Some(window) = cue.window() {
                tokio::time::sleep(window).await;
            }
        }
    });

    autopilot(&store, &turn).await?;

    while journal.outcomes().await.is_empty() {
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    }
    for outcome in journal.outcomes().await {
        log::info!(
            "round {} over: winners {:?}, tie {}",
            outcome.round,
            outcome.winners,
            outcome.tie
        );
    }
    session.close();
    watching.close();
    Ok(())
}

/// Play the human seat with the bot heuristic, pacing like a person would.
async fn autopilot(store: &Arc<MemoryStore>, turn: &ActiveTurn<MemoryStore>) -> anyhow::Result<()> {
    loop {
        let Some(row) = store.fetch(ROUND).await? else {
            return Ok(());
        };
        let state = row.state;
        if state.phase == Phase::Complete || state.is_complete(HUMAN) {
            return Ok(());
        }
        if state.current == Some(HUMAN) {
            let entry = state
                .state_of(HUMAN)
                .cloned()
                .unwrap_or_else(|| PlayerDiceState::from(state.variant));
            let choice = match entry.rolled() {
                false => Choice::Roll(vec![false; entry.dice.len()]),
                true => decide(state.variant, &entry, state.best_rival(HUMAN)),
            };
            match choice {
                Choice::Stop => {
                    turn.lock_in().await?;
                    return Ok(());
                }
                Choice::Roll(mask) => {
                    for (index, want) in mask.iter().enumerate() {
                        if entry.rolled() && entry.dice[index].held != *want {
                            turn.toggle_hold(index).await?;
                        }
                    }
                    turn.roll().await?;
                }
            }
        }
        tokio::time::sleep(std::time::Duration::from_millis(400)).await;
    }
}
