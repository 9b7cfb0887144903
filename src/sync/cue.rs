use crate::PlayerId;
use crate::dice::*;
use std::time::Duration;

/// Presentation cues emitted by reconciliation. The rendering layer plays
/// these; nothing in here touches pixels. Cues with a window animate for
/// that long; cues without one apply instantly.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Cue {
    /// A genuine new roll happened. First rolls animate shorter than
    /// re-rolls: the player re-rolling already has context on the table.
    Roll { player: PlayerId, first: bool },
    /// Dice changed without a roll transition (bookkeeping write after the
    /// hand settled). Display instantly, never animate.
    Settle { player: PlayerId, dice: Vec<Die> },
    /// Held dice grew within the current roll.
    Held { player: PlayerId, mask: Vec<bool> },
    /// The player locked in. Final dice stay visible for the dwell window
    /// before the felt hands off to the next player.
    Completed { player: PlayerId, result: HandResult },
    TurnChanged { player: Option<PlayerId> },
    Finished { winners: Vec<PlayerId> },
}

impl Cue {
    pub fn window(&self) -> Option<Duration> {
        match self {
            Self::Roll { first: true, .. } => Some(Self::first_roll()),
            Self::Roll { first: false, .. } => Some(Self::reroll()),
            Self::Completed { .. } => Some(Self::dwell()),
            _ => None,
        }
    }

    pub fn first_roll() -> Duration {
        Duration::from_millis(600)
    }
    pub fn reroll() -> Duration {
        Duration::from_millis(900)
    }
    pub fn dwell() -> Duration {
        Duration::from_millis(1200)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_rolls_and_completions_animate() {
        let first = Cue::Roll { player: 1, first: true };
        let again = Cue::Roll { player: 1, first: false };
        let done = Cue::Completed {
            player: 1,
            result: HandResult::Horses(Ranking::OnePair(2)),
        };
        assert!(first.window() == Some(Cue::first_roll()));
        assert!(again.window() == Some(Cue::reroll()));
        assert!(done.window() == Some(Cue::dwell()));
        assert!(Cue::TurnChanged { player: None }.window() == None);
        assert!(Cue::Finished { winners: vec![1] }.window() == None);
    }
}
