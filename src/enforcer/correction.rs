use crate::PlayerId;

/// Corrective actions applied by one enforcement pass. Returned to the
/// caller so the surrounding application can surface what happened; an
/// empty list means the round needed nothing.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Correction {
    /// A bot nobody was driving got force-completed from its recorded dice.
    ForcedBot(PlayerId),
    /// A human ran out the clock: hand force-completed, sit-out recorded.
    ForcedFold(PlayerId),
    /// The turn pointer moved to this player (None means the round ended).
    Advanced(Option<PlayerId>),
    /// Every hand was complete but nobody finalized; winners computed.
    Finalized(Vec<PlayerId>),
}

impl std::fmt::Display for Correction {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::ForcedBot(p) => write!(f, "forced bot P{}", p),
            Self::ForcedFold(p) => write!(f, "forced fold P{}", p),
            Self::Advanced(Some(p)) => write!(f, "advanced to P{}", p),
            Self::Advanced(None) => write!(f, "advanced to end of round"),
            Self::Finalized(w) => write!(f, "finalized with {} winner(s)", w.len()),
        }
    }
}
