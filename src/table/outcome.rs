use crate::PlayerId;
use crate::dice::*;
use crate::round::*;
use std::collections::BTreeMap;

/// What the settlement collaborator receives once per round: the winner
/// set (all of them on a tie) and every completed result. Chip accounting
/// happens on the other side of this handoff.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Outcome {
    pub round: crate::RoundId,
    pub winners: Vec<PlayerId>,
    pub tie: bool,
    pub results: BTreeMap<PlayerId, HandResult>,
}

impl From<&RoundState> for Outcome {
    fn from(state: &RoundState) -> Self {
        Self {
            round: state.round,
            winners: state.winners.clone(),
            tie: state.winners.len() > 1,
            results: state
                .players
                .iter()
                .filter_map(|(p, s)| s.result.map(|r| (*p, r)))
                .collect(),
        }
    }
}
