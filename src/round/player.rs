use crate::RollKey;
use crate::dice::*;
use serde::Deserialize;
use serde::Serialize;

/// Per-player slice of the round document.
///
/// `complete` is monotonic false -> true and `result` is set exactly when it
/// flips; `roll_key` increases on every genuine roll and is the only signal
/// observers may use to detect one (dice values and rolls_remaining can
/// repeat across unrelated bookkeeping writes).
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct PlayerDiceState {
    pub dice: Vec<Die>,
    pub rolls_remaining: u8,
    pub complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<HandResult>,
    /// Held flags captured at the start of the final roll. Display-only,
    /// used to reconstruct animation layout after the fact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub held_mask: Option<Vec<bool>>,
    pub roll_key: RollKey,
    #[serde(default)]
    pub sit_out: bool,
}

impl From<Variant> for PlayerDiceState {
    fn from(variant: Variant) -> Self {
        Self {
            dice: variant.blanks(),
            rolls_remaining: variant.rolls(),
            complete: false,
            result: None,
            held_mask: None,
            roll_key: 0,
            sit_out: false,
        }
    }
}

impl PlayerDiceState {
    pub fn held(&self) -> usize {
        held_count(&self.dice)
    }
    pub fn rolled(&self) -> bool {
        any_rolled(&self.dice)
    }
    /// Evaluate and freeze the current dice as final.
    pub fn finish(&mut self, variant: Variant) {
        for die in self.dice.iter_mut() {
            die.held = true;
        }
        self.result = Some(HandResult::evaluate(variant, &self.dice));
        self.complete = true;
    }
}
