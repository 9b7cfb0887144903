use crate::dice::*;
use crate::round::*;

/// What the bot does between rolls.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Choice {
    /// Roll again, holding the masked dice first (Horses only; the mask is
    /// ignored where the variant has no manual holds).
    Roll(Vec<bool>),
    Stop,
}

/// Deterministic hold/stop heuristic, parameterized by the dice and the
/// best completed rival hand. Gameplay tuning, not correctness: anything
/// consistent with the variant's qualification rules would do here.
pub fn decide(variant: Variant, entry: &PlayerDiceState, rival: Option<HandResult>) -> Choice {
    if entry.rolls_remaining == 0 {
        return Choice::Stop;
    }
    let standing = HandResult::evaluate(variant, &entry.dice);
    match variant {
        Variant::Horses => {
            if rival.is_some_and(|best| standing > best) {
                return Choice::Stop;
            }
            let (count, value) = best_group(&entry.dice);
            if count >= 4 {
                return Choice::Stop;
            }
            Choice::Roll(entry.dice.iter().map(|d| d.value == value).collect())
        }
        Variant::ShipCaptainCrew => {
            let HandResult::Cargo { qualified, sum } = standing else {
                return Choice::Stop;
            };
            if !qualified {
                return Choice::Roll(vec![false; entry.dice.len()]);
            }
            match rival {
                Some(best) if standing > best => Choice::Stop,
                None if sum >= cargo_floor() => Choice::Stop,
                _ => Choice::Roll(vec![false; entry.dice.len()]),
            }
        }
    }
}

/// Largest value-group in the hand; higher face breaks count ties.
fn best_group(dice: &[Die]) -> (usize, u8) {
    (1..=6u8)
        .map(|v| (dice.iter().filter(|d| d.value == v).count(), v))
        .max()
        .unwrap_or((0, 0))
}

fn cargo_floor() -> u8 {
    8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(values: [u8; 5], rolls: u8) -> PlayerDiceState {
        let mut entry = PlayerDiceState::from(Variant::Horses);
        entry.dice = values
            .iter()
            .map(|v| Die {
                value: *v,
                held: false,
                tag: None,
            })
            .collect();
        entry.rolls_remaining = rolls;
        entry
    }

    #[test]
    fn holds_largest_group() {
        let choice = decide(Variant::Horses, &entry([4, 4, 2, 3, 6], 2), None);
        assert!(choice == Choice::Roll(vec![true, true, false, false, false]));
    }

    #[test]
    fn higher_face_breaks_group_ties() {
        let choice = decide(Variant::Horses, &entry([2, 2, 5, 5, 1], 2), None);
        assert!(choice == Choice::Roll(vec![false, false, true, true, false]));
    }

    #[test]
    fn stops_on_four_of_a_kind() {
        let choice = decide(Variant::Horses, &entry([6, 6, 6, 6, 1], 2), None);
        assert!(choice == Choice::Stop);
    }

    #[test]
    fn stops_when_beating_best_rival() {
        let rival = Some(HandResult::Horses(Ranking::OnePair(3)));
        let choice = decide(Variant::Horses, &entry([5, 5, 5, 2, 1], 2), rival);
        assert!(choice == Choice::Stop);
    }

    #[test]
    fn stops_when_out_of_rolls() {
        let choice = decide(Variant::Horses, &entry([1, 2, 3, 4, 6], 0), None);
        assert!(choice == Choice::Stop);
    }

    #[test]
    fn rerolls_cargo_until_floor() {
        let mut entry = PlayerDiceState::from(Variant::ShipCaptainCrew);
        entry.dice = [(6, Some(Tag::Ship)), (5, Some(Tag::Captain)), (4, Some(Tag::Crew)), (2, None), (1, None)]
            .iter()
            .map(|(v, tag)| Die {
                value: *v,
                held: false,
                tag: *tag,
            })
            .collect();
        entry.rolls_remaining = 1;
        assert!(decide(Variant::ShipCaptainCrew, &entry, None) == Choice::Roll(vec![false; 5]));
        entry.dice[3].value = 6;
        entry.dice[4].value = 5;
        assert!(decide(Variant::ShipCaptainCrew, &entry, None) == Choice::Stop);
    }
}
