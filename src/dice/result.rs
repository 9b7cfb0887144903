use super::*;
use serde::Deserialize;
use serde::Serialize;

/// Poker-dice ranking for Horses. Variants are declared in ascending order
/// of strength so the derived Ord is the table ordering; ties at the same
/// category and value are genuine ties (kickers do not break them).
#[derive(Debug, Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub enum Ranking {
    HighDie(u8),
    OnePair(u8),
    TwoPair(u8, u8),
    ThreeOAK(u8),
    Straight(u8),
    FullHouse(u8, u8),
    FourOAK(u8),
    FiveOAK(u8),
}

/// Evaluated final hand for one player. Set exactly once, when the hand
/// completes; never compared across variants.
#[derive(Debug, Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub enum HandResult {
    /// Ship-Captain-Crew: an unqualified hand loses to any qualified one,
    /// qualified hands compare by cargo sum.
    Cargo { qualified: bool, sum: u8 },
    Horses(Ranking),
}

impl HandResult {
    pub fn evaluate(variant: Variant, dice: &[Die]) -> Self {
        match variant {
            Variant::Horses => Self::Horses(Ranking::from(dice)),
            Variant::ShipCaptainCrew => {
                let qualified = dice.iter().filter(|d| d.tag.is_some()).count() == 3;
                let sum = match qualified {
                    true => dice.iter().filter(|d| d.tag.is_none()).map(|d| d.value).sum(),
                    false => 0,
                };
                Self::Cargo { qualified, sum }
            }
        }
    }
}

impl From<&[Die]> for Ranking {
    fn from(dice: &[Die]) -> Self {
        let mut counts = [0usize; 7];
        for die in dice.iter().filter(|d| d.is_rolled()) {
            counts[die.value as usize] += 1;
        }
        let of = |n: usize| {
            (1..=6u8)
                .rev()
                .find(|v| counts[*v as usize] == n)
                .unwrap_or(0)
        };
        let straight = |lo: u8| (lo..lo + 5).all(|v| counts[v as usize] == 1);
        if of(5) > 0 {
            Self::FiveOAK(of(5))
        } else if of(4) > 0 {
            Self::FourOAK(of(4))
        } else if of(3) > 0 && of(2) > 0 {
            Self::FullHouse(of(3), of(2))
        } else if straight(2) {
            Self::Straight(6)
        } else if straight(1) {
            Self::Straight(5)
        } else if of(3) > 0 {
            Self::ThreeOAK(of(3))
        } else if (1..=6u8).filter(|v| counts[*v as usize] == 2).count() == 2 {
            let mut pairs = (1..=6u8).rev().filter(|v| counts[*v as usize] == 2);
            Self::TwoPair(pairs.next().unwrap_or(0), pairs.next().unwrap_or(0))
        } else if of(2) > 0 {
            Self::OnePair(of(2))
        } else {
            Self::HighDie(of(1))
        }
    }
}

impl std::fmt::Display for HandResult {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Cargo { qualified: false, .. } => write!(f, "no sail"),
            Self::Cargo { sum, .. } => write!(f, "cargo {}", sum),
            Self::Horses(ranking) => write!(f, "{:?}", ranking),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hand(values: [u8; 5]) -> Vec<Die> {
        values
            .iter()
            .map(|v| Die {
                value: *v,
                held: false,
                tag: None,
            })
            .collect()
    }

    #[test]
    fn rankings_ascend() {
        let hands = [
            Ranking::from(hand([2, 3, 4, 6, 6]).as_slice()),
            Ranking::from(hand([5, 5, 4, 4, 2]).as_slice()),
            Ranking::from(hand([3, 3, 3, 1, 6]).as_slice()),
            Ranking::from(hand([1, 2, 3, 4, 5]).as_slice()),
            Ranking::from(hand([2, 2, 2, 5, 5]).as_slice()),
            Ranking::from(hand([4, 4, 4, 4, 1]).as_slice()),
            Ranking::from(hand([6, 6, 6, 6, 6]).as_slice()),
        ];
        for pair in hands.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn pairs_break_ties_by_value() {
        let low = Ranking::from(hand([2, 2, 1, 4, 6]).as_slice());
        let high = Ranking::from(hand([5, 5, 1, 4, 6]).as_slice());
        assert!(low < high);
        assert!(low == Ranking::OnePair(2));
    }

    #[test]
    fn identical_categories_tie() {
        let a = Ranking::from(hand([3, 3, 3, 1, 2]).as_slice());
        let b = Ranking::from(hand([3, 3, 3, 2, 1]).as_slice());
        assert!(a == b);
    }

    #[test]
    fn unqualified_cargo_loses_to_any_qualified() {
        let bust = HandResult::Cargo {
            qualified: false,
            sum: 0,
        };
        let scraped = HandResult::Cargo {
            qualified: true,
            sum: 2,
        };
        assert!(bust < scraped);
    }

    #[test]
    fn cargo_evaluation_sums_untagged() {
        let mut dice = hand([6, 5, 4, 3, 6]);
        dice[0].tag = Some(Tag::Ship);
        dice[1].tag = Some(Tag::Captain);
        dice[2].tag = Some(Tag::Crew);
        let result = HandResult::evaluate(Variant::ShipCaptainCrew, &dice);
        assert!(result == HandResult::Cargo { qualified: true, sum: 9 });
    }
}
