use super::*;
use rand::Rng;
use serde::Deserialize;
use serde::Serialize;

/// Game variant played at the table. Both use five dice and three rolls;
/// they differ in hold semantics and hand evaluation.
#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum Variant {
    Horses,
    ShipCaptainCrew,
}

impl Variant {
    pub fn dice(&self) -> usize {
        5
    }
    pub fn rolls(&self) -> u8 {
        3
    }

    /// Re-roll every die that is not frozen, then apply variant bookkeeping.
    /// In Ship-Captain-Crew, dice newly matching the next needed rank are
    /// auto-frozen with their tag; a single roll can earn several tags
    /// (a 6-5-4 on the first roll qualifies immediately).
    pub fn roll<R: Rng>(&self, dice: &mut [Die], rng: &mut R) {
        for die in dice.iter_mut().filter(|d| !d.is_frozen()) {
            die.value = rng.random_range(1..=6);
        }
        if let Self::ShipCaptainCrew = self {
            Self::tag(dice);
        }
    }

    fn tag(dice: &mut [Die]) {
        while let Some(next) = Tag::next(&dice.iter().map(|d| d.tag).collect::<Vec<_>>()) {
            match dice
                .iter_mut()
                .find(|d| d.tag.is_none() && !d.held && d.value == next.rank())
            {
                Some(die) => die.tag = Some(next),
                None => break,
            }
        }
    }

    /// Whether the player may toggle a hold on this die. Horses allows free
    /// per-die holds; Ship-Captain-Crew has none (tags freeze themselves and
    /// the two cargo dice are re-rolled together or locked in together).
    pub fn can_toggle(&self, dice: &[Die], index: usize) -> bool {
        match self {
            Self::Horses => dice.get(index).map(|d| d.tag.is_none()).unwrap_or(false),
            Self::ShipCaptainCrew => false,
        }
    }

    pub fn blanks(&self) -> Vec<Die> {
        vec![Die::blank(); self.dice()]
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Horses => write!(f, "horses"),
            Self::ShipCaptainCrew => write!(f, "ship-captain-crew"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn fixed(values: [u8; 5]) -> Vec<Die> {
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
    fn roll_fills_every_blank() {
        let ref mut rng = SmallRng::seed_from_u64(1);
        let mut dice = Variant::Horses.blanks();
        Variant::Horses.roll(&mut dice, rng);
        assert!(dice.iter().all(|d| (1..=6).contains(&d.value)));
    }

    #[test]
    fn roll_preserves_held() {
        let ref mut rng = SmallRng::seed_from_u64(2);
        let mut dice = fixed([6, 6, 1, 2, 3]);
        dice[0].held = true;
        dice[1].held = true;
        Variant::Horses.roll(&mut dice, rng);
        assert!(dice[0].value == 6);
        assert!(dice[1].value == 6);
    }

    #[test]
    fn scc_tags_in_rank_order() {
        let mut dice = fixed([4, 5, 6, 2, 2]);
        Variant::tag(&mut dice);
        assert!(dice[2].tag == Some(Tag::Ship));
        assert!(dice[1].tag == Some(Tag::Captain));
        assert!(dice[0].tag == Some(Tag::Crew));
        assert!(dice[3].tag == None);
    }

    #[test]
    fn scc_withholds_crew_until_captain() {
        // a 4 rolled before the 5 exists cannot be tagged
        let mut dice = fixed([6, 4, 1, 2, 3]);
        Variant::tag(&mut dice);
        assert!(dice[0].tag == Some(Tag::Ship));
        assert!(dice[1].tag == None);
    }

    #[test]
    fn scc_has_no_manual_holds() {
        let dice = fixed([6, 5, 4, 3, 2]);
        assert!(!Variant::ShipCaptainCrew.can_toggle(&dice, 4));
        assert!(Variant::Horses.can_toggle(&dice, 4));
    }
}
