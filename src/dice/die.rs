use serde::Deserialize;
use serde::Serialize;

/// Auto-freeze mark for Ship-Captain-Crew. Once a die earns its tag it is
/// permanently frozen and can never be toggled by the player again.
#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum Tag {
    Ship,
    Captain,
    Crew,
}

impl Tag {
    pub fn rank(&self) -> u8 {
        match self {
            Self::Ship => 6,
            Self::Captain => 5,
            Self::Crew => 4,
        }
    }
    /// Tags are earned strictly in order: 6, then 5, then 4.
    pub fn next(earned: &[Option<Tag>]) -> Option<Tag> {
        let has = |t: Tag| earned.iter().any(|e| *e == Some(t));
        if !has(Self::Ship) {
            Some(Self::Ship)
        } else if !has(Self::Captain) {
            Some(Self::Captain)
        } else if !has(Self::Crew) {
            Some(Self::Crew)
        } else {
            None
        }
    }
}

/// One die on the felt. Value 0 means unrolled (the blank face shown before
/// the first roll of a turn).
#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct Die {
    pub value: u8,
    pub held: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<Tag>,
}

impl Die {
    pub fn blank() -> Self {
        Self {
            value: 0,
            held: false,
            tag: None,
        }
    }
    pub fn is_rolled(&self) -> bool {
        self.value != 0
    }
    /// A die survives the next roll if the player held it or it was
    /// auto-frozen by a tag.
    pub fn is_frozen(&self) -> bool {
        self.held || self.tag.is_some()
    }
}

pub fn held_count(dice: &[Die]) -> usize {
    dice.iter().filter(|d| d.is_frozen()).count()
}

pub fn held_mask(dice: &[Die]) -> Vec<bool> {
    dice.iter().map(|d| d.is_frozen()).collect()
}

pub fn any_rolled(dice: &[Die]) -> bool {
    dice.iter().any(|d| d.is_rolled())
}

impl std::fmt::Display for Die {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match (self.is_rolled(), self.is_frozen()) {
            (false, _) => write!(f, "[ ]"),
            (true, true) => write!(f, "[{}]", self.value),
            (true, false) => write!(f, " {} ", self.value),
        }
    }
}
