use okey_rules::Weights;

/// Bot difficulty grade.
///
/// Easy is also the auto-play grade: it always draws blind from the deck
/// unless the discard completes a meld, and it moves fastest.
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
    Expert,
}

impl Difficulty {
    pub const fn all() -> [Difficulty; 4] {
        [
            Difficulty::Easy,
            Difficulty::Normal,
            Difficulty::Hard,
            Difficulty::Expert,
        ]
    }
    /// Heuristic weight table for this grade.
    pub fn weights(&self) -> Weights {
        match self {
            Difficulty::Easy => Weights::easy(),
            Difficulty::Normal => Weights::normal(),
            Difficulty::Hard => Weights::hard(),
            Difficulty::Expert => Weights::expert(),
        }
    }
    /// Simulated thinking-time bounds in seconds.
    pub fn think_bounds(&self) -> (f32, f32) {
        match self {
            Difficulty::Easy => (1.5, 2.5),
            Difficulty::Normal => (2.0, 4.0),
            Difficulty::Hard => (2.5, 4.5),
            Difficulty::Expert => (3.0, 5.5),
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "Easy"),
            Difficulty::Normal => write!(f, "Normal"),
            Difficulty::Hard => write!(f, "Hard"),
            Difficulty::Expert => write!(f, "Expert"),
        }
    }
}

impl TryFrom<&str> for Difficulty {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "normal" => Ok(Difficulty::Normal),
            "hard" => Ok(Difficulty::Hard),
            "expert" => Ok(Difficulty::Expert),
            _ => Err(format!("invalid difficulty str: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn think_bounds_within_contract() {
        for difficulty in Difficulty::all() {
            let (lo, hi) = difficulty.think_bounds();
            assert!(lo >= 1.5);
            assert!(hi <= 5.5);
            assert!(lo < hi);
        }
    }

    #[test]
    fn bijective_str() {
        for difficulty in Difficulty::all() {
            assert_eq!(
                Difficulty::try_from(difficulty.to_string().as_str()),
                Ok(difficulty)
            );
        }
    }
}
