use okey_core::ELO_MAX_CHANGE;
use okey_core::Elo;
use okey_rules::WinKind;

/// Rating context for a finished game.
///
/// Wraps the win kinds with the deck-exhaustion outcome, which dampens
/// rating movement to half strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EloOutcome {
    Normal,
    Pairs,
    OkeyDiscard,
    DeckEmpty,
}

impl From<WinKind> for EloOutcome {
    fn from(kind: WinKind) -> Self {
        match kind {
            WinKind::Normal => Self::Normal,
            WinKind::Pairs => Self::Pairs,
            WinKind::OkeyDiscard => Self::OkeyDiscard,
        }
    }
}

impl EloOutcome {
    /// Rating multiplier by outcome.
    pub fn multiplier(&self) -> f64 {
        match self {
            Self::Normal => 1.0,
            Self::Pairs => 1.5,
            Self::OkeyDiscard => 2.0,
            Self::DeckEmpty => 0.5,
        }
    }
}

/// K-factor by experience: volatile for fresh accounts, stable for veterans.
pub fn k_factor(games_played: i32) -> f64 {
    if games_played < 30 {
        40.0
    } else if games_played < 100 {
        20.0
    } else {
        10.0
    }
}

/// Expected score of the winner against one loser.
pub fn expected_score(winner: Elo, loser: Elo) -> f64 {
    1.0 / (1.0 + 10f64.powf(f64::from(loser - winner) / 400.0))
}

/// Rating deltas for one (winner, loser) pair.
///
/// Each side applies its own K-factor. Non-zero results are pushed to a
/// minimum magnitude of 1, then clamped to ±50. The winner's total game
/// change is the sum of its pair changes against every loser.
pub fn pair_change(
    winner: (Elo, i32),
    loser: (Elo, i32),
    outcome: EloOutcome,
) -> (Elo, Elo) {
    let expected = expected_score(winner.0, loser.0);
    let gain = k_factor(winner.1) * (1.0 - expected) * outcome.multiplier();
    let loss = k_factor(loser.1) * (0.0 - (1.0 - expected)) * outcome.multiplier();
    (finalize(gain, 1), finalize(loss, -1))
}

fn finalize(change: f64, minimum: Elo) -> Elo {
    let rounded = change.round() as Elo;
    let adjusted = if rounded == 0 { minimum } else { rounded };
    adjusted.clamp(-ELO_MAX_CHANGE, ELO_MAX_CHANGE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_ratings_split_the_k() {
        let (gain, loss) = pair_change((1_000, 0), (1_000, 0), EloOutcome::Normal);
        assert_eq!(gain, 20);
        assert_eq!(loss, -20);
    }

    #[test]
    fn upsets_move_more() {
        let (upset_gain, _) = pair_change((1_000, 0), (1_400, 0), EloOutcome::Normal);
        let (expected_gain, _) = pair_change((1_400, 0), (1_000, 0), EloOutcome::Normal);
        assert!(upset_gain > expected_gain);
    }

    #[test]
    fn veterans_move_less() {
        let (fresh, _) = pair_change((1_000, 0), (1_000, 0), EloOutcome::Normal);
        let (mid, _) = pair_change((1_000, 50), (1_000, 0), EloOutcome::Normal);
        let (vet, _) = pair_change((1_000, 500), (1_000, 0), EloOutcome::Normal);
        assert!(fresh > mid);
        assert!(mid > vet);
    }

    #[test]
    fn multiplier_scales_by_outcome() {
        let (normal, _) = pair_change((1_000, 500), (1_000, 500), EloOutcome::Normal);
        let (pairs, _) = pair_change((1_000, 500), (1_000, 500), EloOutcome::Pairs);
        let (okey, _) = pair_change((1_000, 500), (1_000, 500), EloOutcome::OkeyDiscard);
        let (empty, _) = pair_change((1_000, 500), (1_000, 500), EloOutcome::DeckEmpty);
        assert_eq!(normal, 5);
        assert_eq!(pairs, 8);
        assert_eq!(okey, 10);
        assert_eq!(empty, 3);
    }

    #[test]
    fn minimum_magnitude_is_one() {
        // a massive favorite beats a floor-rated opponent: raw change ≈ 0
        let (gain, loss) = pair_change((3_000, 500), (100, 500), EloOutcome::DeckEmpty);
        assert_eq!(gain, 1);
        assert_eq!(loss, -1);
    }

    #[test]
    fn clamp_caps_the_swing() {
        // huge underdog wins a double-multiplier game with a fresh K
        let (gain, loss) = pair_change((100, 0), (3_000, 0), EloOutcome::OkeyDiscard);
        assert_eq!(gain, 50);
        assert_eq!(loss, -50);
    }
}
