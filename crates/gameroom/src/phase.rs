/// Game-level lifecycle phase.
///
/// Transitions are validated in the room loop; `Cancelled` is reachable
/// from any non-terminal phase, everything else follows the arrow
/// Waiting → Ready → Shuffling → Dealing → Playing → Finished.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum GamePhase {
    #[default]
    Waiting,
    Ready,
    Shuffling,
    Dealing,
    Playing,
    Finished,
    Cancelled,
}

impl GamePhase {
    pub fn terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled)
    }
    pub fn started(&self) -> bool {
        !matches!(self, Self::Waiting | Self::Ready)
    }
}

impl std::fmt::Display for GamePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            Self::Waiting => "WaitingForPlayers",
            Self::Ready => "ReadyToStart",
            Self::Shuffling => "Shuffling",
            Self::Dealing => "Dealing",
            Self::Playing => "Playing",
            Self::Finished => "Finished",
            Self::Cancelled => "Cancelled",
        };
        write!(f, "{}", s)
    }
}

/// Sub-phase within a single turn.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum TurnPhase {
    #[default]
    WaitingForDraw,
    WaitingForDiscard,
    TurnCompleted,
}

impl std::fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            Self::WaitingForDraw => "WaitingForDraw",
            Self::WaitingForDiscard => "WaitingForDiscard",
            Self::TurnCompleted => "TurnCompleted",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminality() {
        assert!(GamePhase::Finished.terminal());
        assert!(GamePhase::Cancelled.terminal());
        assert!(!GamePhase::Playing.terminal());
        assert!(!GamePhase::Waiting.started());
        assert!(GamePhase::Shuffling.started());
    }
}
