use crate::PlayerId;

/// Typed outcomes for rejected commands.
///
/// Every rejection is unicast to the caller as `OnError` and leaves the
/// room untouched. Only `FatalInvariant` kills a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    RoomNotFound,
    RoomFull,
    GameAlreadyStarted,
    NotFound(String),
    InvalidPhase(String),
    NotYourTurn { current: Option<PlayerId> },
    TimeExpired,
    InvalidAction(String),
    InsufficientBalance { player: PlayerId },
    DuplicateIdempotency,
    PersistenceUnavailable,
    ReconnectExpired,
    FatalInvariant(String),
}

impl GameError {
    /// Stable kind tag carried on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RoomNotFound => "RoomNotFound",
            Self::RoomFull => "RoomFull",
            Self::GameAlreadyStarted => "GameAlreadyStarted",
            Self::NotFound(_) => "NotFound",
            Self::InvalidPhase(_) => "InvalidPhase",
            Self::NotYourTurn { .. } => "NotYourTurn",
            Self::TimeExpired => "TimeExpired",
            Self::InvalidAction(_) => "InvalidAction",
            Self::InsufficientBalance { .. } => "InsufficientBalance",
            Self::DuplicateIdempotency => "DuplicateIdempotency",
            Self::PersistenceUnavailable => "PersistenceUnavailable",
            Self::ReconnectExpired => "ReconnectExpired",
            Self::FatalInvariant(_) => "FatalInvariant",
        }
    }
}

impl std::fmt::Display for GameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RoomNotFound => write!(f, "room not found"),
            Self::RoomFull => write!(f, "room is full"),
            Self::GameAlreadyStarted => write!(f, "game already started"),
            Self::NotFound(what) => write!(f, "not found: {}", what),
            Self::InvalidPhase(detail) => write!(f, "not legal in current phase: {}", detail),
            Self::NotYourTurn { current: Some(p) } => write!(f, "not your turn (current: {})", p),
            Self::NotYourTurn { current: None } => write!(f, "not your turn"),
            Self::TimeExpired => write!(f, "turn time expired; auto-play took the move"),
            Self::InvalidAction(detail) => write!(f, "invalid action: {}", detail),
            Self::InsufficientBalance { player } => {
                write!(f, "insufficient balance for player {}", player)
            }
            Self::DuplicateIdempotency => write!(f, "already applied"),
            Self::PersistenceUnavailable => write!(f, "temporary storage failure"),
            Self::ReconnectExpired => write!(f, "reconnect window expired"),
            Self::FatalInvariant(detail) => write!(f, "fatal invariant: {}", detail),
        }
    }
}

impl std::error::Error for GameError {}
