/// Errors surfaced by store operations.
///
/// Pipelines branch on these: `DuplicateIdempotency` short-circuits a
/// settlement as already done, `Unavailable` is retryable, the rest are
/// terminal for the operation that raised them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Entity does not exist.
    NotFound(String),
    /// A unique constraint other than an idempotency key was violated.
    Conflict(String),
    /// An idempotency key was already used; the earlier write stands.
    DuplicateIdempotency(String),
    /// Optimistic concurrency check failed; reload and retry.
    VersionMismatch(String),
    /// The backend is unreachable or timed out; retryable.
    Unavailable(String),
    /// An entity-level invariant would be broken (negative balance,
    /// mismatched running balance).
    Invariant(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(s) => write!(f, "not found: {}", s),
            Self::Conflict(s) => write!(f, "conflict: {}", s),
            Self::DuplicateIdempotency(s) => write!(f, "duplicate idempotency key: {}", s),
            Self::VersionMismatch(s) => write!(f, "version mismatch: {}", s),
            Self::Unavailable(s) => write!(f, "store unavailable: {}", s),
            Self::Invariant(s) => write!(f, "invariant violated: {}", s),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<tokio_postgres::Error> for StoreError {
    fn from(e: tokio_postgres::Error) -> Self {
        match e.as_db_error() {
            Some(db) if db.code() == &tokio_postgres::error::SqlState::UNIQUE_VIOLATION => {
                match db.constraint() {
                    Some(c) if c.contains("idem") => Self::DuplicateIdempotency(db.message().into()),
                    _ => Self::Conflict(db.message().into()),
                }
            }
            Some(db) => Self::Unavailable(db.message().into()),
            None => Self::Unavailable(e.to_string()),
        }
    }
}
