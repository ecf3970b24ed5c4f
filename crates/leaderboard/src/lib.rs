//! ELO leaderboard projection.
//!
//! A sorted-set index over user ratings plus a per-user hash of display
//! fields. The projection is derived state: settlement publishes into it
//! after commit, a periodic reconciler rebuilds it from the persistent
//! store, and every read path falls back to a direct store query when the
//! projection is unreachable. Losing it never loses a game result.
mod projection;
mod store;

pub use projection::Leaderboard;
pub use projection::LeaderboardEntry;
pub use store::LeaderboardError;
pub use store::LeaderboardStore;
pub use store::MemorySortedSet;
