//! Chip settlement and rating pipeline.
//!
//! Money only ever moves here. Stakes are collected atomically before a
//! game starts, the pot is split exactly once when it ends, and refunds
//! restore balances when a game dies early. Every movement leaves an
//! immutable [`okey_database::ChipTransaction`] behind, and idempotency
//! keys make each step safe to replay.
mod elo;
mod pipeline;

pub use elo::EloOutcome;
pub use elo::expected_score;
pub use elo::k_factor;
pub use elo::pair_change;
pub use pipeline::GameOutcome;
pub use pipeline::Participant;
pub use pipeline::SettleError;
pub use pipeline::Settled;
pub use pipeline::cancel_with_refund;
pub use pipeline::collect_stakes;
pub use pipeline::settle;
pub use pipeline::settle_with_retry;
