//! Provably-fair shuffle commitments.
//!
//! The server commits to a shuffle before anyone sees a tile: it draws a
//! secret seed, shuffles deterministically from that seed, serializes the
//! resulting order, and publishes only an HMAC over it. When the game ends
//! the seed and order are revealed, and anyone can recompute the HMAC to
//! confirm the shuffle was fixed before play began.
mod commitment;
mod rng;
mod seed;

pub use commitment::Commitment;
pub use commitment::Reveal;
pub use commitment::commitment_hash;
pub use commitment::serialize_tiles;
pub use commitment::verify;
pub use rng::FairRng;
pub use seed::next_nonce;
pub use seed::server_seed;
