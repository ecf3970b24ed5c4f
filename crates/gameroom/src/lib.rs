//! Async runtime for live okey tables.
//!
//! Each room is a single-writer task: one bounded inbound channel carries
//! user intents, timer events, and delayed bot actions; one outbound
//! channel carries targeted wire messages for the transport to fan out.
//! Nothing inside a room is ever locked.
//!
//! ## Architecture
//!
//! - [`Room`] — Authoritative per-table state machine and command loop
//! - [`Table`] — Seat roster and player presence
//! - [`timer`] — Per-turn countdown task feeding the command channel
//! - [`ConnectionRegistry`] — Player ↔ room ↔ connection mapping
//!
//! ## Protocol
//!
//! - [`Command`] — Typed inbound commands
//! - [`ServerMessage`] — Wire-stable outbound events
//! - [`Protocol`] — JSON decode and intent → command translation
//! - [`GameView`] — Per-player projection (never leaks opponents' tiles)
mod command;
mod error;
mod message;
mod phase;
mod player;
mod projection;
mod protocol;
mod registry;
mod room;
mod table;
pub mod timer;

pub use command::Command;
pub use command::TimerEvent;
pub use error::GameError;
pub use message::Outbound;
pub use message::ServerMessage;
pub use message::Target;
pub use message::now_millis;
pub use phase::GamePhase;
pub use phase::TurnPhase;
pub use player::SeatedPlayer;
pub use projection::GameView;
pub use projection::OpponentView;
pub use protocol::ClientIntent;
pub use protocol::Protocol;
pub use protocol::ProtocolError;
pub use registry::ConnectionRegistry;
pub use registry::Mapping;
pub use room::Room;
pub use room::RoomChannels;
pub use table::Table;
pub use timer::TimerHandle;

/// Marker for transport connections.
pub struct Connection;

/// Transport-level connection identity (one per socket).
pub type ConnId = okey_core::ID<Connection>;
/// Stable player identity; equals the user id for humans.
pub type PlayerId = okey_core::ID<SeatedPlayer>;
/// Room identity.
pub type RoomId = okey_core::ID<Room>;
