//! Core type aliases, traits, and constants for the okey server.
//!
//! This crate provides the foundational types and configuration parameters
//! used throughout the okey workspace.

mod seat;

pub use seat::Seat;

// ============================================================================
// TYPE ALIASES
// ============================================================================
/// Chip balances, stakes, pots, and signed transaction amounts.
pub type Chips = i64;
/// ELO ratings and rating deltas.
pub type Elo = i32;
/// Win scores (base score plus okey bonuses).
pub type Score = i32;
/// Per-game turn counter, monotonically increasing from 1.
pub type TurnNumber = u32;

// ============================================================================
// TYPED IDENTIFIERS
// ============================================================================
use std::marker::PhantomData;

/// Entities addressable by a typed id.
pub trait Unique<T = Self> {
    fn id(&self) -> ID<T>;
}

/// Phantom-typed identifier.
///
/// Rooms, seats, users, games, and connections are all keyed by UUIDv7
/// under the hood; the zero-sized marker stops a room id from ever being
/// handed somewhere a user id belongs. The marker is carried as
/// `fn() -> T` so ids stay `Send`/`Sync` no matter what they name, and
/// it is erased with [`ID::cast`] at the persistence boundary, where rows
/// hold the bare uuid.
pub struct ID<T> {
    uuid: uuid::Uuid,
    marker: PhantomData<fn() -> T>,
}

impl<T> ID<T> {
    /// Mints a fresh, time-ordered id.
    pub fn fresh() -> Self {
        Self::from(uuid::Uuid::now_v7())
    }
    /// The raw uuid, for storage and wire formats.
    pub fn inner(&self) -> uuid::Uuid {
        self.uuid
    }
    /// Re-marks this id as naming a different entity kind.
    /// A seated human's player id doubling as their user id goes through
    /// here rather than through the raw uuid.
    pub fn cast<U>(self) -> ID<U> {
        ID::from(self.uuid)
    }
}

impl<T> From<uuid::Uuid> for ID<T> {
    fn from(uuid: uuid::Uuid) -> Self {
        Self {
            uuid,
            marker: PhantomData,
        }
    }
}
impl<T> From<ID<T>> for uuid::Uuid {
    fn from(id: ID<T>) -> Self {
        id.uuid
    }
}

impl<T> Default for ID<T> {
    fn default() -> Self {
        Self::fresh()
    }
}

// the marker would otherwise drag `T: Clone` etc. into derived bounds,
// so the plumbing traits are spelled out by hand
impl<T> Copy for ID<T> {}
impl<T> Clone for ID<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> PartialEq for ID<T> {
    fn eq(&self, rhs: &Self) -> bool {
        self.uuid == rhs.uuid
    }
}
impl<T> Eq for ID<T> {}
impl<T> PartialOrd for ID<T> {
    fn partial_cmp(&self, rhs: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(rhs))
    }
}
impl<T> Ord for ID<T> {
    fn cmp(&self, rhs: &Self) -> std::cmp::Ordering {
        self.uuid.cmp(&rhs.uuid)
    }
}
impl<T> std::hash::Hash for ID<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.uuid.hash(state);
    }
}

impl<T> std::fmt::Debug for ID<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ID({})", self.uuid)
    }
}
impl<T> std::fmt::Display for ID<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.uuid, f)
    }
}

impl<T> serde::Serialize for ID<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.uuid.serialize(serializer)
    }
}
impl<'de, T> serde::Deserialize<'de> for ID<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        uuid::Uuid::deserialize(deserializer).map(Self::from)
    }
}

// ============================================================================
// TABLE PARAMETERS
// ============================================================================
/// Number of seats at an okey table.
pub const TABLE_SEATS: usize = 4;
/// Total tiles in a full set: 4 colors x 13 values x 2 copies + 2 false jokers.
pub const FULL_SET: usize = 106;
/// Tiles dealt to the dealer (they open play with a discard).
pub const DEAL_DEALER: usize = 15;
/// Tiles dealt to every other seat.
pub const DEAL_OTHERS: usize = 14;
/// Tiles left in the deck after the indicator is drawn and hands are dealt.
pub const DECK_AFTER_DEAL: usize = 48;

// ============================================================================
// TURN TIMING
// ============================================================================
/// Default turn duration in seconds.
pub const TURN_SECONDS: u64 = 15;
/// Minimum configurable turn duration.
pub const TURN_SECONDS_MIN: u64 = 5;
/// Maximum configurable turn duration.
pub const TURN_SECONDS_MAX: u64 = 60;
/// Remaining-seconds threshold below which ticks are fanned out every second.
pub const TURN_CRITICAL_SECONDS: u64 = 10;
/// Window after a disconnect during which the same player id may reclaim the seat.
pub const RECONNECT_WINDOW_SECONDS: u64 = 30;
/// Deadline extension granted when the current-turn player reconnects.
pub const RECONNECT_EXTENSION_SECONDS: u64 = 5;
/// How long a stopping room keeps draining in-flight commands.
pub const DRAIN_DEADLINE_MILLIS: u64 = 2_000;

// ============================================================================
// ECONOMY
// ============================================================================
/// House cut as a percentage of the pot.
pub const RAKE_PERCENT: Chips = 5;
/// Absolute cap on the house cut per game.
pub const RAKE_CAP: Chips = 10_000;
/// No rating ever drops below this floor.
pub const ELO_FLOOR: Elo = 100;
/// Per-pair rating change clamp.
pub const ELO_MAX_CHANGE: Elo = 50;
/// Settlement retry backoff schedule in milliseconds.
pub const SETTLE_BACKOFF_MILLIS: [u64; 3] = [100, 500, 2_000];

// ============================================================================
// PROCESS HELPERS
// ============================================================================
/// Dual logging: INFO to the terminal, DEBUG to a per-run file under logs/.
#[cfg(feature = "server")]
pub fn log() {
    let stamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    std::fs::create_dir_all("logs").expect("logs directory");
    let file = std::fs::File::create(format!("logs/okey-{}.log", stamp)).expect("log file");
    let config = simplelog::ConfigBuilder::new()
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .set_location_level(log::LevelFilter::Off)
        .build();
    simplelog::CombinedLogger::init(vec![
        simplelog::TermLogger::new(
            log::LevelFilter::Info,
            config.clone(),
            simplelog::TerminalMode::Mixed,
            simplelog::ColorChoice::Auto,
        ),
        simplelog::WriteLogger::new(log::LevelFilter::Debug, config, file),
    ])
    .expect("logger init");
}

/// Hard Ctrl+C handler: no drain, no goodbye, the process just exits.
/// Rooms persist their state through the normal stop path in production;
/// this is the operator's escape hatch.
#[cfg(feature = "server")]
pub fn halt_on_interrupt() {
    tokio::spawn(async {
        let _ = tokio::signal::ctrl_c().await;
        log::warn!("interrupt received, exiting");
        std::process::exit(1);
    });
}
