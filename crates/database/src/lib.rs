//! Persistence layer for the okey server.
//!
//! Domain entities (users, game histories, chip transactions), the port
//! traits the pipelines depend on, and two interchangeable backends: a
//! PostgreSQL implementation and an in-memory implementation used by tests
//! and local play.
//!
//! ## Connectivity
//!
//! - [`db()`] — Establishes database connections from `DATABASE_URL`
//!
//! ## Ports
//!
//! - [`Store`] — Bundled repository operations over users, histories, and
//!   transactions
//! - [`UnitOfWork`] — Staged changeset committed atomically by a store
//! - [`Schema`] — Table metadata and DDL generation
//!
//! ## Entities
//!
//! - [`User`], [`GameHistory`], [`ChipTransaction`]
mod error;
mod history;
mod memory;
mod postgres;
mod schema;
mod store;
mod transaction;
mod user;

pub use error::StoreError;
pub use history::GameHistory;
pub use history::GameStatus;
pub use history::PlayerResult;
pub use memory::MemoryStore;
pub use postgres::Postgres;
pub use schema::Schema;
pub use store::Store;
pub use store::UnitOfWork;
pub use transaction::ChipTransaction;
pub use transaction::TransactionKind;
pub use user::User;

/// Establishes the PostgreSQL-backed store.
///
/// Connects twice (one shared read connection, one serialized write
/// connection for transactional commits) using the `DATABASE_URL`
/// environment variable, then creates tables and indices.
///
/// # Panics
///
/// Panics if `DATABASE_URL` is not set or if the connection fails; the
/// server cannot run without its store.
pub async fn db() -> Postgres {
    log::info!("connecting to database");
    let ref url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let store = Postgres::connect(url).await.expect("database connection failed");
    store.migrate().await.expect("schema migration failed");
    store
}

/// PostgreSQL error type alias.
pub type PgErr = tokio_postgres::Error;

/// Table for registered user accounts.
#[rustfmt::skip]
pub const USERS:        &str = "users";
/// Table for completed-game summary records.
#[rustfmt::skip]
pub const HISTORIES:    &str = "game_histories";
/// Table for the append-only chip audit trail.
#[rustfmt::skip]
pub const TRANSACTIONS: &str = "chip_transactions";
