use crate::ChipTransaction;
use crate::GameHistory;
use crate::StoreError;
use crate::User;
use okey_core::ID;

/// A staged changeset committed atomically by [`Store::commit`].
///
/// User updates are version-checked (optimistic concurrency), histories are
/// upserted by id, transactions are insert-only. Either everything in the
/// unit persists or nothing does.
#[derive(Debug, Default)]
pub struct UnitOfWork {
    users: Vec<User>,
    histories: Vec<GameHistory>,
    transactions: Vec<ChipTransaction>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }
    /// Stages an update to an existing user.
    pub fn update_user(&mut self, user: User) {
        self.users.push(user);
    }
    /// Stages an insert-or-update of a game history.
    pub fn record_history(&mut self, history: GameHistory) {
        self.histories.push(history);
    }
    /// Stages an append to the chip audit trail.
    pub fn append_transaction(&mut self, transaction: ChipTransaction) {
        self.transactions.push(transaction);
    }
    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.histories.is_empty() && self.transactions.is_empty()
    }
    pub fn users(&self) -> &[User] {
        &self.users
    }
    pub fn histories(&self) -> &[GameHistory] {
        &self.histories
    }
    pub fn transactions(&self) -> &[ChipTransaction] {
        &self.transactions
    }
}

/// Repository operations the pipelines depend on.
///
/// Implemented by [`crate::Postgres`] for production and
/// [`crate::MemoryStore`] for tests and local play. Rank queries use 0 as
/// the "not ranked" sentinel.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    // users
    async fn create_user(&self, user: &User) -> Result<(), StoreError>;
    async fn user(&self, id: ID<User>) -> Result<Option<User>, StoreError>;
    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn users(&self, ids: &[ID<User>]) -> Result<Vec<User>, StoreError>;
    async fn top_by_elo(&self, n: usize) -> Result<Vec<User>, StoreError>;
    async fn elo_rank(&self, id: ID<User>) -> Result<i64, StoreError>;
    async fn active_users(&self) -> Result<Vec<User>, StoreError>;
    // game histories
    async fn history(&self, id: ID<GameHistory>) -> Result<Option<GameHistory>, StoreError>;
    async fn histories_by_room(&self, room: uuid::Uuid) -> Result<Vec<GameHistory>, StoreError>;
    async fn create_history(&self, history: &GameHistory) -> Result<(), StoreError>;
    // chip transactions
    async fn transaction_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<ChipTransaction>, StoreError>;
    async fn transaction_by_idempotency(
        &self,
        key: &str,
    ) -> Result<Option<ChipTransaction>, StoreError>;
    async fn transactions_by_game(
        &self,
        game: ID<GameHistory>,
    ) -> Result<Vec<ChipTransaction>, StoreError>;
    // unit of work
    async fn commit(&self, unit: UnitOfWork) -> Result<(), StoreError>;
}
