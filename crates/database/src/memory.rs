use crate::ChipTransaction;
use crate::GameHistory;
use crate::Store;
use crate::StoreError;
use crate::UnitOfWork;
use crate::User;
use okey_core::ID;
use okey_core::Unique;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use tokio::sync::Mutex;

#[derive(Default)]
struct Inner {
    users: HashMap<ID<User>, User>,
    histories: HashMap<ID<GameHistory>, GameHistory>,
    transactions: Vec<ChipTransaction>,
}

/// In-memory store for tests and local play.
///
/// Enforces the same constraints as the PostgreSQL schema: unique
/// usernames, unique transaction references, unique idempotency keys, and
/// version-checked user updates. The `unavailable` switch injects
/// [`StoreError::Unavailable`] to exercise retry paths.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
    /// Makes every subsequent operation fail as unavailable (or restores).
    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }
    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store switched off".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        self.check()?;
        let mut inner = self.inner.lock().await;
        if inner
            .users
            .values()
            .any(|u| u.username() == user.username())
        {
            return Err(StoreError::Conflict(format!(
                "username taken: {}",
                user.username()
            )));
        }
        inner.users.insert(user.id(), user.clone());
        Ok(())
    }

    async fn user(&self, id: ID<User>) -> Result<Option<User>, StoreError> {
        self.check()?;
        Ok(self.inner.lock().await.users.get(&id).cloned())
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.check()?;
        let username = username.trim().to_lowercase();
        Ok(self
            .inner
            .lock()
            .await
            .users
            .values()
            .find(|u| u.username() == username)
            .cloned())
    }

    async fn users(&self, ids: &[ID<User>]) -> Result<Vec<User>, StoreError> {
        self.check()?;
        let inner = self.inner.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.users.get(id).cloned())
            .collect())
    }

    async fn top_by_elo(&self, n: usize) -> Result<Vec<User>, StoreError> {
        self.check()?;
        let inner = self.inner.lock().await;
        let mut users = inner
            .users
            .values()
            .filter(|u| u.active())
            .cloned()
            .collect::<Vec<_>>();
        users.sort_by(|a, b| {
            b.elo()
                .cmp(&a.elo())
                .then_with(|| a.username().cmp(b.username()))
        });
        users.truncate(n);
        Ok(users)
    }

    async fn elo_rank(&self, id: ID<User>) -> Result<i64, StoreError> {
        self.check()?;
        let inner = self.inner.lock().await;
        let Some(user) = inner.users.get(&id).filter(|u| u.active()) else {
            return Ok(0);
        };
        let above = inner
            .users
            .values()
            .filter(|u| u.active() && u.elo() > user.elo())
            .count();
        Ok(above as i64 + 1)
    }

    async fn active_users(&self) -> Result<Vec<User>, StoreError> {
        self.check()?;
        Ok(self
            .inner
            .lock()
            .await
            .users
            .values()
            .filter(|u| u.active())
            .cloned()
            .collect())
    }

    async fn history(&self, id: ID<GameHistory>) -> Result<Option<GameHistory>, StoreError> {
        self.check()?;
        Ok(self.inner.lock().await.histories.get(&id).cloned())
    }

    async fn histories_by_room(&self, room: uuid::Uuid) -> Result<Vec<GameHistory>, StoreError> {
        self.check()?;
        let inner = self.inner.lock().await;
        let mut histories = inner
            .histories
            .values()
            .filter(|h| h.room_id() == room)
            .cloned()
            .collect::<Vec<_>>();
        histories.sort_by_key(|h| h.started_at());
        Ok(histories)
    }

    async fn create_history(&self, history: &GameHistory) -> Result<(), StoreError> {
        self.check()?;
        self.inner
            .lock()
            .await
            .histories
            .insert(history.id(), history.clone());
        Ok(())
    }

    async fn transaction_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<ChipTransaction>, StoreError> {
        self.check()?;
        Ok(self
            .inner
            .lock()
            .await
            .transactions
            .iter()
            .find(|t| t.reference() == reference)
            .cloned())
    }

    async fn transaction_by_idempotency(
        &self,
        key: &str,
    ) -> Result<Option<ChipTransaction>, StoreError> {
        self.check()?;
        Ok(self
            .inner
            .lock()
            .await
            .transactions
            .iter()
            .find(|t| t.idempotency_key() == Some(key))
            .cloned())
    }

    async fn transactions_by_game(
        &self,
        game: ID<GameHistory>,
    ) -> Result<Vec<ChipTransaction>, StoreError> {
        self.check()?;
        Ok(self
            .inner
            .lock()
            .await
            .transactions
            .iter()
            .filter(|t| t.game_id() == Some(game))
            .cloned()
            .collect())
    }

    async fn commit(&self, unit: UnitOfWork) -> Result<(), StoreError> {
        self.check()?;
        let mut inner = self.inner.lock().await;
        // validate the whole unit before touching anything
        for user in unit.users() {
            match inner.users.get(&user.id()) {
                None => return Err(StoreError::NotFound(user.username().to_string())),
                Some(stored) if stored.version() != user.version() => {
                    return Err(StoreError::VersionMismatch(user.username().to_string()));
                }
                Some(_) => {}
            }
        }
        for chip in unit.transactions() {
            if inner
                .transactions
                .iter()
                .any(|t| t.reference() == chip.reference())
            {
                return Err(StoreError::Conflict(format!(
                    "duplicate reference {}",
                    chip.reference()
                )));
            }
            if let Some(key) = chip.idempotency_key() {
                if inner
                    .transactions
                    .iter()
                    .any(|t| t.idempotency_key() == Some(key))
                {
                    return Err(StoreError::DuplicateIdempotency(key.to_string()));
                }
            }
        }
        // apply
        for user in unit.users() {
            let mut user = user.clone();
            user.bump_version();
            inner.users.insert(user.id(), user);
        }
        for history in unit.histories() {
            inner.histories.insert(history.id(), history.clone());
        }
        for chip in unit.transactions() {
            inner.transactions.push(chip.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TransactionKind;

    #[tokio::test]
    async fn usernames_are_unique() {
        let store = MemoryStore::new();
        store
            .create_user(&User::new("zeynep", "Zeynep", 1_000))
            .await
            .unwrap();
        let err = store
            .create_user(&User::new("ZEYNEP", "Other", 1_000))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn version_mismatch_rejects_the_whole_unit() {
        let store = MemoryStore::new();
        let user = User::new("kerem", "Kerem", 1_000);
        store.create_user(&user).await.unwrap();
        // first staged update wins
        let mut unit = UnitOfWork::new();
        let mut staged = store.user(user.id()).await.unwrap().unwrap();
        staged.credit(10).unwrap();
        unit.update_user(staged.clone());
        store.commit(unit).await.unwrap();
        // second update staged from the stale copy loses
        let mut unit = UnitOfWork::new();
        unit.update_user(staged);
        let err = store.commit(unit).await.unwrap_err();
        assert!(matches!(err, StoreError::VersionMismatch(_)));
        assert_eq!(store.user(user.id()).await.unwrap().unwrap().chips(), 1_010);
    }

    #[tokio::test]
    async fn idempotency_keys_are_unique() {
        let store = MemoryStore::new();
        let user = User::new("elif", "Elif", 1_000);
        store.create_user(&user).await.unwrap();
        let key = Some("game-settle-x".to_string());
        let mut unit = UnitOfWork::new();
        unit.append_transaction(
            ChipTransaction::new(user.id(), None, TransactionKind::GameWin, 5, 0, "a", key.clone())
                .unwrap(),
        );
        store.commit(unit).await.unwrap();
        let mut unit = UnitOfWork::new();
        unit.append_transaction(
            ChipTransaction::new(user.id(), None, TransactionKind::GameWin, 5, 0, "b", key)
                .unwrap(),
        );
        let err = store.commit(unit).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateIdempotency(_)));
    }

    #[tokio::test]
    async fn rank_sentinel_is_zero_for_unknown() {
        let store = MemoryStore::new();
        assert_eq!(store.elo_rank(ID::default()).await.unwrap(), 0);
        let user = User::new("deniz", "Deniz", 0);
        store.create_user(&user).await.unwrap();
        assert_eq!(store.elo_rank(user.id()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unavailability_switch() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.user(ID::default()).await,
            Err(StoreError::Unavailable(_))
        ));
        store.set_unavailable(false);
        assert!(store.user(ID::default()).await.unwrap().is_none());
    }
}
