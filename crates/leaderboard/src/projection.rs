use crate::LeaderboardStore;
use okey_core::Elo;
use okey_core::ID;
use okey_core::Unique;
use okey_database::Store;
use okey_database::StoreError;
use okey_database::User;
use std::sync::Arc;
use std::time::Duration;

/// One leaderboard row as served to clients.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user: ID<User>,
    pub rank: i64,
    pub elo: Elo,
    pub username: String,
    pub display_name: String,
    pub games_played: i64,
    pub win_rate: f64,
}

/// The leaderboard facade.
///
/// Reads prefer the projection and silently fall back to the persistent
/// store; writes into the projection are best-effort and logged on
/// failure, never propagated into game flow.
pub struct Leaderboard {
    projection: Arc<dyn LeaderboardStore>,
    store: Arc<dyn Store>,
}

impl Leaderboard {
    pub fn new(projection: Arc<dyn LeaderboardStore>, store: Arc<dyn Store>) -> Self {
        Self { projection, store }
    }

    /// Publishes fresh post-settlement user snapshots into the projection.
    pub async fn publish(&self, users: &[User]) {
        for user in users {
            let scored = self.projection.sorted_set_add(user.id(), user.elo() as i64);
            let hashed = self.projection.hash_set(user.id(), hash_fields(user));
            if let Err(e) = scored.await.and(hashed.await) {
                log::warn!("[leaderboard] publish failed for {}: {}", user.username(), e);
                return;
            }
        }
    }

    /// Top N by rating, best first.
    pub async fn top(&self, n: usize) -> Result<Vec<LeaderboardEntry>, StoreError> {
        if n == 0 {
            return Ok(Vec::new());
        }
        match self.projection.sorted_set_range_by_rank(0, n - 1).await {
            Ok(range) => {
                let mut entries = Vec::with_capacity(range.len());
                for (rank, (member, score)) in range.into_iter().enumerate() {
                    entries.push(self.entry(member, rank as i64 + 1, score).await);
                }
                Ok(entries)
            }
            Err(e) => {
                log::warn!("[leaderboard] projection unreachable ({}), using store", e);
                self.top_from_store(n).await
            }
        }
    }

    /// 1-based rank; 0 when the user is not ranked.
    pub async fn rank_of(&self, user: ID<User>) -> Result<i64, StoreError> {
        match self.projection.sorted_set_rank(user).await {
            Ok(Some(rank)) => Ok(rank as i64 + 1),
            Ok(None) => Ok(0),
            Err(e) => {
                log::warn!("[leaderboard] projection unreachable ({}), using store", e);
                self.store.elo_rank(user).await
            }
        }
    }

    /// The user's neighborhood: `range` rows either side of them.
    pub async fn around(
        &self,
        user: ID<User>,
        range: usize,
    ) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let rank = self.rank_of(user).await?;
        if rank == 0 {
            return Ok(Vec::new());
        }
        let start = (rank as usize - 1).saturating_sub(range);
        let stop = rank as usize - 1 + range;
        self.range_by_rank(start, stop).await
    }

    /// Rows from `start` to `stop` inclusive, 0-based.
    pub async fn range_by_rank(
        &self,
        start: usize,
        stop: usize,
    ) -> Result<Vec<LeaderboardEntry>, StoreError> {
        match self.projection.sorted_set_range_by_rank(start, stop).await {
            Ok(window) => {
                let mut entries = Vec::with_capacity(window.len());
                for (offset, (member, score)) in window.into_iter().enumerate() {
                    entries.push(self.entry(member, (start + offset) as i64 + 1, score).await);
                }
                Ok(entries)
            }
            Err(e) => {
                log::warn!("[leaderboard] projection unreachable ({}), using store", e);
                let all = self.top_from_store(stop + 1).await?;
                Ok(all.into_iter().skip(start).collect())
            }
        }
    }

    pub async fn remove(&self, user: ID<User>) {
        if let Err(e) = self.projection.sorted_set_remove(user).await {
            log::warn!("[leaderboard] remove failed for {}: {}", user, e);
        }
    }

    /// Rebuilds the whole projection from the persistent store.
    pub async fn sync_from_store(&self) -> Result<usize, StoreError> {
        let users = self.store.active_users().await?;
        if let Err(e) = self.projection.clear().await {
            log::warn!("[leaderboard] sync skipped, projection down: {}", e);
            return Ok(0);
        }
        self.publish(&users).await;
        log::info!("[leaderboard] synced {} users from store", users.len());
        Ok(users.len())
    }

    /// Periodic repair loop; keeps the projection honest after failures.
    pub fn spawn_reconciler(self: Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await;
            loop {
                interval.tick().await;
                if let Err(e) = self.sync_from_store().await {
                    log::warn!("[leaderboard] reconcile failed: {}", e);
                }
            }
        })
    }

    async fn entry(&self, member: ID<User>, rank: i64, score: i64) -> LeaderboardEntry {
        let hash = self.projection.hash_get_all(member).await.unwrap_or_default();
        LeaderboardEntry {
            user: member,
            rank,
            elo: score as Elo,
            username: hash.get("username").cloned().unwrap_or_default(),
            display_name: hash.get("displayName").cloned().unwrap_or_default(),
            games_played: hash
                .get("gamesPlayed")
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            win_rate: hash.get("winRate").and_then(|s| s.parse().ok()).unwrap_or(0.0),
        }
    }

    async fn top_from_store(&self, n: usize) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let users = self.store.top_by_elo(n).await?;
        Ok(users
            .into_iter()
            .enumerate()
            .map(|(i, user)| LeaderboardEntry {
                user: user.id(),
                rank: i as i64 + 1,
                elo: user.elo(),
                username: user.username().to_string(),
                display_name: user.display_name().to_string(),
                games_played: i64::from(user.games_played()),
                win_rate: user.win_rate(),
            })
            .collect())
    }
}

fn hash_fields(user: &User) -> Vec<(String, String)> {
    vec![
        ("username".into(), user.username().to_string()),
        ("displayName".into(), user.display_name().to_string()),
        ("gamesPlayed".into(), user.games_played().to_string()),
        ("winRate".into(), format!("{:.4}", user.win_rate())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemorySortedSet;
    use okey_database::MemoryStore;
    use okey_database::Store as _;

    async fn seeded() -> (Arc<Leaderboard>, Arc<MemorySortedSet>, Arc<MemoryStore>, Vec<User>) {
        let projection = Arc::new(MemorySortedSet::new());
        let store = Arc::new(MemoryStore::new());
        let mut users = Vec::new();
        for (name, elo_delta) in [("ana", 300), ("banu", 150), ("cem", 0)] {
            let mut user = User::new(name, name, 0);
            user.apply_elo(elo_delta);
            store.create_user(&user).await.unwrap();
            users.push(user);
        }
        let board = Arc::new(Leaderboard::new(projection.clone(), store.clone()));
        board.publish(&users).await;
        (board, projection, store, users)
    }

    #[tokio::test]
    async fn top_orders_by_rating() {
        let (board, _, _, users) = seeded().await;
        let top = board.top(2).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].user, users[0].id());
        assert_eq!(top[0].rank, 1);
        assert_eq!(top[0].username, "ana");
        assert_eq!(top[1].user, users[1].id());
    }

    #[tokio::test]
    async fn rank_is_one_based_with_zero_sentinel() {
        let (board, _, _, users) = seeded().await;
        assert_eq!(board.rank_of(users[2].id()).await.unwrap(), 3);
        assert_eq!(board.rank_of(ID::default()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn around_returns_the_neighborhood() {
        let (board, _, _, users) = seeded().await;
        let hood = board.around(users[1].id(), 1).await.unwrap();
        assert_eq!(hood.len(), 3);
        assert_eq!(hood[1].user, users[1].id());
    }

    #[tokio::test]
    async fn reads_fall_back_to_store_when_projection_is_down() {
        let (board, projection, _, users) = seeded().await;
        projection.set_unavailable(true);
        let top = board.top(3).await.unwrap();
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].user, users[0].id());
        assert_eq!(board.rank_of(users[0].id()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn sync_rebuilds_from_store() {
        let (board, projection, store, _) = seeded().await;
        let newcomer = {
            let mut user = User::new("derin", "Derin", 0);
            user.apply_elo(500);
            store.create_user(&user).await.unwrap();
            user
        };
        // projection does not know the newcomer yet
        assert_eq!(board.rank_of(newcomer.id()).await.unwrap(), 0);
        let synced = board.sync_from_store().await.unwrap();
        assert_eq!(synced, 4);
        assert_eq!(board.rank_of(newcomer.id()).await.unwrap(), 1);
        let _ = projection;
    }
}
