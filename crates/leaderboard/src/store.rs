use okey_core::ID;
use okey_database::User;
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use tokio::sync::RwLock;

/// Projection store failure. Always recoverable: callers fall back to the
/// persistent store and the reconciler repairs the projection later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardError(pub String);

impl std::fmt::Display for LeaderboardError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "leaderboard store: {}", self.0)
    }
}

impl std::error::Error for LeaderboardError {}

/// The sorted-set and hash operations the projection is built on.
///
/// Shaped after a redis-style store: one sorted set keyed by score, one
/// hash per member for display fields. Per-key operations are atomic.
#[async_trait::async_trait]
pub trait LeaderboardStore: Send + Sync {
    async fn sorted_set_add(&self, member: ID<User>, score: i64) -> Result<(), LeaderboardError>;
    async fn sorted_set_remove(&self, member: ID<User>) -> Result<(), LeaderboardError>;
    /// Members from `start` to `stop` inclusive, 0-based, descending score.
    async fn sorted_set_range_by_rank(
        &self,
        start: usize,
        stop: usize,
    ) -> Result<Vec<(ID<User>, i64)>, LeaderboardError>;
    /// 0-based rank in descending order, None when absent.
    async fn sorted_set_rank(&self, member: ID<User>) -> Result<Option<usize>, LeaderboardError>;
    async fn sorted_set_len(&self) -> Result<usize, LeaderboardError>;
    async fn hash_set(
        &self,
        member: ID<User>,
        fields: Vec<(String, String)>,
    ) -> Result<(), LeaderboardError>;
    async fn hash_get_all(
        &self,
        member: ID<User>,
    ) -> Result<HashMap<String, String>, LeaderboardError>;
    /// Drops everything; used by full re-syncs.
    async fn clear(&self) -> Result<(), LeaderboardError>;
}

#[derive(Default)]
struct Inner {
    scores: HashMap<ID<User>, i64>,
    sorted: BTreeSet<(i64, ID<User>)>,
    hashes: HashMap<ID<User>, HashMap<String, String>>,
}

/// In-process sorted-set store.
///
/// Same contract a redis backend would satisfy; ties break by member id,
/// ascending, mirroring lexicographic tie-breaks. The `unavailable`
/// switch exists to exercise the fallback paths in tests.
#[derive(Default)]
pub struct MemorySortedSet {
    inner: RwLock<Inner>,
    unavailable: AtomicBool,
}

impl MemorySortedSet {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }
    fn check(&self) -> Result<(), LeaderboardError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(LeaderboardError("switched off".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl LeaderboardStore for MemorySortedSet {
    async fn sorted_set_add(&self, member: ID<User>, score: i64) -> Result<(), LeaderboardError> {
        self.check()?;
        let mut inner = self.inner.write().await;
        if let Some(old) = inner.scores.insert(member, score) {
            inner.sorted.remove(&(old, member));
        }
        inner.sorted.insert((score, member));
        Ok(())
    }
    async fn sorted_set_remove(&self, member: ID<User>) -> Result<(), LeaderboardError> {
        self.check()?;
        let mut inner = self.inner.write().await;
        if let Some(old) = inner.scores.remove(&member) {
            inner.sorted.remove(&(old, member));
        }
        inner.hashes.remove(&member);
        Ok(())
    }
    async fn sorted_set_range_by_rank(
        &self,
        start: usize,
        stop: usize,
    ) -> Result<Vec<(ID<User>, i64)>, LeaderboardError> {
        self.check()?;
        let inner = self.inner.read().await;
        Ok(inner
            .sorted
            .iter()
            .rev()
            .enumerate()
            .skip(start)
            .take_while(|(i, _)| *i <= stop)
            .map(|(_, (score, member))| (*member, *score))
            .collect())
    }
    async fn sorted_set_rank(&self, member: ID<User>) -> Result<Option<usize>, LeaderboardError> {
        self.check()?;
        let inner = self.inner.read().await;
        Ok(inner
            .sorted
            .iter()
            .rev()
            .position(|(_, m)| *m == member))
    }
    async fn sorted_set_len(&self) -> Result<usize, LeaderboardError> {
        self.check()?;
        Ok(self.inner.read().await.sorted.len())
    }
    async fn hash_set(
        &self,
        member: ID<User>,
        fields: Vec<(String, String)>,
    ) -> Result<(), LeaderboardError> {
        self.check()?;
        let mut inner = self.inner.write().await;
        inner.hashes.entry(member).or_default().extend(fields);
        Ok(())
    }
    async fn hash_get_all(
        &self,
        member: ID<User>,
    ) -> Result<HashMap<String, String>, LeaderboardError> {
        self.check()?;
        Ok(self
            .inner
            .read()
            .await
            .hashes
            .get(&member)
            .cloned()
            .unwrap_or_default())
    }
    async fn clear(&self) -> Result<(), LeaderboardError> {
        self.check()?;
        let mut inner = self.inner.write().await;
        inner.scores.clear();
        inner.sorted.clear();
        inner.hashes.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_replaces_previous_score() {
        let set = MemorySortedSet::new();
        let member = ID::default();
        set.sorted_set_add(member, 1_000).await.unwrap();
        set.sorted_set_add(member, 1_200).await.unwrap();
        assert_eq!(set.sorted_set_len().await.unwrap(), 1);
        let range = set.sorted_set_range_by_rank(0, 10).await.unwrap();
        assert_eq!(range, vec![(member, 1_200)]);
    }

    #[tokio::test]
    async fn ranks_descend_by_score() {
        let set = MemorySortedSet::new();
        let (a, b, c) = (ID::default(), ID::default(), ID::default());
        set.sorted_set_add(a, 900).await.unwrap();
        set.sorted_set_add(b, 1_500).await.unwrap();
        set.sorted_set_add(c, 1_200).await.unwrap();
        assert_eq!(set.sorted_set_rank(b).await.unwrap(), Some(0));
        assert_eq!(set.sorted_set_rank(c).await.unwrap(), Some(1));
        assert_eq!(set.sorted_set_rank(a).await.unwrap(), Some(2));
        assert_eq!(set.sorted_set_rank(ID::default()).await.unwrap(), None);
        let top2 = set.sorted_set_range_by_rank(0, 1).await.unwrap();
        assert_eq!(top2.len(), 2);
        assert_eq!(top2[0].0, b);
    }

    #[tokio::test]
    async fn remove_clears_hash_too() {
        let set = MemorySortedSet::new();
        let member = ID::default();
        set.sorted_set_add(member, 1_000).await.unwrap();
        set.hash_set(member, vec![("username".into(), "x".into())])
            .await
            .unwrap();
        set.sorted_set_remove(member).await.unwrap();
        assert_eq!(set.sorted_set_len().await.unwrap(), 0);
        assert!(set.hash_get_all(member).await.unwrap().is_empty());
    }
}
