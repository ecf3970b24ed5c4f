use crate::EloOutcome;
use crate::pair_change;
use okey_core::Chips;
use okey_core::ID;
use okey_core::RAKE_CAP;
use okey_core::RAKE_PERCENT;
use okey_core::SETTLE_BACKOFF_MILLIS;
use okey_core::Score;
use okey_core::Seat;
use okey_core::Unique;
use okey_database::ChipTransaction;
use okey_database::GameHistory;
use okey_database::GameStatus;
use okey_database::PlayerResult;
use okey_database::Store;
use okey_database::StoreError;
use okey_database::TransactionKind;
use okey_database::UnitOfWork;
use okey_database::User;
use okey_rules::WinKind;
use okey_rules::score_win;

/// One seat's identity at settlement time. Bots carry no user id and are
/// exempt from every chip and rating movement.
#[derive(Debug, Clone)]
pub struct Participant {
    pub user: Option<ID<User>>,
    pub seat: Seat,
    pub display_name: String,
    /// Okey and false-joker tiles stranded in this hand at game end;
    /// each one is worth an extra point to the winner.
    pub wilds_left: usize,
}

/// What the room hands the pipeline when a game finishes with a winner.
#[derive(Debug, Clone)]
pub struct GameOutcome {
    pub winner: Seat,
    pub kind: WinKind,
    pub participants: Vec<Participant>,
}

/// Pipeline failure modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleError {
    /// A seated user id has no persistent account.
    MissingUser(ID<User>),
    /// Stake collection found a balance below the table stake.
    InsufficientBalance(ID<User>),
    /// The store refused; retryable only for `StoreError::Unavailable`.
    Store(StoreError),
}

impl std::fmt::Display for SettleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingUser(id) => write!(f, "missing user: {}", id),
            Self::InsufficientBalance(id) => write!(f, "insufficient balance for: {}", id),
            Self::Store(e) => write!(f, "store: {}", e),
        }
    }
}

impl std::error::Error for SettleError {}

impl From<StoreError> for SettleError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

/// Result of a settlement: the post-commit users for leaderboard
/// publication, and whether this call actually applied anything.
#[derive(Debug, Clone, Default)]
pub struct Settled {
    pub users: Vec<User>,
    pub applied: bool,
    pub rake: Chips,
    pub score: Score,
}

/// Collects the table stake from every human seat, all or nothing.
///
/// Runs before the shuffle: a `GameStake` debit per human under one unit of
/// work, keyed so a replay is harmless. Any single short balance aborts the
/// whole collection.
pub async fn collect_stakes<S: Store + ?Sized>(
    store: &S,
    game: ID<GameHistory>,
    stake: Chips,
    humans: &[ID<User>],
) -> Result<(), SettleError> {
    let mut unit = UnitOfWork::new();
    for &id in humans {
        let mut user = store
            .user(id)
            .await?
            .ok_or(SettleError::MissingUser(id))?;
        if user.chips() < stake {
            return Err(SettleError::InsufficientBalance(id));
        }
        let tx = ChipTransaction::new(
            id,
            Some(game),
            TransactionKind::GameStake,
            -stake,
            user.chips(),
            "table stake",
            Some(format!("game-stake-{}-{}", game, id)),
        )?;
        user.debit(stake)?;
        unit.append_transaction(tx);
        unit.update_user(user);
    }
    match store.commit(unit).await {
        Ok(()) => Ok(()),
        Err(StoreError::DuplicateIdempotency(_)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Settles a completed game exactly once.
///
/// Finalizes the history, splits the pot, appends the audit trail, applies
/// stats and ratings, and commits it all in one unit. The idempotency key
/// derived from the history id makes a duplicate attempt a clean no-op.
pub async fn settle<S: Store + ?Sized>(
    store: &S,
    history: &GameHistory,
    outcome: &GameOutcome,
    revealed_seed: &str,
) -> Result<Settled, SettleError> {
    let key = format!("game-settle-{}", history.id());
    let prior = store.transactions_by_game(history.id()).await?;
    if prior
        .iter()
        .any(|t| matches!(t.kind(), TransactionKind::GameWin | TransactionKind::GameLoss))
    {
        log::info!("[settle {}] already settled, short-circuiting", history.id());
        return Ok(Settled::default());
    }
    let stake = history.table_stake();
    let pot = stake * outcome.participants.len() as Chips;
    let rake = (pot * RAKE_PERCENT / 100).min(RAKE_CAP);
    let payout = pot - rake;
    let wild_bonus: Score = outcome
        .participants
        .iter()
        .filter(|p| p.seat != outcome.winner)
        .map(|p| p.wilds_left as Score)
        .sum();
    let score = score_win(outcome.kind) + wild_bonus;
    let winner = outcome
        .participants
        .iter()
        .find(|p| p.seat == outcome.winner)
        .expect("winner seat is seated");
    let mut users = load_users(store, &outcome.participants).await?;
    // rating deltas from pre-game snapshots, before anything mutates
    let winner_rating = winner.user.and_then(|id| users_snapshot(&users, id));
    let plans = outcome
        .participants
        .iter()
        .map(|participant| {
            let won = participant.seat == outcome.winner;
            let id = participant.user?;
            let rating = users_snapshot(&users, id)?;
            Some(if won {
                let total = outcome
                    .participants
                    .iter()
                    .filter(|p| p.seat != outcome.winner)
                    .filter_map(|p| p.user)
                    .filter_map(|loser| users_snapshot(&users, loser))
                    .map(|loser| pair_change(rating, loser, outcome.kind.into()).0)
                    .sum::<i32>();
                (id, payout, total, TransactionKind::GameWin, "pot payout")
            } else {
                let change = winner_rating
                    .map(|w| pair_change(w, rating, outcome.kind.into()).1)
                    .unwrap_or(0);
                (id, 0, change, TransactionKind::GameLoss, "game lost")
            })
        })
        .collect::<Vec<_>>();
    let mut unit = UnitOfWork::new();
    let mut results = Vec::new();
    for (participant, plan) in outcome.participants.iter().zip(plans) {
        let won = participant.seat == outcome.winner;
        let Some((id, chips_delta, elo_change, kind, description)) = plan else {
            results.push(result_for(participant, won, 0, 0));
            continue;
        };
        let user = users
            .iter_mut()
            .find(|u| u.id() == id)
            .ok_or(SettleError::MissingUser(id))?;
        let tx = ChipTransaction::new(
            id,
            Some(history.id()),
            kind,
            chips_delta,
            user.chips(),
            description,
            Some(if won {
                key.clone()
            } else {
                format!("{}-{}", key, id)
            }),
        )?;
        user.credit(chips_delta)?;
        user.apply_elo(elo_change);
        user.record_game(won);
        results.push(result_for(participant, won, chips_delta - stake, elo_change));
        unit.append_transaction(tx);
    }
    let mut finalized = history.clone();
    finalized.complete(winner.user, outcome.kind, score, rake, results, revealed_seed);
    unit.record_history(finalized);
    for user in users.iter() {
        unit.update_user(user.clone());
    }
    match store.commit(unit).await {
        Ok(()) => {
            log::info!(
                "[settle {}] pot {} rake {} score {}",
                history.id(),
                pot,
                rake,
                score
            );
            Ok(Settled {
                users,
                applied: true,
                rake,
                score,
            })
        }
        Err(StoreError::DuplicateIdempotency(_)) => Ok(Settled::default()),
        Err(e) => Err(e.into()),
    }
}

/// [`settle`] with the standard unavailability retry schedule.
pub async fn settle_with_retry<S: Store + ?Sized>(
    store: &S,
    history: &GameHistory,
    outcome: &GameOutcome,
    revealed_seed: &str,
) -> Result<Settled, SettleError> {
    let mut backoff = SETTLE_BACKOFF_MILLIS.iter();
    loop {
        match settle(store, history, outcome, revealed_seed).await {
            Err(SettleError::Store(StoreError::Unavailable(reason))) => match backoff.next() {
                Some(&millis) => {
                    log::warn!(
                        "[settle {}] store unavailable ({}), retrying in {}ms",
                        history.id(),
                        reason,
                        millis
                    );
                    tokio::time::sleep(std::time::Duration::from_millis(millis)).await;
                }
                None => {
                    return Err(SettleError::Store(StoreError::Unavailable(reason)));
                }
            },
            other => return other,
        }
    }
}

/// Refunds collected stakes and finalizes the history as cancelled.
///
/// Locates the game's `GameStake` debits and mirrors each one back, keyed
/// per user so replays cannot double-credit. Loss counters are left alone;
/// only balances are restored.
pub async fn cancel_with_refund<S: Store + ?Sized>(
    store: &S,
    history: &GameHistory,
    status: GameStatus,
    results: Vec<PlayerResult>,
    revealed_seed: &str,
) -> Result<(), SettleError> {
    let stakes = store
        .transactions_by_game(history.id())
        .await?
        .into_iter()
        .filter(|t| t.kind() == TransactionKind::GameStake)
        .collect::<Vec<_>>();
    let mut unit = UnitOfWork::new();
    for stake in stakes {
        let id = stake.user_id();
        let mut user = store
            .user(id)
            .await?
            .ok_or(SettleError::MissingUser(id))?;
        let amount = -stake.amount();
        let tx = ChipTransaction::new(
            id,
            Some(history.id()),
            TransactionKind::AdminAdjustment,
            amount,
            user.chips(),
            "stake refund",
            Some(format!("game-refund-{}-{}", history.id(), id)),
        )?;
        user.credit(amount)?;
        unit.append_transaction(tx);
        unit.update_user(user);
    }
    let mut finalized = history.clone();
    finalized.cancel(status, results, revealed_seed);
    unit.record_history(finalized);
    match store.commit(unit).await {
        Ok(()) => Ok(()),
        Err(StoreError::DuplicateIdempotency(_)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn load_users<S: Store + ?Sized>(
    store: &S,
    participants: &[Participant],
) -> Result<Vec<User>, SettleError> {
    let ids = participants
        .iter()
        .filter_map(|p| p.user)
        .collect::<Vec<_>>();
    let users = store.users(&ids).await?;
    for &id in &ids {
        if !users.iter().any(|u| u.id() == id) {
            return Err(SettleError::MissingUser(id));
        }
    }
    Ok(users)
}

fn users_snapshot(users: &[User], id: ID<User>) -> Option<(i32, i32)> {
    users
        .iter()
        .find(|u| u.id() == id)
        .map(|u| (u.elo(), u.games_played()))
}

fn result_for(participant: &Participant, won: bool, chips_delta: Chips, elo_change: i32) -> PlayerResult {
    PlayerResult {
        user_id: participant.user,
        seat: participant.seat,
        display_name: participant.display_name.clone(),
        is_bot: participant.user.is_none(),
        won,
        chips_delta,
        elo_change,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use okey_database::MemoryStore;

    async fn seated_table(store: &MemoryStore, balance: Chips) -> (GameHistory, GameOutcome) {
        let mut participants = Vec::new();
        for (i, seat) in Seat::all().into_iter().enumerate() {
            let user = User::new(&format!("player{}", i), &format!("Player {}", i), balance);
            store.create_user(&user).await.unwrap();
            participants.push(Participant {
                user: Some(user.id()),
                seat,
                display_name: user.display_name().to_string(),
                wilds_left: 0,
            });
        }
        let history = GameHistory::started(uuid::Uuid::now_v7(), 100, "hash", None);
        store.create_history(&history).await.unwrap();
        let outcome = GameOutcome {
            winner: Seat::South,
            kind: WinKind::Normal,
            participants,
        };
        (history, outcome)
    }

    async fn balance(store: &MemoryStore, id: ID<User>) -> Chips {
        store.user(id).await.unwrap().unwrap().chips()
    }

    fn ids(outcome: &GameOutcome) -> Vec<ID<User>> {
        outcome.participants.iter().filter_map(|p| p.user).collect()
    }

    #[tokio::test]
    async fn happy_path_win() {
        let store = MemoryStore::new();
        let (history, outcome) = seated_table(&store, 1_000).await;
        collect_stakes(&store, history.id(), 100, &ids(&outcome))
            .await
            .unwrap();
        for id in ids(&outcome) {
            assert_eq!(balance(&store, id).await, 900);
        }
        let settled = settle(&store, &history, &outcome, "seed").await.unwrap();
        assert!(settled.applied);
        assert_eq!(settled.rake, 20);
        let winner = outcome.participants[0].user.unwrap();
        assert_eq!(balance(&store, winner).await, 1_280);
        for p in &outcome.participants[1..] {
            assert_eq!(balance(&store, p.user.unwrap()).await, 900);
        }
        let winner_elo = store.user(winner).await.unwrap().unwrap().elo();
        assert!(winner_elo >= 1_003);
        let stored = store.history(history.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), GameStatus::Completed);
        assert_eq!(stored.winner_id(), Some(winner));
        assert_eq!(stored.revealed_seed(), Some("seed"));
    }

    #[tokio::test]
    async fn chip_conservation() {
        let store = MemoryStore::new();
        let (history, outcome) = seated_table(&store, 1_000).await;
        collect_stakes(&store, history.id(), 100, &ids(&outcome))
            .await
            .unwrap();
        let settled = settle(&store, &history, &outcome, "seed").await.unwrap();
        let mut deltas = 0;
        for id in ids(&outcome) {
            deltas += balance(&store, id).await - 1_000;
        }
        assert_eq!(deltas + settled.rake, 0);
    }

    #[tokio::test]
    async fn settle_is_idempotent() {
        let store = MemoryStore::new();
        let (history, outcome) = seated_table(&store, 1_000).await;
        collect_stakes(&store, history.id(), 100, &ids(&outcome))
            .await
            .unwrap();
        let first = settle(&store, &history, &outcome, "seed").await.unwrap();
        assert!(first.applied);
        let second = settle(&store, &history, &outcome, "seed").await.unwrap();
        assert!(!second.applied);
        let winner = outcome.participants[0].user.unwrap();
        assert_eq!(balance(&store, winner).await, 1_280);
        let txs = store.transactions_by_game(history.id()).await.unwrap();
        assert_eq!(
            txs.iter().filter(|t| t.kind() == TransactionKind::GameWin).count(),
            1
        );
    }

    #[tokio::test]
    async fn stake_collection_aborts_whole_group() {
        let store = MemoryStore::new();
        let (history, outcome) = seated_table(&store, 1_000).await;
        let poor = User::new("poor", "Poor", 50);
        store.create_user(&poor).await.unwrap();
        let mut humans = ids(&outcome);
        humans[3] = poor.id();
        let err = collect_stakes(&store, history.id(), 100, &humans)
            .await
            .unwrap_err();
        assert_eq!(err, SettleError::InsufficientBalance(poor.id()));
        for id in ids(&outcome).into_iter().take(3) {
            assert_eq!(balance(&store, id).await, 1_000);
        }
        assert!(store.transactions_by_game(history.id()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stake_collection_is_replay_safe() {
        let store = MemoryStore::new();
        let (history, outcome) = seated_table(&store, 1_000).await;
        collect_stakes(&store, history.id(), 100, &ids(&outcome))
            .await
            .unwrap();
        collect_stakes(&store, history.id(), 100, &ids(&outcome))
            .await
            .unwrap();
        for id in ids(&outcome) {
            assert_eq!(balance(&store, id).await, 900);
        }
    }

    #[tokio::test]
    async fn cancel_restores_balances_exactly() {
        let store = MemoryStore::new();
        let (history, outcome) = seated_table(&store, 1_000).await;
        collect_stakes(&store, history.id(), 100, &ids(&outcome))
            .await
            .unwrap();
        cancel_with_refund(&store, &history, GameStatus::Cancelled, Vec::new(), "seed")
            .await
            .unwrap();
        for id in ids(&outcome) {
            assert_eq!(balance(&store, id).await, 1_000);
        }
        let stored = store.history(history.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), GameStatus::Cancelled);
        // replay cannot double-credit
        cancel_with_refund(&store, &history, GameStatus::Cancelled, Vec::new(), "seed")
            .await
            .unwrap();
        for id in ids(&outcome) {
            assert_eq!(balance(&store, id).await, 1_000);
        }
    }

    #[tokio::test]
    async fn bots_are_exempt() {
        let store = MemoryStore::new();
        let human = User::new("solo", "Solo", 1_000);
        store.create_user(&human).await.unwrap();
        let mut participants = vec![Participant {
            user: Some(human.id()),
            seat: Seat::South,
            display_name: "Solo".to_string(),
            wilds_left: 0,
        }];
        for (i, seat) in [Seat::East, Seat::North, Seat::West].into_iter().enumerate() {
            participants.push(Participant {
                user: None,
                seat,
                display_name: format!("Bot {}", i),
                wilds_left: 1,
            });
        }
        let history = GameHistory::started(uuid::Uuid::now_v7(), 100, "hash", None);
        store.create_history(&history).await.unwrap();
        collect_stakes(&store, history.id(), 100, &[human.id()])
            .await
            .unwrap();
        let outcome = GameOutcome {
            winner: Seat::South,
            kind: WinKind::Pairs,
            participants,
        };
        let settled = settle(&store, &history, &outcome, "seed").await.unwrap();
        // pairs base 3 plus one stranded wildcard per bot hand
        assert_eq!(settled.score, 6);
        assert_eq!(balance(&store, human.id()).await, 1_280);
        let user = store.user(human.id()).await.unwrap().unwrap();
        assert_eq!(user.games_won(), 1);
        assert_eq!(user.elo(), 1_000);
    }

    #[tokio::test]
    async fn retry_rides_out_a_blip() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let (history, outcome) = seated_table(&store, 1_000).await;
        collect_stakes(&*store, history.id(), 100, &ids(&outcome))
            .await
            .unwrap();
        store.set_unavailable(true);
        let flipper = store.clone();
        let restore = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(150)).await;
            flipper.set_unavailable(false);
        });
        let settled = settle_with_retry(&*store, &history, &outcome, "seed")
            .await
            .unwrap();
        assert!(settled.applied);
        restore.await.unwrap();
    }
}
