use crate::ChipTransaction;
use crate::GameHistory;
use crate::GameStatus;
use crate::HISTORIES;
use crate::PlayerResult;
use crate::Schema;
use crate::Store;
use crate::StoreError;
use crate::TRANSACTIONS;
use crate::TransactionKind;
use crate::USERS;
use crate::UnitOfWork;
use crate::User;
use okey_core::ID;
use okey_core::Unique;
use okey_rules::WinKind;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_postgres::Client;
use tokio_postgres::NoTls;
use tokio_postgres::Row;

/// PostgreSQL-backed store.
///
/// Two connections: a shared reader for concurrent queries, and a
/// mutex-serialized writer so [`Store::commit`] can own a real transaction
/// without interleaving BEGIN/COMMIT across rooms.
pub struct Postgres {
    reader: Arc<Client>,
    writer: Arc<Mutex<Client>>,
}

impl Postgres {
    pub async fn connect(url: &str) -> Result<Self, tokio_postgres::Error> {
        let (reader, conn) = tokio_postgres::connect(url, NoTls).await?;
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                log::error!("[postgres] reader connection error: {}", e);
            }
        });
        let (writer, conn) = tokio_postgres::connect(url, NoTls).await?;
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                log::error!("[postgres] writer connection error: {}", e);
            }
        });
        reader
            .execute("SET client_min_messages TO WARNING", &[])
            .await?;
        Ok(Self {
            reader: Arc::new(reader),
            writer: Arc::new(Mutex::new(writer)),
        })
    }
    /// Creates tables and indices for all entities.
    pub async fn migrate(&self) -> Result<(), tokio_postgres::Error> {
        for ddl in [
            User::creates(),
            User::indices(),
            GameHistory::creates(),
            GameHistory::indices(),
            ChipTransaction::creates(),
            ChipTransaction::indices(),
        ] {
            self.reader.batch_execute(ddl).await?;
        }
        log::info!("[postgres] schema up to date");
        Ok(())
    }
}

const USER_COLS: &str =
    "id, username, display_name, chips, elo, highest_elo, games_played, games_won, \
     created_at, last_login_at, active, version";
const HISTORY_COLS: &str =
    "id, room_id, started_at, ended_at, status, winner_id, win_kind, win_score, \
     table_stake, rake, player_results, seed_hash, revealed_seed, client_seed";
const TX_COLS: &str =
    "id, user_id, game_id, kind, amount, balance_before, balance_after, description, \
     created_at, reference, idempotency_key";

fn user_from(row: &Row) -> User {
    User::hydrate(
        ID::from(row.get::<_, uuid::Uuid>(0)),
        row.get(1),
        row.get(2),
        row.get(3),
        row.get(4),
        row.get(5),
        row.get(6),
        row.get(7),
        row.get(8),
        row.get(9),
        row.get(10),
        row.get(11),
    )
}

fn history_from(row: &Row) -> Result<GameHistory, StoreError> {
    let status = GameStatus::try_from(row.get::<_, &str>(4)).map_err(StoreError::Invariant)?;
    let win_kind = row
        .get::<_, Option<&str>>(6)
        .map(WinKind::try_from)
        .transpose()
        .map_err(StoreError::Invariant)?;
    let results: Vec<PlayerResult> =
        serde_json::from_value(row.get::<_, serde_json::Value>(10))
            .map_err(|e| StoreError::Invariant(e.to_string()))?;
    Ok(GameHistory::hydrate(
        ID::from(row.get::<_, uuid::Uuid>(0)),
        row.get(1),
        row.get(2),
        row.get(3),
        status,
        row.get::<_, Option<uuid::Uuid>>(5).map(ID::from),
        win_kind,
        row.get(7),
        row.get(8),
        row.get(9),
        results,
        row.get(11),
        row.get(12),
        row.get(13),
    ))
}

fn tx_from(row: &Row) -> Result<ChipTransaction, StoreError> {
    let kind = TransactionKind::try_from(row.get::<_, &str>(3)).map_err(StoreError::Invariant)?;
    Ok(ChipTransaction::hydrate(
        ID::from(row.get::<_, uuid::Uuid>(0)),
        ID::from(row.get::<_, uuid::Uuid>(1)),
        row.get::<_, Option<uuid::Uuid>>(2).map(ID::from),
        kind,
        row.get(4),
        row.get(5),
        row.get(6),
        row.get(7),
        row.get(8),
        row.get(9),
        row.get(10),
    ))
}

#[async_trait::async_trait]
impl Store for Postgres {
    async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        self.reader
            .execute(
                const_format::concatcp!(
                    "INSERT INTO ",
                    USERS,
                    " (id, username, display_name, chips, elo, highest_elo, games_played, \
                     games_won, created_at, last_login_at, active, version) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
                ),
                &[
                    &user.id().inner(),
                    &user.username(),
                    &user.display_name(),
                    &user.chips(),
                    &user.elo(),
                    &user.highest_elo(),
                    &user.games_played(),
                    &user.games_won(),
                    &user.created_at(),
                    &user.last_login_at(),
                    &user.active(),
                    &user.version(),
                ],
            )
            .await
            .map(|_| ())
            .map_err(StoreError::from)
    }

    async fn user(&self, id: ID<User>) -> Result<Option<User>, StoreError> {
        self.reader
            .query_opt(
                const_format::concatcp!("SELECT ", USER_COLS, " FROM ", USERS, " WHERE id = $1"),
                &[&id.inner()],
            )
            .await
            .map(|opt| opt.as_ref().map(user_from))
            .map_err(StoreError::from)
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.reader
            .query_opt(
                const_format::concatcp!(
                    "SELECT ",
                    USER_COLS,
                    " FROM ",
                    USERS,
                    " WHERE username = LOWER($1)"
                ),
                &[&username],
            )
            .await
            .map(|opt| opt.as_ref().map(user_from))
            .map_err(StoreError::from)
    }

    async fn users(&self, ids: &[ID<User>]) -> Result<Vec<User>, StoreError> {
        let uuids = ids.iter().map(|id| id.inner()).collect::<Vec<_>>();
        self.reader
            .query(
                const_format::concatcp!(
                    "SELECT ",
                    USER_COLS,
                    " FROM ",
                    USERS,
                    " WHERE id = ANY($1)"
                ),
                &[&uuids],
            )
            .await
            .map(|rows| rows.iter().map(user_from).collect())
            .map_err(StoreError::from)
    }

    async fn top_by_elo(&self, n: usize) -> Result<Vec<User>, StoreError> {
        self.reader
            .query(
                const_format::concatcp!(
                    "SELECT ",
                    USER_COLS,
                    " FROM ",
                    USERS,
                    " WHERE active ORDER BY elo DESC, username ASC LIMIT $1"
                ),
                &[&(n as i64)],
            )
            .await
            .map(|rows| rows.iter().map(user_from).collect())
            .map_err(StoreError::from)
    }

    async fn elo_rank(&self, id: ID<User>) -> Result<i64, StoreError> {
        let elo = self
            .reader
            .query_opt(
                const_format::concatcp!(
                    "SELECT elo FROM ",
                    USERS,
                    " WHERE id = $1 AND active"
                ),
                &[&id.inner()],
            )
            .await
            .map_err(StoreError::from)?;
        let Some(row) = elo else {
            return Ok(0);
        };
        let elo: i32 = row.get(0);
        self.reader
            .query_one(
                const_format::concatcp!(
                    "SELECT COUNT(*) + 1 FROM ",
                    USERS,
                    " WHERE active AND elo > $1"
                ),
                &[&elo],
            )
            .await
            .map(|row| row.get(0))
            .map_err(StoreError::from)
    }

    async fn active_users(&self) -> Result<Vec<User>, StoreError> {
        self.reader
            .query(
                const_format::concatcp!(
                    "SELECT ",
                    USER_COLS,
                    " FROM ",
                    USERS,
                    " WHERE active"
                ),
                &[],
            )
            .await
            .map(|rows| rows.iter().map(user_from).collect())
            .map_err(StoreError::from)
    }

    async fn history(&self, id: ID<GameHistory>) -> Result<Option<GameHistory>, StoreError> {
        self.reader
            .query_opt(
                const_format::concatcp!(
                    "SELECT ",
                    HISTORY_COLS,
                    " FROM ",
                    HISTORIES,
                    " WHERE id = $1"
                ),
                &[&id.inner()],
            )
            .await
            .map_err(StoreError::from)?
            .as_ref()
            .map(history_from)
            .transpose()
    }

    async fn histories_by_room(&self, room: uuid::Uuid) -> Result<Vec<GameHistory>, StoreError> {
        self.reader
            .query(
                const_format::concatcp!(
                    "SELECT ",
                    HISTORY_COLS,
                    " FROM ",
                    HISTORIES,
                    " WHERE room_id = $1 ORDER BY started_at"
                ),
                &[&room],
            )
            .await
            .map_err(StoreError::from)?
            .iter()
            .map(history_from)
            .collect()
    }

    async fn create_history(&self, history: &GameHistory) -> Result<(), StoreError> {
        self.reader
            .execute(
                const_format::concatcp!(
                    "INSERT INTO ",
                    HISTORIES,
                    " (id, room_id, started_at, ended_at, status, winner_id, win_kind, \
                     win_score, table_stake, rake, player_results, seed_hash, revealed_seed, \
                     client_seed) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
                ),
                &[
                    &history.id().inner(),
                    &history.room_id(),
                    &history.started_at(),
                    &history.ended_at(),
                    &history.status().to_string(),
                    &history.winner_id().map(|w| w.inner()),
                    &history.win_kind().map(|k| k.to_string()),
                    &history.win_score(),
                    &history.table_stake(),
                    &history.rake(),
                    &serde_json::to_value(history.player_results()).expect("results to json"),
                    &history.seed_hash(),
                    &history.revealed_seed(),
                    &history.client_seed(),
                ],
            )
            .await
            .map(|_| ())
            .map_err(StoreError::from)
    }

    async fn transaction_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<ChipTransaction>, StoreError> {
        self.reader
            .query_opt(
                const_format::concatcp!(
                    "SELECT ",
                    TX_COLS,
                    " FROM ",
                    TRANSACTIONS,
                    " WHERE reference = $1"
                ),
                &[&reference],
            )
            .await
            .map_err(StoreError::from)?
            .as_ref()
            .map(tx_from)
            .transpose()
    }

    async fn transaction_by_idempotency(
        &self,
        key: &str,
    ) -> Result<Option<ChipTransaction>, StoreError> {
        self.reader
            .query_opt(
                const_format::concatcp!(
                    "SELECT ",
                    TX_COLS,
                    " FROM ",
                    TRANSACTIONS,
                    " WHERE idempotency_key = $1"
                ),
                &[&key],
            )
            .await
            .map_err(StoreError::from)?
            .as_ref()
            .map(tx_from)
            .transpose()
    }

    async fn transactions_by_game(
        &self,
        game: ID<GameHistory>,
    ) -> Result<Vec<ChipTransaction>, StoreError> {
        self.reader
            .query(
                const_format::concatcp!(
                    "SELECT ",
                    TX_COLS,
                    " FROM ",
                    TRANSACTIONS,
                    " WHERE game_id = $1 ORDER BY created_at"
                ),
                &[&game.inner()],
            )
            .await
            .map_err(StoreError::from)?
            .iter()
            .map(tx_from)
            .collect()
    }

    async fn commit(&self, unit: UnitOfWork) -> Result<(), StoreError> {
        let mut writer = self.writer.lock().await;
        let tx = writer.transaction().await.map_err(StoreError::from)?;
        for user in unit.users() {
            let updated = tx
                .execute(
                    const_format::concatcp!(
                        "UPDATE ",
                        USERS,
                        " SET chips = $3, elo = $4, highest_elo = $5, games_played = $6, \
                         games_won = $7, last_login_at = $8, active = $9, version = version + 1 \
                         WHERE id = $1 AND version = $2"
                    ),
                    &[
                        &user.id().inner(),
                        &user.version(),
                        &user.chips(),
                        &user.elo(),
                        &user.highest_elo(),
                        &user.games_played(),
                        &user.games_won(),
                        &user.last_login_at(),
                        &user.active(),
                    ],
                )
                .await
                .map_err(StoreError::from)?;
            if updated == 0 {
                // dropping tx rolls the whole unit back
                return Err(StoreError::VersionMismatch(user.username().to_string()));
            }
        }
        for history in unit.histories() {
            tx.execute(
                const_format::concatcp!(
                    "INSERT INTO ",
                    HISTORIES,
                    " (id, room_id, started_at, ended_at, status, winner_id, win_kind, \
                     win_score, table_stake, rake, player_results, seed_hash, revealed_seed, \
                     client_seed) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
                     ON CONFLICT (id) DO UPDATE SET \
                     ended_at = EXCLUDED.ended_at, status = EXCLUDED.status, \
                     winner_id = EXCLUDED.winner_id, win_kind = EXCLUDED.win_kind, \
                     win_score = EXCLUDED.win_score, rake = EXCLUDED.rake, \
                     player_results = EXCLUDED.player_results, \
                     revealed_seed = EXCLUDED.revealed_seed"
                ),
                &[
                    &history.id().inner(),
                    &history.room_id(),
                    &history.started_at(),
                    &history.ended_at(),
                    &history.status().to_string(),
                    &history.winner_id().map(|w| w.inner()),
                    &history.win_kind().map(|k| k.to_string()),
                    &history.win_score(),
                    &history.table_stake(),
                    &history.rake(),
                    &serde_json::to_value(history.player_results()).expect("results to json"),
                    &history.seed_hash(),
                    &history.revealed_seed(),
                    &history.client_seed(),
                ],
            )
            .await
            .map_err(StoreError::from)?;
        }
        for chip in unit.transactions() {
            tx.execute(
                const_format::concatcp!(
                    "INSERT INTO ",
                    TRANSACTIONS,
                    " (id, user_id, game_id, kind, amount, balance_before, balance_after, \
                     description, created_at, reference, idempotency_key) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
                ),
                &[
                    &chip.id().inner(),
                    &chip.user_id().inner(),
                    &chip.game_id().map(|g| g.inner()),
                    &chip.kind().to_string(),
                    &chip.amount(),
                    &chip.balance_before(),
                    &chip.balance_after(),
                    &chip.description(),
                    &chip.created_at(),
                    &chip.reference(),
                    &chip.idempotency_key(),
                ],
            )
            .await
            .map_err(StoreError::from)?;
        }
        tx.commit().await.map_err(StoreError::from)
    }
}
