use crate::HISTORIES;
use crate::Schema;
use crate::User;
use chrono::DateTime;
use chrono::Utc;
use okey_core::Chips;
use okey_core::Elo;
use okey_core::ID;
use okey_core::Score;
use okey_core::Seat;
use okey_core::Unique;
use okey_rules::WinKind;

/// Lifecycle status of a recorded game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum GameStatus {
    InProgress,
    Completed,
    Cancelled,
    Timeout,
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            Self::InProgress => "InProgress",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
            Self::Timeout => "Timeout",
        };
        write!(f, "{}", s)
    }
}

impl TryFrom<&str> for GameStatus {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "InProgress" => Ok(Self::InProgress),
            "Completed" => Ok(Self::Completed),
            "Cancelled" => Ok(Self::Cancelled),
            "Timeout" => Ok(Self::Timeout),
            _ => Err(format!("invalid game status: {}", s)),
        }
    }
}

/// One seat's outcome, embedded as JSON inside the history row.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PlayerResult {
    pub user_id: Option<ID<User>>,
    pub seat: Seat,
    pub display_name: String,
    pub is_bot: bool,
    pub won: bool,
    pub chips_delta: Chips,
    pub elo_change: Elo,
}

/// Completed-game summary record.
///
/// Created when a game starts (InProgress) and finalized exactly once when
/// the room reaches a terminal phase. The revealed seed stays NULL until
/// then; publishing it earlier would break the commitment.
#[derive(Debug, Clone, PartialEq)]
pub struct GameHistory {
    id: ID<Self>,
    room_id: uuid::Uuid,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    status: GameStatus,
    winner_id: Option<ID<User>>,
    win_kind: Option<WinKind>,
    win_score: Option<Score>,
    table_stake: Chips,
    rake: Chips,
    player_results: Vec<PlayerResult>,
    seed_hash: String,
    revealed_seed: Option<String>,
    client_seed: Option<String>,
}

impl GameHistory {
    pub fn started(room_id: uuid::Uuid, table_stake: Chips, seed_hash: &str, client_seed: Option<String>) -> Self {
        Self {
            id: ID::default(),
            room_id,
            started_at: Utc::now(),
            ended_at: None,
            status: GameStatus::InProgress,
            winner_id: None,
            win_kind: None,
            win_score: None,
            table_stake,
            rake: 0,
            player_results: Vec::new(),
            seed_hash: seed_hash.to_string(),
            revealed_seed: None,
            client_seed,
        }
    }
    pub fn room_id(&self) -> uuid::Uuid {
        self.room_id
    }
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }
    pub fn status(&self) -> GameStatus {
        self.status
    }
    pub fn winner_id(&self) -> Option<ID<User>> {
        self.winner_id
    }
    pub fn win_kind(&self) -> Option<WinKind> {
        self.win_kind
    }
    pub fn win_score(&self) -> Option<Score> {
        self.win_score
    }
    pub fn table_stake(&self) -> Chips {
        self.table_stake
    }
    pub fn rake(&self) -> Chips {
        self.rake
    }
    pub fn player_results(&self) -> &[PlayerResult] {
        &self.player_results
    }
    pub fn seed_hash(&self) -> &str {
        &self.seed_hash
    }
    pub fn revealed_seed(&self) -> Option<&str> {
        self.revealed_seed.as_deref()
    }
    pub fn client_seed(&self) -> Option<&str> {
        self.client_seed.as_deref()
    }
}

impl GameHistory {
    /// Finalizes a won game. The winner id is absent when a bot won.
    pub fn complete(
        &mut self,
        winner: Option<ID<User>>,
        kind: WinKind,
        score: Score,
        rake: Chips,
        results: Vec<PlayerResult>,
        revealed_seed: &str,
    ) {
        self.status = GameStatus::Completed;
        self.ended_at = Some(Utc::now());
        self.winner_id = winner;
        self.win_kind = Some(kind);
        self.win_score = Some(score);
        self.rake = rake;
        self.player_results = results;
        self.revealed_seed = Some(revealed_seed.to_string());
    }
    /// Finalizes a cancelled or timed-out game.
    pub fn cancel(&mut self, status: GameStatus, results: Vec<PlayerResult>, revealed_seed: &str) {
        self.status = status;
        self.ended_at = Some(Utc::now());
        self.player_results = results;
        self.revealed_seed = Some(revealed_seed.to_string());
    }
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn hydrate(
        id: ID<Self>,
        room_id: uuid::Uuid,
        started_at: DateTime<Utc>,
        ended_at: Option<DateTime<Utc>>,
        status: GameStatus,
        winner_id: Option<ID<User>>,
        win_kind: Option<WinKind>,
        win_score: Option<Score>,
        table_stake: Chips,
        rake: Chips,
        player_results: Vec<PlayerResult>,
        seed_hash: String,
        revealed_seed: Option<String>,
        client_seed: Option<String>,
    ) -> Self {
        Self {
            id,
            room_id,
            started_at,
            ended_at,
            status,
            winner_id,
            win_kind,
            win_score,
            table_stake,
            rake,
            player_results,
            seed_hash,
            revealed_seed,
            client_seed,
        }
    }
}

impl Unique for GameHistory {
    fn id(&self) -> ID<Self> {
        self.id
    }
}

impl Schema for GameHistory {
    fn name() -> &'static str {
        HISTORIES
    }
    fn columns() -> &'static [tokio_postgres::types::Type] {
        &[
            tokio_postgres::types::Type::UUID,
            tokio_postgres::types::Type::UUID,
            tokio_postgres::types::Type::TIMESTAMPTZ,
            tokio_postgres::types::Type::TIMESTAMPTZ,
            tokio_postgres::types::Type::TEXT,
            tokio_postgres::types::Type::UUID,
            tokio_postgres::types::Type::TEXT,
            tokio_postgres::types::Type::INT4,
            tokio_postgres::types::Type::INT8,
            tokio_postgres::types::Type::INT8,
            tokio_postgres::types::Type::JSONB,
            tokio_postgres::types::Type::TEXT,
            tokio_postgres::types::Type::TEXT,
            tokio_postgres::types::Type::TEXT,
        ]
    }
    fn creates() -> &'static str {
        const_format::concatcp!(
            "CREATE TABLE IF NOT EXISTS ",
            HISTORIES,
            " (
                id              UUID PRIMARY KEY,
                room_id         UUID NOT NULL,
                started_at      TIMESTAMPTZ NOT NULL,
                ended_at        TIMESTAMPTZ,
                status          TEXT NOT NULL,
                winner_id       UUID,
                win_kind        TEXT,
                win_score       INTEGER,
                table_stake     BIGINT NOT NULL,
                rake            BIGINT NOT NULL,
                player_results  JSONB NOT NULL,
                seed_hash       TEXT NOT NULL,
                revealed_seed   TEXT,
                client_seed     TEXT
            );"
        )
    }
    fn indices() -> &'static str {
        const_format::concatcp!(
            "CREATE INDEX IF NOT EXISTS idx_histories_room ON ",
            HISTORIES,
            " (room_id);
             CREATE INDEX IF NOT EXISTS idx_histories_started ON ",
            HISTORIES,
            " (started_at);
             CREATE INDEX IF NOT EXISTS idx_histories_winner ON ",
            HISTORIES,
            " (winner_id);"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_reveals_the_seed() {
        let mut history = GameHistory::started(uuid::Uuid::now_v7(), 100, "deadbeef", None);
        assert_eq!(history.status(), GameStatus::InProgress);
        assert!(history.revealed_seed().is_none());
        history.complete(Some(ID::default()), WinKind::Normal, 2, 20, Vec::new(), "cafe");
        assert_eq!(history.status(), GameStatus::Completed);
        assert_eq!(history.revealed_seed(), Some("cafe"));
        assert!(history.ended_at().is_some());
    }

    #[test]
    fn results_embed_as_json() {
        let mut history = GameHistory::started(uuid::Uuid::now_v7(), 100, "hash", None);
        history.cancel(
            GameStatus::Cancelled,
            vec![PlayerResult {
                user_id: None,
                seat: Seat::South,
                display_name: "Bot".to_string(),
                is_bot: true,
                won: false,
                chips_delta: 0,
                elo_change: 0,
            }],
            "seed",
        );
        let json = serde_json::to_string(history.player_results()).expect("results serialize");
        assert!(json.contains("\"South\""));
        assert!(json.contains("\"is_bot\":true"));
    }
}
