use crate::Schema;
use crate::StoreError;
use crate::USERS;
use chrono::DateTime;
use chrono::Utc;
use okey_core::Chips;
use okey_core::ELO_FLOOR;
use okey_core::Elo;
use okey_core::ID;
use okey_core::Unique;

/// A persistent player account.
///
/// Balance and rating are only ever mutated through the settlement
/// pipeline; the version token backs optimistic concurrency on update.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    id: ID<Self>,
    username: String,
    display_name: String,
    chips: Chips,
    elo: Elo,
    highest_elo: Elo,
    games_played: i32,
    games_won: i32,
    created_at: DateTime<Utc>,
    last_login_at: Option<DateTime<Utc>>,
    active: bool,
    version: i64,
}

impl User {
    /// Creates a fresh account. Usernames are stored lowercased.
    pub fn new(username: &str, display_name: &str, chips: Chips) -> Self {
        Self {
            id: ID::default(),
            username: username.trim().to_lowercase(),
            display_name: display_name.trim().to_string(),
            chips,
            elo: 1_000,
            highest_elo: 1_000,
            games_played: 0,
            games_won: 0,
            created_at: Utc::now(),
            last_login_at: None,
            active: true,
            version: 0,
        }
    }
    pub fn username(&self) -> &str {
        &self.username
    }
    pub fn display_name(&self) -> &str {
        &self.display_name
    }
    pub fn chips(&self) -> Chips {
        self.chips
    }
    pub fn elo(&self) -> Elo {
        self.elo
    }
    pub fn highest_elo(&self) -> Elo {
        self.highest_elo
    }
    pub fn games_played(&self) -> i32 {
        self.games_played
    }
    pub fn games_won(&self) -> i32 {
        self.games_won
    }
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    pub fn last_login_at(&self) -> Option<DateTime<Utc>> {
        self.last_login_at
    }
    pub fn active(&self) -> bool {
        self.active
    }
    pub fn version(&self) -> i64 {
        self.version
    }
    /// Fraction of games won, 0.0 for a fresh account.
    pub fn win_rate(&self) -> f64 {
        if self.games_played == 0 {
            0.0
        } else {
            f64::from(self.games_won) / f64::from(self.games_played)
        }
    }
}

impl User {
    /// Adds chips; the amount must be non-negative.
    pub fn credit(&mut self, amount: Chips) -> Result<(), StoreError> {
        if amount < 0 {
            return Err(StoreError::Invariant(format!(
                "credit of negative amount {} for {}",
                amount, self.username
            )));
        }
        self.chips += amount;
        Ok(())
    }
    /// Removes chips; fails rather than letting the balance go negative.
    pub fn debit(&mut self, amount: Chips) -> Result<(), StoreError> {
        if amount < 0 || self.chips < amount {
            return Err(StoreError::Invariant(format!(
                "debit of {} from balance {} for {}",
                amount, self.chips, self.username
            )));
        }
        self.chips -= amount;
        Ok(())
    }
    /// Applies a rating delta, holding the floor and tracking the peak.
    pub fn apply_elo(&mut self, delta: Elo) {
        self.elo = (self.elo + delta).max(ELO_FLOOR);
        self.highest_elo = self.highest_elo.max(self.elo);
    }
    /// Records a finished game in the win/loss counters.
    pub fn record_game(&mut self, won: bool) {
        self.games_played += 1;
        if won {
            self.games_won += 1;
        }
    }
    pub fn touch_login(&mut self) {
        self.last_login_at = Some(Utc::now());
    }
    pub(crate) fn bump_version(&mut self) {
        self.version += 1;
    }
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn hydrate(
        id: ID<Self>,
        username: String,
        display_name: String,
        chips: Chips,
        elo: Elo,
        highest_elo: Elo,
        games_played: i32,
        games_won: i32,
        created_at: DateTime<Utc>,
        last_login_at: Option<DateTime<Utc>>,
        active: bool,
        version: i64,
    ) -> Self {
        Self {
            id,
            username,
            display_name,
            chips,
            elo,
            highest_elo,
            games_played,
            games_won,
            created_at,
            last_login_at,
            active,
            version,
        }
    }
}

impl Unique for User {
    fn id(&self) -> ID<Self> {
        self.id
    }
}

impl Schema for User {
    fn name() -> &'static str {
        USERS
    }
    fn columns() -> &'static [tokio_postgres::types::Type] {
        &[
            tokio_postgres::types::Type::UUID,
            tokio_postgres::types::Type::VARCHAR,
            tokio_postgres::types::Type::VARCHAR,
            tokio_postgres::types::Type::INT8,
            tokio_postgres::types::Type::INT4,
            tokio_postgres::types::Type::INT4,
            tokio_postgres::types::Type::INT4,
            tokio_postgres::types::Type::INT4,
            tokio_postgres::types::Type::TIMESTAMPTZ,
            tokio_postgres::types::Type::TIMESTAMPTZ,
            tokio_postgres::types::Type::BOOL,
            tokio_postgres::types::Type::INT8,
        ]
    }
    fn creates() -> &'static str {
        const_format::concatcp!(
            "CREATE TABLE IF NOT EXISTS ",
            USERS,
            " (
                id              UUID PRIMARY KEY,
                username        VARCHAR(32) UNIQUE NOT NULL,
                display_name    VARCHAR(64) NOT NULL,
                chips           BIGINT NOT NULL CHECK (chips >= 0),
                elo             INTEGER NOT NULL CHECK (elo >= 100),
                highest_elo     INTEGER NOT NULL,
                games_played    INTEGER NOT NULL,
                games_won       INTEGER NOT NULL,
                created_at      TIMESTAMPTZ NOT NULL,
                last_login_at   TIMESTAMPTZ,
                active          BOOLEAN NOT NULL,
                version         BIGINT NOT NULL
            );"
        )
    }
    fn indices() -> &'static str {
        const_format::concatcp!(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_username ON ",
            USERS,
            " (LOWER(username));
             CREATE INDEX IF NOT EXISTS idx_users_active_elo ON ",
            USERS,
            " (active, elo DESC);"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_is_lowercased() {
        let user = User::new("  AliVeli ", "Ali Veli", 1_000);
        assert_eq!(user.username(), "aliveli");
        assert_eq!(user.display_name(), "Ali Veli");
    }

    #[test]
    fn balance_never_goes_negative() {
        let mut user = User::new("ayse", "Ayşe", 100);
        assert!(user.debit(150).is_err());
        assert_eq!(user.chips(), 100);
        assert!(user.debit(100).is_ok());
        assert_eq!(user.chips(), 0);
    }

    #[test]
    fn elo_floor_holds() {
        let mut user = User::new("mehmet", "Mehmet", 0);
        user.apply_elo(-2_000);
        assert_eq!(user.elo(), ELO_FLOOR);
        assert_eq!(user.highest_elo(), 1_000);
    }

    #[test]
    fn peak_elo_tracks_upward_only() {
        let mut user = User::new("fatma", "Fatma", 0);
        user.apply_elo(50);
        assert_eq!(user.highest_elo(), 1_050);
        user.apply_elo(-100);
        assert_eq!(user.highest_elo(), 1_050);
    }

    #[test]
    fn win_rate() {
        let mut user = User::new("can", "Can", 0);
        assert_eq!(user.win_rate(), 0.0);
        user.record_game(true);
        user.record_game(false);
        user.record_game(false);
        user.record_game(true);
        assert_eq!(user.win_rate(), 0.5);
    }
}
