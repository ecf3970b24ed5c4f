use crate::GameHistory;
use crate::Schema;
use crate::StoreError;
use crate::TRANSACTIONS;
use crate::User;
use chrono::DateTime;
use chrono::Utc;
use okey_core::Chips;
use okey_core::ID;
use okey_core::Unique;

/// Why chips moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TransactionKind {
    GameStake,
    GameWin,
    GameLoss,
    DailyBonus,
    LevelUpBonus,
    ReferralBonus,
    Purchase,
    GiftSent,
    GiftReceived,
    AdminAdjustment,
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            Self::GameStake => "GameStake",
            Self::GameWin => "GameWin",
            Self::GameLoss => "GameLoss",
            Self::DailyBonus => "DailyBonus",
            Self::LevelUpBonus => "LevelUpBonus",
            Self::ReferralBonus => "ReferralBonus",
            Self::Purchase => "Purchase",
            Self::GiftSent => "GiftSent",
            Self::GiftReceived => "GiftReceived",
            Self::AdminAdjustment => "AdminAdjustment",
        };
        write!(f, "{}", s)
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "GameStake" => Ok(Self::GameStake),
            "GameWin" => Ok(Self::GameWin),
            "GameLoss" => Ok(Self::GameLoss),
            "DailyBonus" => Ok(Self::DailyBonus),
            "LevelUpBonus" => Ok(Self::LevelUpBonus),
            "ReferralBonus" => Ok(Self::ReferralBonus),
            "Purchase" => Ok(Self::Purchase),
            "GiftSent" => Ok(Self::GiftSent),
            "GiftReceived" => Ok(Self::GiftReceived),
            "AdminAdjustment" => Ok(Self::AdminAdjustment),
            _ => Err(format!("invalid transaction kind: {}", s)),
        }
    }
}

/// One immutable entry in the chip audit trail.
///
/// Created exclusively by the settlement pipeline and never mutated.
/// The running balance is checked at construction: after = before + amount.
#[derive(Debug, Clone, PartialEq)]
pub struct ChipTransaction {
    id: ID<Self>,
    user_id: ID<User>,
    game_id: Option<ID<GameHistory>>,
    kind: TransactionKind,
    amount: Chips,
    balance_before: Chips,
    balance_after: Chips,
    description: String,
    created_at: DateTime<Utc>,
    reference: String,
    idempotency_key: Option<String>,
}

impl ChipTransaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: ID<User>,
        game_id: Option<ID<GameHistory>>,
        kind: TransactionKind,
        amount: Chips,
        balance_before: Chips,
        description: &str,
        idempotency_key: Option<String>,
    ) -> Result<Self, StoreError> {
        let balance_after = balance_before + amount;
        if balance_after < 0 {
            return Err(StoreError::Invariant(format!(
                "transaction would leave balance {} for user {}",
                balance_after, user_id
            )));
        }
        let id = ID::default();
        Ok(Self {
            id,
            user_id,
            game_id,
            kind,
            amount,
            balance_before,
            balance_after,
            description: description.to_string(),
            created_at: Utc::now(),
            reference: format!("ct-{}", id.inner().simple()),
            idempotency_key,
        })
    }
    pub fn user_id(&self) -> ID<User> {
        self.user_id
    }
    pub fn game_id(&self) -> Option<ID<GameHistory>> {
        self.game_id
    }
    pub fn kind(&self) -> TransactionKind {
        self.kind
    }
    pub fn amount(&self) -> Chips {
        self.amount
    }
    pub fn balance_before(&self) -> Chips {
        self.balance_before
    }
    pub fn balance_after(&self) -> Chips {
        self.balance_after
    }
    pub fn description(&self) -> &str {
        &self.description
    }
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    pub fn reference(&self) -> &str {
        &self.reference
    }
    pub fn idempotency_key(&self) -> Option<&str> {
        self.idempotency_key.as_deref()
    }
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn hydrate(
        id: ID<Self>,
        user_id: ID<User>,
        game_id: Option<ID<GameHistory>>,
        kind: TransactionKind,
        amount: Chips,
        balance_before: Chips,
        balance_after: Chips,
        description: String,
        created_at: DateTime<Utc>,
        reference: String,
        idempotency_key: Option<String>,
    ) -> Self {
        Self {
            id,
            user_id,
            game_id,
            kind,
            amount,
            balance_before,
            balance_after,
            description,
            created_at,
            reference,
            idempotency_key,
        }
    }
}

impl Unique for ChipTransaction {
    fn id(&self) -> ID<Self> {
        self.id
    }
}

impl Schema for ChipTransaction {
    fn name() -> &'static str {
        TRANSACTIONS
    }
    fn columns() -> &'static [tokio_postgres::types::Type] {
        &[
            tokio_postgres::types::Type::UUID,
            tokio_postgres::types::Type::UUID,
            tokio_postgres::types::Type::UUID,
            tokio_postgres::types::Type::TEXT,
            tokio_postgres::types::Type::INT8,
            tokio_postgres::types::Type::INT8,
            tokio_postgres::types::Type::INT8,
            tokio_postgres::types::Type::TEXT,
            tokio_postgres::types::Type::TIMESTAMPTZ,
            tokio_postgres::types::Type::TEXT,
            tokio_postgres::types::Type::TEXT,
        ]
    }
    fn creates() -> &'static str {
        const_format::concatcp!(
            "CREATE TABLE IF NOT EXISTS ",
            TRANSACTIONS,
            " (
                id               UUID PRIMARY KEY,
                user_id          UUID NOT NULL,
                game_id          UUID,
                kind             TEXT NOT NULL,
                amount           BIGINT NOT NULL,
                balance_before   BIGINT NOT NULL,
                balance_after    BIGINT NOT NULL CHECK (balance_after = balance_before + amount),
                description      TEXT NOT NULL,
                created_at       TIMESTAMPTZ NOT NULL,
                reference        TEXT NOT NULL,
                idempotency_key  TEXT
            );"
        )
    }
    fn indices() -> &'static str {
        const_format::concatcp!(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_tx_reference ON ",
            TRANSACTIONS,
            " (reference);
             CREATE UNIQUE INDEX IF NOT EXISTS idx_tx_idem ON ",
            TRANSACTIONS,
            " (idempotency_key) WHERE idempotency_key IS NOT NULL;
             CREATE INDEX IF NOT EXISTS idx_tx_user_created ON ",
            TRANSACTIONS,
            " (user_id, created_at DESC);
             CREATE INDEX IF NOT EXISTS idx_tx_game ON ",
            TRANSACTIONS,
            " (game_id);"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_balance_enforced() {
        let user = ID::default();
        let tx = ChipTransaction::new(user, None, TransactionKind::GameWin, 280, 900, "win", None)
            .expect("valid transaction");
        assert_eq!(tx.balance_after(), 1_180);
        assert!(
            ChipTransaction::new(user, None, TransactionKind::GameStake, -200, 100, "stake", None)
                .is_err()
        );
    }

    #[test]
    fn references_are_unique() {
        let user = ID::default();
        let a = ChipTransaction::new(user, None, TransactionKind::DailyBonus, 10, 0, "a", None)
            .unwrap();
        let b = ChipTransaction::new(user, None, TransactionKind::DailyBonus, 10, 0, "b", None)
            .unwrap();
        assert_ne!(a.reference(), b.reference());
    }

    #[test]
    fn kind_str_round_trip() {
        for kind in [
            TransactionKind::GameStake,
            TransactionKind::GameWin,
            TransactionKind::GameLoss,
            TransactionKind::AdminAdjustment,
        ] {
            assert_eq!(TransactionKind::try_from(kind.to_string().as_str()), Ok(kind));
        }
    }
}
