//! Append-only coin ledger.
//!
//! Each change of `users.coins` writes exactly one row here, in the same
//! database transaction, with the resulting balance.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoinTransactionKind {
    Grant,
    PackPurchase,
    BattleEntry,
    BattleRefund,
    Sale,
    Achievement,
}

impl CoinTransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Grant => "grant",
            Self::PackPurchase => "pack_purchase",
            Self::BattleEntry => "battle_entry",
            Self::BattleRefund => "battle_refund",
            Self::Sale => "sale",
            Self::Achievement => "achievement",
        }
    }
}

impl TryFrom<&str> for CoinTransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "grant" => Ok(Self::Grant),
            "pack_purchase" => Ok(Self::PackPurchase),
            "battle_entry" => Ok(Self::BattleEntry),
            "battle_refund" => Ok(Self::BattleRefund),
            "sale" => Ok(Self::Sale),
            "achievement" => Ok(Self::Achievement),
            other => Err(EngineError::InvalidInput(format!(
                "invalid coin transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoinTransaction {
    pub id: Uuid,
    pub user_id: String,
    pub kind: CoinTransactionKind,
    /// Signed: debits are negative.
    pub amount: i64,
    pub balance_after: i64,
    /// Free-form pointer to what caused the movement (box, battle, pull, ...).
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "coin_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub amount: i64,
    pub balance_after: i64,
    pub reference: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&CoinTransaction> for ActiveModel {
    fn from(value: &CoinTransaction) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            user_id: ActiveValue::Set(value.user_id.clone()),
            kind: ActiveValue::Set(value.kind.as_str().to_string()),
            amount: ActiveValue::Set(value.amount),
            balance_after: ActiveValue::Set(value.balance_after),
            reference: ActiveValue::Set(value.reference.clone()),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for CoinTransaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "coin transaction")?,
            user_id: model.user_id,
            kind: CoinTransactionKind::try_from(model.kind.as_str())?,
            amount: model.amount,
            balance_after: model.balance_after,
            reference: model.reference,
            created_at: model.created_at,
        })
    }
}
