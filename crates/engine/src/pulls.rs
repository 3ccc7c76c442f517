//! Pulls: cards a user obtained from a pack or a battle.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Card, EngineError, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullStatus {
    Kept,
    Sold,
}

impl PullStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kept => "kept",
            Self::Sold => "sold",
        }
    }
}

impl TryFrom<&str> for PullStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "kept" => Ok(Self::Kept),
            "sold" => Ok(Self::Sold),
            other => Err(EngineError::InvalidInput(format!(
                "invalid pull status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pull {
    pub id: Uuid,
    /// Current owner. Battle pulls move to the winner.
    pub user_id: String,
    /// Who actually drew the card.
    pub pulled_by: String,
    pub card_id: Uuid,
    pub box_id: Uuid,
    pub battle_id: Option<Uuid>,
    pub round: Option<i32>,
    pub status: PullStatus,
    pub created_at: DateTime<Utc>,
}

impl Pull {
    pub fn new(user_id: &str, card: &Card, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            pulled_by: user_id.to_string(),
            card_id: card.id,
            box_id: card.box_id,
            battle_id: None,
            round: None,
            status: PullStatus::Kept,
            created_at,
        }
    }

    pub fn in_battle(mut self, battle_id: Uuid, round: i32) -> Self {
        self.battle_id = Some(battle_id);
        self.round = Some(round);
        self
    }
}

/// A pull together with the card it refers to.
#[derive(Clone, Debug, PartialEq)]
pub struct PulledCard {
    pub pull: Pull,
    pub card: Card,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "pulls")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub pulled_by: String,
    pub card_id: String,
    pub box_id: String,
    pub battle_id: Option<String>,
    pub round: Option<i32>,
    pub status: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cards::Entity",
        from = "Column::CardId",
        to = "super::cards::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Cards,
}

impl Related<super::cards::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cards.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Pull> for ActiveModel {
    fn from(value: &Pull) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            user_id: ActiveValue::Set(value.user_id.clone()),
            pulled_by: ActiveValue::Set(value.pulled_by.clone()),
            card_id: ActiveValue::Set(value.card_id.to_string()),
            box_id: ActiveValue::Set(value.box_id.to_string()),
            battle_id: ActiveValue::Set(value.battle_id.map(|id| id.to_string())),
            round: ActiveValue::Set(value.round),
            status: ActiveValue::Set(value.status.as_str().to_string()),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for Pull {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "pull")?,
            user_id: model.user_id,
            pulled_by: model.pulled_by,
            card_id: parse_uuid(&model.card_id, "card")?,
            box_id: parse_uuid(&model.box_id, "box")?,
            battle_id: model
                .battle_id
                .as_deref()
                .map(|id| parse_uuid(id, "battle"))
                .transpose()?,
            round: model.round,
            status: PullStatus::try_from(model.status.as_str())?,
            created_at: model.created_at,
        })
    }
}

/// Convert a `(pull, card)` join row.
pub(crate) fn pulled_card(
    (pull, card): (Model, Option<super::cards::Model>),
) -> ResultEngine<PulledCard> {
    let card = card.ok_or_else(|| EngineError::KeyNotFound("card not exists".to_string()))?;
    Ok(PulledCard {
        pull: Pull::try_from(pull)?,
        card: Card::try_from(card)?,
    })
}
