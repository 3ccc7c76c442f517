//! Cards belonging to a box's pool.

use sea_orm::entity::{ActiveValue, prelude::*};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, draw::Weighted, util::parse_uuid};

/// Upper bound on a single card's coin value.
pub const MAX_CARD_VALUE: i64 = 1_000_000_000_000;

/// Input for a new card.
#[derive(Clone, Debug, PartialEq)]
pub struct CardNew {
    pub name: String,
    pub rarity: String,
    pub coin_value: i64,
    pub pull_rate: f64,
    pub image_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Card {
    pub id: Uuid,
    pub box_id: Uuid,
    pub name: String,
    pub rarity: String,
    /// What the card is worth in coins when sold or scored in a battle.
    pub coin_value: i64,
    /// Relative draw weight inside the box.
    pub pull_rate: f64,
    pub image_url: Option<String>,
}

impl Card {
    pub fn new(box_id: Uuid, input: CardNew) -> ResultEngine<Self> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(EngineError::InvalidInput(
                "card name must not be empty".to_string(),
            ));
        }
        if !(0..=MAX_CARD_VALUE).contains(&input.coin_value) {
            return Err(EngineError::InvalidInput(format!(
                "card '{name}': coin_value must be between 0 and {MAX_CARD_VALUE}"
            )));
        }
        if !input.pull_rate.is_finite() || input.pull_rate <= 0.0 {
            return Err(EngineError::InvalidInput(format!(
                "card '{name}': pull_rate must be a positive number"
            )));
        }
        let rarity = input.rarity.trim();
        Ok(Self {
            id: Uuid::new_v4(),
            box_id,
            name: name.to_string(),
            rarity: if rarity.is_empty() {
                "common".to_string()
            } else {
                rarity.to_lowercase()
            },
            coin_value: input.coin_value,
            pull_rate: input.pull_rate,
            image_url: input
                .image_url
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        })
    }
}

impl Weighted for Card {
    fn weight(&self) -> f64 {
        self.pull_rate
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "cards")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub box_id: String,
    pub name: String,
    pub rarity: String,
    pub coin_value: i64,
    #[sea_orm(column_type = "Double")]
    pub pull_rate: f64,
    pub image_url: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::boxes::Entity",
        from = "Column::BoxId",
        to = "super::boxes::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Boxes,
}

impl Related<super::boxes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Boxes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Card> for ActiveModel {
    fn from(value: &Card) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            box_id: ActiveValue::Set(value.box_id.to_string()),
            name: ActiveValue::Set(value.name.clone()),
            rarity: ActiveValue::Set(value.rarity.clone()),
            coin_value: ActiveValue::Set(value.coin_value),
            pull_rate: ActiveValue::Set(value.pull_rate),
            image_url: ActiveValue::Set(value.image_url.clone()),
        }
    }
}

impl TryFrom<Model> for Card {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "card")?,
            box_id: parse_uuid(&model.box_id, "box")?,
            name: model.name,
            rarity: model.rarity,
            coin_value: model.coin_value,
            pull_rate: model.pull_rate,
            image_url: model.image_url,
        })
    }
}
