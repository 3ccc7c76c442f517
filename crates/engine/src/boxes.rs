//! The module contains `PackBox`, a purchasable pack definition.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, util::parse_uuid};

/// Upper bound for the number of cards in a single pack.
pub const MAX_CARDS_PER_PACK: i32 = 20;

/// A box of packs.
///
/// Buying one pack costs `price` coins and yields `cards_per_pack` cards drawn
/// from the box's card pool.
#[derive(Clone, Debug, PartialEq)]
pub struct PackBox {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub cards_per_pack: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl PackBox {
    pub fn new(
        name: String,
        description: Option<String>,
        price: i64,
        cards_per_pack: i32,
    ) -> ResultEngine<Self> {
        if price <= 0 {
            return Err(EngineError::InvalidInput(
                "box price must be > 0".to_string(),
            ));
        }
        if !(1..=MAX_CARDS_PER_PACK).contains(&cards_per_pack) {
            return Err(EngineError::InvalidInput(format!(
                "cards_per_pack must be between 1 and {MAX_CARDS_PER_PACK}"
            )));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            description,
            price,
            cards_per_pack,
            active: true,
            created_at: Utc::now(),
        })
    }

    /// Coins needed to open `quantity` packs.
    pub fn cost_of(&self, quantity: u32) -> ResultEngine<i64> {
        self.price
            .checked_mul(i64::from(quantity))
            .ok_or_else(|| EngineError::InvalidInput("pack cost overflows".to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "boxes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub name_norm: String,
    pub description: Option<String>,
    pub price: i64,
    pub cards_per_pack: i32,
    pub active: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::cards::Entity")]
    Cards,
}

impl Related<super::cards::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cards.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&PackBox> for ActiveModel {
    fn from(value: &PackBox) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            name: ActiveValue::Set(value.name.clone()),
            name_norm: ActiveValue::NotSet,
            description: ActiveValue::Set(value.description.clone()),
            price: ActiveValue::Set(value.price),
            cards_per_pack: ActiveValue::Set(value.cards_per_pack),
            active: ActiveValue::Set(value.active),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for PackBox {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "box")?,
            name: model.name,
            description: model.description,
            price: model.price,
            cards_per_pack: model.cards_per_pack,
            active: model.active,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_price() {
        let err = PackBox::new("Base Set".to_string(), None, 0, 5).unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidInput("box price must be > 0".to_string())
        );
    }

    #[test]
    fn rejects_cards_per_pack_out_of_range() {
        assert!(PackBox::new("Base Set".to_string(), None, 100, 0).is_err());
        assert!(PackBox::new("Base Set".to_string(), None, 100, MAX_CARDS_PER_PACK + 1).is_err());
    }

    #[test]
    fn cost_of_multiplies_and_checks_overflow() {
        let pack = PackBox::new("Base Set".to_string(), None, 250, 5).unwrap();
        assert_eq!(pack.cost_of(4).unwrap(), 1000);

        let expensive = PackBox::new("Vault".to_string(), None, i64::MAX, 1).unwrap();
        assert!(expensive.cost_of(2).is_err());
    }
}
