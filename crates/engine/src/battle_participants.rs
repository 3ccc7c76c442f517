//! Seats taken in a battle.

use sea_orm::entity::prelude::*;

use crate::battles::Participant;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "battle_participants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub battle_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    pub seat: i32,
    pub total_value: i64,
    pub joined_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::battles::Entity",
        from = "Column::BattleId",
        to = "super::battles::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Battle,
}

impl Related<super::battles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Battle.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Participant {
    fn from(model: Model) -> Self {
        Self {
            user_id: model.user_id,
            seat: model.seat,
            total_value: model.total_value,
            joined_at: model.joined_at,
        }
    }
}
