use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{
    Battle, Card, EngineError, PackBox, ResultEngine, battle_participants, battles, boxes, cards,
    users,
};

use super::Engine;

impl Engine {
    pub(super) async fn require_user(
        &self,
        db: &DatabaseTransaction,
        username: &str,
    ) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(username.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))
    }

    pub(super) async fn require_admin(
        &self,
        db: &DatabaseTransaction,
        username: &str,
    ) -> ResultEngine<users::Model> {
        let user = self.require_user(db, username).await?;
        if !user.is_admin {
            return Err(EngineError::Forbidden(format!(
                "{username} is not an administrator"
            )));
        }
        Ok(user)
    }

    pub(super) async fn require_box(
        &self,
        db: &DatabaseTransaction,
        box_id: Uuid,
    ) -> ResultEngine<PackBox> {
        let model = boxes::Entity::find_by_id(box_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("box not exists".to_string()))?;
        PackBox::try_from(model)
    }

    /// A box that can be bought right now, with its card pool.
    pub(super) async fn require_open_box(
        &self,
        db: &DatabaseTransaction,
        box_id: Uuid,
    ) -> ResultEngine<(PackBox, Vec<Card>)> {
        let pack_box = self.require_box(db, box_id).await?;
        if !pack_box.active {
            return Err(EngineError::InvalidState(format!(
                "box '{}' is not on sale",
                pack_box.name
            )));
        }
        let cards = self.box_cards(db, box_id).await?;
        if cards.is_empty() {
            return Err(EngineError::EmptyPool(format!(
                "box '{}' has no cards",
                pack_box.name
            )));
        }
        Ok((pack_box, cards))
    }

    /// Cards of a box, in a stable order so seeded draws are reproducible.
    pub(super) async fn box_cards(
        &self,
        db: &DatabaseTransaction,
        box_id: Uuid,
    ) -> ResultEngine<Vec<Card>> {
        cards::Entity::find()
            .filter(cards::Column::BoxId.eq(box_id.to_string()))
            .order_by_asc(cards::Column::Name)
            .order_by_asc(cards::Column::Id)
            .all(db)
            .await?
            .into_iter()
            .map(Card::try_from)
            .collect()
    }

    pub(super) async fn require_battle(
        &self,
        db: &DatabaseTransaction,
        battle_id: Uuid,
    ) -> ResultEngine<Battle> {
        let model = battles::Entity::find_by_id(battle_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("battle not exists".to_string()))?;
        Battle::try_from(model)
    }

    /// Seats of a battle in seat order.
    pub(super) async fn battle_seats(
        &self,
        db: &DatabaseTransaction,
        battle_id: Uuid,
    ) -> ResultEngine<Vec<battle_participants::Model>> {
        battle_participants::Entity::find()
            .filter(battle_participants::Column::BattleId.eq(battle_id.to_string()))
            .order_by_asc(battle_participants::Column::Seat)
            .all(db)
            .await
            .map_err(Into::into)
    }
}
