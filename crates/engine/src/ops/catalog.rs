use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Card, CardNew, EngineError, PackBox, ResultEngine, boxes, cards, draw,
    util::{name_key, normalize_optional_text, normalize_required_name},
};

use super::{Engine, with_tx};

/// A card with its chance of being drawn from its box.
#[derive(Clone, Debug, PartialEq)]
pub struct CardOdds {
    pub card: Card,
    /// `pull_rate / total pull rate of the box`, in `[0, 1]`.
    pub probability: f64,
}

/// A box with its full card pool.
#[derive(Clone, Debug, PartialEq)]
pub struct BoxDetail {
    pub pack_box: PackBox,
    pub cards: Vec<CardOdds>,
}

/// The pool's rates must add up to a finite total or nothing can be drawn.
fn check_pool_weight(pool: &[Card]) -> ResultEngine<()> {
    if draw::total_weight(pool).is_finite() {
        Ok(())
    } else {
        Err(EngineError::InvalidInput(
            "pull rates of the box add up to infinity".to_string(),
        ))
    }
}

impl Engine {
    /// Create a box with its initial card pool.
    ///
    /// Authorization: administrators only.
    pub async fn new_box(
        &self,
        username: &str,
        name: &str,
        description: Option<&str>,
        price: i64,
        cards_per_pack: i32,
        pool: Vec<CardNew>,
    ) -> ResultEngine<Uuid> {
        let name = normalize_required_name(name, "box")?;
        let pack_box = PackBox::new(
            name.clone(),
            normalize_optional_text(description),
            price,
            cards_per_pack,
        )?;
        if pool.is_empty() {
            return Err(EngineError::InvalidInput(
                "a box needs at least one card".to_string(),
            ));
        }
        let pool = pool
            .into_iter()
            .map(|card| Card::new(pack_box.id, card))
            .collect::<ResultEngine<Vec<_>>>()?;
        check_pool_weight(&pool)?;

        with_tx!(self, |db_tx| {
            self.require_admin(&db_tx, username).await?;

            let key = name_key(&name);
            let exists = boxes::Entity::find()
                .filter(boxes::Column::NameNorm.eq(key.clone()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(name));
            }

            let mut model = boxes::ActiveModel::from(&pack_box);
            model.name_norm = ActiveValue::Set(key);
            model.insert(&db_tx).await?;
            for card in &pool {
                cards::ActiveModel::from(card).insert(&db_tx).await?;
            }

            tracing::info!(
                "created box '{name}' ({}) with {} cards",
                pack_box.id,
                pool.len()
            );
            Ok(pack_box.id)
        })
    }

    /// Add a card to an existing box.
    ///
    /// Authorization: administrators only.
    pub async fn add_card(&self, username: &str, box_id: Uuid, card: CardNew) -> ResultEngine<Card> {
        let card = Card::new(box_id, card)?;
        with_tx!(self, |db_tx| {
            self.require_admin(&db_tx, username).await?;
            self.require_box(&db_tx, box_id).await?;
            let mut pool = self.box_cards(&db_tx, box_id).await?;
            pool.push(card.clone());
            check_pool_weight(&pool)?;
            cards::ActiveModel::from(&card).insert(&db_tx).await?;
            Ok(card)
        })
    }

    /// Put a box on sale or withdraw it. Open battles on it are unaffected.
    ///
    /// Authorization: administrators only.
    pub async fn set_box_active(&self, username: &str, box_id: Uuid, active: bool) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_admin(&db_tx, username).await?;
            self.require_box(&db_tx, box_id).await?;
            boxes::ActiveModel {
                id: ActiveValue::Set(box_id.to_string()),
                active: ActiveValue::Set(active),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;
            Ok(())
        })
    }

    /// Boxes ordered by name.
    pub async fn list_boxes(&self, include_inactive: bool) -> ResultEngine<Vec<PackBox>> {
        with_tx!(self, |db_tx| {
            let mut query = boxes::Entity::find().order_by_asc(boxes::Column::NameNorm);
            if !include_inactive {
                query = query.filter(boxes::Column::Active.eq(true));
            }
            let rows = query.all(&db_tx).await?;
            rows.into_iter().map(PackBox::try_from).collect()
        })
    }

    /// A box with its cards and their drop probabilities.
    pub async fn box_detail(&self, box_id: Uuid) -> ResultEngine<BoxDetail> {
        with_tx!(self, |db_tx| {
            let pack_box = self.require_box(&db_tx, box_id).await?;
            let cards = self.box_cards(&db_tx, box_id).await?;
            let odds = draw::expected_distribution(&cards);
            let cards = cards
                .into_iter()
                .zip(odds)
                .map(|(card, probability)| CardOdds { card, probability })
                .collect();
            Ok(BoxDetail { pack_box, cards })
        })
    }
}
