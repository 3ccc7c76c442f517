use chrono::Utc;
use sea_orm::{TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Achievement, Card, CoinTransactionKind, EngineError, PackBox, Pull, PulledCard, ResultEngine,
    draw, pulls,
};

use super::{Engine, with_tx};

/// Most packs that can be opened in one purchase.
pub const MAX_PACKS_PER_OPENING: u32 = 10;

/// Outcome of opening one or more packs.
#[derive(Clone, Debug, PartialEq)]
pub struct PackOpening {
    pub pack_box: PackBox,
    pub quantity: u32,
    pub pulls: Vec<PulledCard>,
    /// Coins paid.
    pub cost: i64,
    /// Sum of the drawn cards' values.
    pub total_value: i64,
    /// Balance after paying and after any achievement reward.
    pub balance: i64,
    pub unlocked: Vec<Achievement>,
}

impl Engine {
    /// Draw `count` cards from `pool`.
    pub(super) fn draw_cards(&self, pool: &[Card], count: usize) -> ResultEngine<Vec<Card>> {
        self.with_rng(|rng| draw::draw_many(pool, count, rng))
            .map(|drawn| drawn.into_iter().cloned().collect())
            .ok_or_else(|| EngineError::EmptyPool("no card can be drawn".to_string()))
    }

    /// Buy and open `quantity` packs of a box.
    ///
    /// Payment, pulls and the ledger row commit together: either the user
    /// paid and owns every card, or nothing happened.
    pub async fn open_pack(
        &self,
        username: &str,
        box_id: Uuid,
        quantity: u32,
    ) -> ResultEngine<PackOpening> {
        if !(1..=MAX_PACKS_PER_OPENING).contains(&quantity) {
            return Err(EngineError::InvalidInput(format!(
                "quantity must be between 1 and {MAX_PACKS_PER_OPENING}"
            )));
        }

        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, username).await?;
            let (pack_box, pool) = self.require_open_box(&db_tx, box_id).await?;
            let cost = pack_box.cost_of(quantity)?;

            self.debit(
                &db_tx,
                username,
                cost,
                CoinTransactionKind::PackPurchase,
                Some(box_id.to_string()),
            )
            .await?;

            let count = usize::try_from(pack_box.cards_per_pack)
                .unwrap_or(0)
                .saturating_mul(quantity as usize);
            let drawn = self.draw_cards(&pool, count)?;

            let now = Utc::now();
            let mut opened = Vec::with_capacity(drawn.len());
            for card in drawn {
                let pull = Pull::new(username, &card, now);
                pulls::ActiveModel::from(&pull).insert(&db_tx).await?;
                opened.push(PulledCard { pull, card });
            }
            let total_value = opened
                .iter()
                .try_fold(0i64, |acc, p| acc.checked_add(p.card.coin_value))
                .ok_or_else(|| {
                    EngineError::InvalidInput("pack value overflows".to_string())
                })?;

            let unlocked = self.evaluate_achievements(&db_tx, username).await?;
            let balance = self.require_user(&db_tx, username).await?.coins;

            tracing::info!(
                "{username} opened {quantity} pack(s) of '{}' for {cost} coins, pulled {total_value}",
                pack_box.name
            );
            Ok(PackOpening {
                pack_box,
                quantity,
                pulls: opened,
                cost,
                total_value,
                balance,
                unlocked,
            })
        })
    }
}
