use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    Battle, BattleMode, BattleStatus, CoinTransactionKind, EngineError, Participant, Pull,
    PulledCard, ResultEngine, battle_participants, battles, cards, pulls, pulls::pulled_card,
};

use super::{Engine, with_tx};

/// Most battles returned by a single listing.
const MAX_LISTED_BATTLES: u64 = 100;

/// A battle with its seats and, once finished, every card pulled in it.
#[derive(Clone, Debug, PartialEq)]
pub struct BattleDetail {
    pub battle: Battle,
    /// Seat order.
    pub participants: Vec<Participant>,
    /// Ordered by round, then seat.
    pub pulls: Vec<PulledCard>,
}

impl Engine {
    /// Open a battle on a box and take the first seat.
    ///
    /// The creator pays the entry fee (`price * rounds`) right away.
    pub async fn create_battle(
        &self,
        username: &str,
        box_id: Uuid,
        rounds: i32,
        max_participants: i32,
        mode: BattleMode,
    ) -> ResultEngine<BattleDetail> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, username).await?;
            let (pack_box, _) = self.require_open_box(&db_tx, box_id).await?;
            let battle = Battle::new(
                username.to_string(),
                box_id,
                pack_box.price,
                rounds,
                max_participants,
                mode,
            )?;
            battles::ActiveModel::from(&battle).insert(&db_tx).await?;
            self.take_seat(&db_tx, &battle, username, 0).await?;

            tracing::info!(
                "{username} opened battle {} on '{}' ({} rounds, {} seats, {})",
                battle.id,
                pack_box.name,
                rounds,
                max_participants,
                mode.as_str()
            );
            self.battle_detail(&db_tx, battle.id).await
        })
    }

    /// Take the next free seat of an open battle.
    ///
    /// Filling the last seat starts the battle: cards are drawn for every
    /// participant and the winner takes them all, in this same transaction.
    pub async fn join_battle(&self, username: &str, battle_id: Uuid) -> ResultEngine<BattleDetail> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, username).await?;
            let battle = self.require_battle(&db_tx, battle_id).await?;
            if battle.status != BattleStatus::Open {
                return Err(EngineError::InvalidState(format!(
                    "battle is {}",
                    battle.status.as_str()
                )));
            }

            let seats = self.battle_seats(&db_tx, battle_id).await?;
            if seats.iter().any(|s| s.user_id == username) {
                return Err(EngineError::ExistingKey(format!(
                    "{username} already in battle"
                )));
            }
            if seats.len() >= battle.max_participants as usize {
                return Err(EngineError::InvalidState("battle is full".to_string()));
            }

            let next_seat = seats.iter().map(|s| s.seat + 1).max().unwrap_or(0);
            self.take_seat(&db_tx, &battle, username, next_seat).await?;
            tracing::debug!("{username} joined battle {battle_id} at seat {next_seat}");

            if seats.len() + 1 == battle.max_participants as usize {
                self.resolve_battle(&db_tx, &battle).await?;
            }
            self.battle_detail(&db_tx, battle_id).await
        })
    }

    /// Give up a seat before the battle starts and get the entry fee back.
    ///
    /// The creator cannot leave; they cancel instead.
    pub async fn leave_battle(&self, username: &str, battle_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let battle = self.require_battle(&db_tx, battle_id).await?;
            if battle.status != BattleStatus::Open {
                return Err(EngineError::InvalidState(format!(
                    "battle is {}",
                    battle.status.as_str()
                )));
            }
            if battle.creator_id == username {
                return Err(EngineError::InvalidState(
                    "the creator must cancel the battle instead".to_string(),
                ));
            }
            let removed = battle_participants::Entity::delete_by_id((
                battle_id.to_string(),
                username.to_string(),
            ))
            .exec(&db_tx)
            .await?;
            if removed.rows_affected == 0 {
                return Err(EngineError::KeyNotFound(format!(
                    "{username} not in battle"
                )));
            }
            self.credit(
                &db_tx,
                username,
                battle.entry_fee,
                CoinTransactionKind::BattleRefund,
                Some(battle_id.to_string()),
            )
            .await?;
            Ok(())
        })
    }

    /// Cancel an open battle and refund every participant.
    ///
    /// Authorization: the creator only.
    pub async fn cancel_battle(&self, username: &str, battle_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let battle = self.require_battle(&db_tx, battle_id).await?;
            if battle.creator_id != username {
                return Err(EngineError::Forbidden(
                    "only the creator can cancel a battle".to_string(),
                ));
            }
            if battle.status != BattleStatus::Open {
                return Err(EngineError::InvalidState(format!(
                    "battle is {}",
                    battle.status.as_str()
                )));
            }

            for seat in self.battle_seats(&db_tx, battle_id).await? {
                self.credit(
                    &db_tx,
                    &seat.user_id,
                    battle.entry_fee,
                    CoinTransactionKind::BattleRefund,
                    Some(battle_id.to_string()),
                )
                .await?;
            }
            battles::ActiveModel {
                id: ActiveValue::Set(battle_id.to_string()),
                status: ActiveValue::Set(BattleStatus::Cancelled.as_str().to_string()),
                finished_at: ActiveValue::Set(Some(Utc::now())),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;
            tracing::info!("battle {battle_id} cancelled by {username}");
            Ok(())
        })
    }

    /// A battle with participants and pulls.
    pub async fn battle(&self, battle_id: Uuid) -> ResultEngine<BattleDetail> {
        with_tx!(self, |db_tx| { self.battle_detail(&db_tx, battle_id).await })
    }

    /// Battles newest first, optionally only those with `status`.
    pub async fn list_battles(
        &self,
        status: Option<BattleStatus>,
        limit: u64,
    ) -> ResultEngine<Vec<Battle>> {
        let limit = limit.clamp(1, MAX_LISTED_BATTLES);
        with_tx!(self, |db_tx| {
            let mut query = battles::Entity::find();
            if let Some(status) = status {
                query = query.filter(battles::Column::Status.eq(status.as_str()));
            }
            let rows = query
                .order_by_desc(battles::Column::CreatedAt)
                .order_by_desc(battles::Column::Id)
                .limit(limit)
                .all(&db_tx)
                .await?;
            rows.into_iter().map(Battle::try_from).collect()
        })
    }

    async fn take_seat(
        &self,
        db: &DatabaseTransaction,
        battle: &Battle,
        username: &str,
        seat: i32,
    ) -> ResultEngine<()> {
        self.debit(
            db,
            username,
            battle.entry_fee,
            CoinTransactionKind::BattleEntry,
            Some(battle.id.to_string()),
        )
        .await?;
        battle_participants::ActiveModel {
            battle_id: ActiveValue::Set(battle.id.to_string()),
            user_id: ActiveValue::Set(username.to_string()),
            seat: ActiveValue::Set(seat),
            total_value: ActiveValue::Set(0),
            joined_at: ActiveValue::Set(Utc::now()),
        }
        .insert(db)
        .await?;
        Ok(())
    }

    /// Draw for every participant, score, pick the winner and hand over the
    /// cards.
    async fn resolve_battle(&self, db: &DatabaseTransaction, battle: &Battle) -> ResultEngine<()> {
        let pack_box = self.require_box(db, battle.box_id).await?;
        let pool = self.box_cards(db, battle.box_id).await?;
        let seats = self.battle_seats(db, battle.id).await?;

        let per_round = usize::try_from(pack_box.cards_per_pack).unwrap_or(0);
        let per_seat = per_round.saturating_mul(usize::try_from(battle.rounds).unwrap_or(0));

        let now = Utc::now();
        let mut totals = Vec::with_capacity(seats.len());
        for seat in &seats {
            let drawn = self.draw_cards(&pool, per_seat)?;
            let mut total = 0i64;
            for (i, card) in drawn.iter().enumerate() {
                let round = i32::try_from(i / per_round.max(1) + 1).unwrap_or(i32::MAX);
                let pull = Pull::new(&seat.user_id, card, now).in_battle(battle.id, round);
                pulls::ActiveModel::from(&pull).insert(db).await?;
                total = total.saturating_add(card.coin_value);
            }

            battle_participants::ActiveModel {
                battle_id: ActiveValue::Set(battle.id.to_string()),
                user_id: ActiveValue::Set(seat.user_id.clone()),
                total_value: ActiveValue::Set(total),
                ..Default::default()
            }
            .update(db)
            .await?;
            totals.push(total);
        }

        let winner_index = self
            .with_rng(|rng| battle.mode.pick_winner(&totals, rng))
            .ok_or_else(|| EngineError::InvalidState("battle has no participants".to_string()))?;
        let winner = &seats[winner_index].user_id;

        pulls::Entity::update_many()
            .col_expr(pulls::Column::UserId, Expr::value(winner.clone()))
            .filter(pulls::Column::BattleId.eq(battle.id.to_string()))
            .exec(db)
            .await?;

        battles::ActiveModel {
            id: ActiveValue::Set(battle.id.to_string()),
            status: ActiveValue::Set(BattleStatus::Finished.as_str().to_string()),
            winner_id: ActiveValue::Set(Some(winner.clone())),
            finished_at: ActiveValue::Set(Some(Utc::now())),
            ..Default::default()
        }
        .update(db)
        .await?;

        for seat in &seats {
            self.evaluate_achievements(db, &seat.user_id).await?;
        }

        tracing::info!(
            "battle {} finished, {winner} wins with {} ({})",
            battle.id,
            totals[winner_index],
            battle.mode.as_str()
        );
        Ok(())
    }

    async fn battle_detail(
        &self,
        db: &DatabaseTransaction,
        battle_id: Uuid,
    ) -> ResultEngine<BattleDetail> {
        let battle = self.require_battle(db, battle_id).await?;
        let seats = self.battle_seats(db, battle_id).await?;

        let rows = pulls::Entity::find()
            .filter(pulls::Column::BattleId.eq(battle_id.to_string()))
            .order_by_asc(pulls::Column::Round)
            .find_also_related(cards::Entity)
            .all(db)
            .await?;
        let mut battle_pulls = rows
            .into_iter()
            .map(pulled_card)
            .collect::<ResultEngine<Vec<_>>>()?;
        let seat_of = |user: &str| {
            seats
                .iter()
                .find(|s| s.user_id == user)
                .map_or(i32::MAX, |s| s.seat)
        };
        battle_pulls.sort_by_key(|p| (p.pull.round, seat_of(&p.pull.pulled_by)));

        Ok(BattleDetail {
            battle,
            participants: seats.into_iter().map(Participant::from).collect(),
            pulls: battle_pulls,
        })
    }
}
