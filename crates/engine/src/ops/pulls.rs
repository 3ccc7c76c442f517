use base64::Engine as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    Condition, QueryFilter, QueryOrder, QuerySelect, Statement, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    CoinTransactionKind, EngineError, PullStatus, PulledCard, ResultEngine, cards, pulls,
    pulls::pulled_card,
};

use super::{Engine, with_tx};

pub const MAX_PAGE_SIZE: u64 = 100;

/// Filters for listing a user's pulls.
#[derive(Clone, Debug, Default)]
pub struct PullListFilter {
    pub status: Option<PullStatus>,
    pub box_id: Option<Uuid>,
}

/// One page of pulls, newest first.
#[derive(Clone, Debug, PartialEq)]
pub struct PullPage {
    pub pulls: Vec<PulledCard>,
    /// Pass back to get the next page; `None` on the last page.
    pub next_cursor: Option<String>,
}

/// Totals over a user's collection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollectionStats {
    pub pulls_owned: u64,
    pub kept_value: i64,
    pub sold_value: i64,
    pub battles_played: u64,
    pub battles_won: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct PullsCursor {
    created_at: DateTime<Utc>,
    pull_id: String,
}

impl PullsCursor {
    fn encode(&self) -> ResultEngine<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| EngineError::InvalidCursor("invalid pulls cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decode(input: &str) -> ResultEngine<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| EngineError::InvalidCursor("invalid pulls cursor".to_string()))?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| EngineError::InvalidCursor("invalid pulls cursor".to_string()))
    }
}

impl Engine {
    /// Lists the pulls a user currently owns, with cursor-based pagination.
    ///
    /// Ordered by `created_at DESC, id DESC`.
    pub async fn list_pulls(
        &self,
        username: &str,
        filter: &PullListFilter,
        cursor: Option<&str>,
        limit: u64,
    ) -> ResultEngine<PullPage> {
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(EngineError::InvalidInput(format!(
                "limit must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        let cursor = cursor.map(PullsCursor::decode).transpose()?;

        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, username).await?;

            let mut query =
                pulls::Entity::find().filter(pulls::Column::UserId.eq(username.to_string()));
            if let Some(status) = filter.status {
                query = query.filter(pulls::Column::Status.eq(status.as_str()));
            }
            if let Some(box_id) = filter.box_id {
                query = query.filter(pulls::Column::BoxId.eq(box_id.to_string()));
            }
            if let Some(cursor) = &cursor {
                query = query.filter(
                    Condition::any()
                        .add(pulls::Column::CreatedAt.lt(cursor.created_at))
                        .add(
                            Condition::all()
                                .add(pulls::Column::CreatedAt.eq(cursor.created_at))
                                .add(pulls::Column::Id.lt(cursor.pull_id.clone())),
                        ),
                );
            }

            let rows = query
                .order_by_desc(pulls::Column::CreatedAt)
                .order_by_desc(pulls::Column::Id)
                .limit(limit + 1)
                .find_also_related(cards::Entity)
                .all(&db_tx)
                .await?;

            let has_more = rows.len() as u64 > limit;
            let mut out = rows
                .into_iter()
                .map(pulled_card)
                .collect::<ResultEngine<Vec<_>>>()?;
            out.truncate(limit as usize);

            let next_cursor = if has_more {
                out.last()
                    .map(|p| PullsCursor {
                        created_at: p.pull.created_at,
                        pull_id: p.pull.id.to_string(),
                    })
                    .map(|c| c.encode())
                    .transpose()?
            } else {
                None
            };

            Ok(PullPage {
                pulls: out,
                next_cursor,
            })
        })
    }

    /// Sell a kept pull back for its card's coin value.
    ///
    /// Returns the new balance.
    pub async fn sell_pull(&self, username: &str, pull_id: Uuid) -> ResultEngine<i64> {
        with_tx!(self, |db_tx| {
            let row = pulls::Entity::find_by_id(pull_id.to_string())
                .find_also_related(cards::Entity)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("pull not exists".to_string()))?;
            let PulledCard { pull, card } = pulled_card(row)?;

            if pull.user_id != username {
                return Err(EngineError::Forbidden(
                    "pull belongs to another user".to_string(),
                ));
            }
            if pull.status != PullStatus::Kept {
                return Err(EngineError::InvalidState("pull already sold".to_string()));
            }

            let sold = pulls::Entity::update_many()
                .col_expr(
                    pulls::Column::Status,
                    Expr::value(PullStatus::Sold.as_str()),
                )
                .filter(pulls::Column::Id.eq(pull.id.to_string()))
                .filter(pulls::Column::UserId.eq(username))
                .filter(pulls::Column::Status.eq(PullStatus::Kept.as_str()))
                .exec(&db_tx)
                .await?;
            if sold.rows_affected == 0 {
                return Err(EngineError::InvalidState("pull already sold".to_string()));
            }

            let balance = self
                .credit(
                    &db_tx,
                    username,
                    card.coin_value,
                    CoinTransactionKind::Sale,
                    Some(pull.id.to_string()),
                )
                .await?;
            tracing::info!("{username} sold '{}' for {}", card.name, card.coin_value);
            Ok(balance)
        })
    }

    /// Totals over the pulls a user owns and the battles they sat in.
    pub async fn collection_stats(&self, username: &str) -> ResultEngine<CollectionStats> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, username).await?;
            let backend = db_tx.get_database_backend();

            let stmt = Statement::from_sql_and_values(
                backend,
                "SELECT \
                   COUNT(p.id) AS owned, \
                   COALESCE(SUM(CASE WHEN p.status = 'kept' THEN c.coin_value ELSE 0 END), 0) AS kept, \
                   COALESCE(SUM(CASE WHEN p.status = 'sold' THEN c.coin_value ELSE 0 END), 0) AS sold \
                 FROM pulls p JOIN cards c ON c.id = p.card_id \
                 WHERE p.user_id = ?",
                [username.into()],
            );
            let row = db_tx.query_one(stmt).await?;
            let get = |col: &str| -> Result<i64, DbErr> {
                Ok(row
                    .as_ref()
                    .map(|r| r.try_get("", col))
                    .transpose()?
                    .unwrap_or(0))
            };
            let (owned, kept_value, sold_value) = (get("owned")?, get("kept")?, get("sold")?);

            let stmt = Statement::from_sql_and_values(
                backend,
                "SELECT COUNT(battle_id) AS played FROM battle_participants WHERE user_id = ?",
                [username.into()],
            );
            let played: i64 = db_tx
                .query_one(stmt)
                .await?
                .map(|r| r.try_get("", "played"))
                .transpose()?
                .unwrap_or(0);

            let progress = self.achievement_progress(&db_tx, username).await?;

            Ok(CollectionStats {
                pulls_owned: u64::try_from(owned).unwrap_or(0),
                kept_value,
                sold_value,
                battles_played: u64::try_from(played).unwrap_or(0),
                battles_won: progress.battles_won,
            })
        })
    }
}
