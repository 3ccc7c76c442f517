//! The authenticated user: profile, coin ledger, stats and achievements.

use api_types::{
    achievement::{AchievementView, AchievementsResponse},
    user::{
        CoinHistoryQuery, CoinHistoryResponse, CoinTransactionKind as ApiKind,
        CoinTransactionView, CollectionStats, Me,
    },
};
use axum::{
    Extension, Json,
    extract::{Query, State},
};
use axum_extra::extract::WithRejection;
use engine::{RetryPolicy, with_retry};
use sea_orm::entity::prelude::*;

use crate::{QueryParams, ServerError, server::ServerState};

/// Credentials as seen by the auth middleware.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub username: String,
    pub password: String,
    pub is_admin: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

const DEFAULT_HISTORY_LIMIT: u64 = 50;

fn map_kind(kind: engine::CoinTransactionKind) -> ApiKind {
    match kind {
        engine::CoinTransactionKind::Grant => ApiKind::Grant,
        engine::CoinTransactionKind::PackPurchase => ApiKind::PackPurchase,
        engine::CoinTransactionKind::BattleEntry => ApiKind::BattleEntry,
        engine::CoinTransactionKind::BattleRefund => ApiKind::BattleRefund,
        engine::CoinTransactionKind::Sale => ApiKind::Sale,
        engine::CoinTransactionKind::Achievement => ApiKind::Achievement,
    }
}

pub async fn me(
    Extension(user): Extension<Model>,
    State(state): State<ServerState>,
) -> Result<Json<Me>, ServerError> {
    let engine = state.engine.as_ref();
    let username = user.username.as_str();
    let profile = with_retry(RetryPolicy::default(), move || engine.user(username)).await?;

    Ok(Json(Me {
        username: profile.username,
        coins: profile.coins,
        is_admin: profile.is_admin,
        created_at: profile.created_at,
    }))
}

pub async fn coins(
    Extension(user): Extension<Model>,
    State(state): State<ServerState>,
    WithRejection(Query(query), _): QueryParams<CoinHistoryQuery>,
) -> Result<Json<CoinHistoryResponse>, ServerError> {
    let engine = state.engine.as_ref();
    let username = user.username.as_str();
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);

    let profile = with_retry(RetryPolicy::default(), move || engine.user(username)).await?;
    let history = with_retry(RetryPolicy::default(), move || {
        engine.coin_history(username, limit)
    })
    .await?;

    let transactions = history
        .into_iter()
        .map(|tx| CoinTransactionView {
            id: tx.id,
            kind: map_kind(tx.kind),
            amount: tx.amount,
            balance_after: tx.balance_after,
            reference: tx.reference,
            created_at: tx.created_at,
        })
        .collect();

    Ok(Json(CoinHistoryResponse {
        balance: profile.coins,
        transactions,
    }))
}

pub async fn stats(
    Extension(user): Extension<Model>,
    State(state): State<ServerState>,
) -> Result<Json<CollectionStats>, ServerError> {
    let engine = state.engine.as_ref();
    let username = user.username.as_str();
    let stats = with_retry(RetryPolicy::default(), move || {
        engine.collection_stats(username)
    })
    .await?;

    Ok(Json(CollectionStats {
        pulls_owned: stats.pulls_owned,
        kept_value: stats.kept_value,
        sold_value: stats.sold_value,
        battles_played: stats.battles_played,
        battles_won: stats.battles_won,
    }))
}

pub async fn achievements(
    Extension(user): Extension<Model>,
    State(state): State<ServerState>,
) -> Result<Json<AchievementsResponse>, ServerError> {
    let engine = state.engine.as_ref();
    let username = user.username.as_str();
    let states = with_retry(RetryPolicy::default(), move || engine.achievements(username)).await?;

    let achievements = states
        .into_iter()
        .map(|state| AchievementView {
            code: state.achievement.code().to_string(),
            title: state.achievement.title().to_string(),
            description: state.achievement.description().to_string(),
            reward: state.achievement.reward(),
            unlocked_at: state.unlocked_at,
        })
        .collect();

    Ok(Json(AchievementsResponse { achievements }))
}
