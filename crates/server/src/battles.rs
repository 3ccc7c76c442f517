//! Battle endpoints.

use api_types::battle::{
    BattleDetailResponse, BattleListQuery, BattleListResponse, BattleMode, BattleNew,
    BattleStatus,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use engine::{BattleDetail, RetryPolicy, with_retry};
use uuid::Uuid;

use crate::{
    JsonBody, PathParam, QueryParams, ServerError,
    server::ServerState,
    user,
    views::{battle_view, participant_view, pull_view},
};

const DEFAULT_LIST_LIMIT: u64 = 50;

fn detail_response(detail: BattleDetail) -> BattleDetailResponse {
    BattleDetailResponse {
        battle: battle_view(detail.battle),
        participants: detail
            .participants
            .into_iter()
            .map(participant_view)
            .collect(),
        pulls: detail.pulls.into_iter().map(pull_view).collect(),
    }
}

pub async fn list(
    _: Extension<user::Model>,
    State(state): State<ServerState>,
    WithRejection(Query(query), _): QueryParams<BattleListQuery>,
) -> Result<Json<BattleListResponse>, ServerError> {
    let status = query.status.map(|status| match status {
        BattleStatus::Open => engine::BattleStatus::Open,
        BattleStatus::Finished => engine::BattleStatus::Finished,
        BattleStatus::Cancelled => engine::BattleStatus::Cancelled,
    });
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let engine = state.engine.as_ref();
    let battles = with_retry(RetryPolicy::default(), move || {
        engine.list_battles(status, limit)
    })
    .await?;

    Ok(Json(BattleListResponse {
        battles: battles.into_iter().map(battle_view).collect(),
    }))
}

pub async fn battle_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    WithRejection(Json(payload), _): JsonBody<BattleNew>,
) -> Result<(StatusCode, Json<BattleDetailResponse>), ServerError> {
    let mode = match payload.mode {
        BattleMode::Highest => engine::BattleMode::Highest,
        BattleMode::Lowest => engine::BattleMode::Lowest,
        BattleMode::Random => engine::BattleMode::Random,
    };
    let engine = state.engine.as_ref();
    let username = user.username.as_str();
    let detail = with_retry(RetryPolicy::default(), move || {
        engine.create_battle(
            username,
            payload.box_id,
            payload.rounds,
            payload.max_participants,
            mode,
        )
    })
    .await?;

    Ok((StatusCode::CREATED, Json(detail_response(detail))))
}

pub async fn detail(
    _: Extension<user::Model>,
    State(state): State<ServerState>,
    WithRejection(Path(id), _): PathParam<Uuid>,
) -> Result<Json<BattleDetailResponse>, ServerError> {
    let engine = state.engine.as_ref();
    let detail = with_retry(RetryPolicy::default(), move || engine.battle(id)).await?;

    Ok(Json(detail_response(detail)))
}

pub async fn join(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    WithRejection(Path(id), _): PathParam<Uuid>,
) -> Result<Json<BattleDetailResponse>, ServerError> {
    let engine = state.engine.as_ref();
    let username = user.username.as_str();
    let detail = with_retry(RetryPolicy::default(), move || {
        engine.join_battle(username, id)
    })
    .await?;

    Ok(Json(detail_response(detail)))
}

pub async fn leave(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    WithRejection(Path(id), _): PathParam<Uuid>,
) -> Result<StatusCode, ServerError> {
    let engine = state.engine.as_ref();
    let username = user.username.as_str();
    with_retry(RetryPolicy::default(), move || {
        engine.leave_battle(username, id)
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn cancel(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    WithRejection(Path(id), _): PathParam<Uuid>,
) -> Result<StatusCode, ServerError> {
    let engine = state.engine.as_ref();
    let username = user.username.as_str();
    with_retry(RetryPolicy::default(), move || {
        engine.cancel_battle(username, id)
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
