//! Inventory endpoints.

use api_types::pull::{PullListQuery, PullListResponse, PullSold, PullStatus};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use axum_extra::extract::WithRejection;
use engine::{PullListFilter, RetryPolicy, with_retry};
use uuid::Uuid;

use crate::{PathParam, QueryParams, ServerError, server::ServerState, user, views::pull_view};

const DEFAULT_PAGE_SIZE: u64 = 50;

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    WithRejection(Query(query), _): QueryParams<PullListQuery>,
) -> Result<Json<PullListResponse>, ServerError> {
    let filter = PullListFilter {
        status: query.status.map(|status| match status {
            PullStatus::Kept => engine::PullStatus::Kept,
            PullStatus::Sold => engine::PullStatus::Sold,
        }),
        box_id: query.box_id,
    };
    let filter = &filter;
    let engine = state.engine.as_ref();
    let username = user.username.as_str();
    let cursor = query.cursor.as_deref();
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);

    let page = with_retry(RetryPolicy::default(), move || {
        engine.list_pulls(username, filter, cursor, limit)
    })
    .await?;

    Ok(Json(PullListResponse {
        pulls: page.pulls.into_iter().map(pull_view).collect(),
        next_cursor: page.next_cursor,
    }))
}

pub async fn sell(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    WithRejection(Path(id), _): PathParam<Uuid>,
) -> Result<Json<PullSold>, ServerError> {
    let engine = state.engine.as_ref();
    let username = user.username.as_str();
    let balance = with_retry(RetryPolicy::default(), move || engine.sell_pull(username, id)).await?;

    Ok(Json(PullSold { id, balance }))
}
