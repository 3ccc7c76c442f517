//! Box catalog endpoints and pack opening.

use api_types::boxes::{
    BoxCreated, BoxDetailResponse, BoxListQuery, BoxListResponse, BoxNew, BoxUpdate, CardNew,
    CardOddsView, CardView, OpenPacks, PackOpeningResponse,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use engine::{RetryPolicy, with_retry};
use uuid::Uuid;

use crate::{
    JsonBody, PathParam, QueryParams, ServerError,
    server::ServerState,
    user,
    views::{box_view, card_view, pull_view},
};

fn engine_card(card: CardNew) -> engine::CardNew {
    engine::CardNew {
        name: card.name,
        rarity: card.rarity.unwrap_or_default(),
        coin_value: card.coin_value,
        pull_rate: card.pull_rate,
        image_url: card.image_url,
    }
}

pub async fn list(
    _: Extension<user::Model>,
    State(state): State<ServerState>,
    WithRejection(Query(query), _): QueryParams<BoxListQuery>,
) -> Result<Json<BoxListResponse>, ServerError> {
    let engine = state.engine.as_ref();
    let include_inactive = query.include_inactive.unwrap_or(false);
    let boxes = with_retry(RetryPolicy::default(), move || {
        engine.list_boxes(include_inactive)
    })
    .await?;

    Ok(Json(BoxListResponse {
        boxes: boxes.into_iter().map(box_view).collect(),
    }))
}

pub async fn box_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    WithRejection(Json(payload), _): JsonBody<BoxNew>,
) -> Result<(StatusCode, Json<BoxCreated>), ServerError> {
    let engine = state.engine.as_ref();
    let username = user.username.as_str();
    let pool: Vec<engine::CardNew> = payload.cards.into_iter().map(engine_card).collect();
    let name = payload.name.as_str();
    let description = payload.description.as_deref();
    let (price, cards_per_pack) = (payload.price, payload.cards_per_pack);

    let id = with_retry(RetryPolicy::default(), move || {
        engine.new_box(
            username,
            name,
            description,
            price,
            cards_per_pack,
            pool.clone(),
        )
    })
    .await?;

    Ok((StatusCode::CREATED, Json(BoxCreated { id })))
}

pub async fn detail(
    _: Extension<user::Model>,
    State(state): State<ServerState>,
    WithRejection(Path(id), _): PathParam<Uuid>,
) -> Result<Json<BoxDetailResponse>, ServerError> {
    let engine = state.engine.as_ref();
    let detail = with_retry(RetryPolicy::default(), move || engine.box_detail(id)).await?;

    let cards = detail
        .cards
        .into_iter()
        .map(|odds| CardOddsView {
            card: card_view(odds.card),
            probability: odds.probability,
        })
        .collect();

    Ok(Json(BoxDetailResponse {
        pack_box: box_view(detail.pack_box),
        cards,
    }))
}

pub async fn set_active(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    WithRejection(Path(id), _): PathParam<Uuid>,
    WithRejection(Json(payload), _): JsonBody<BoxUpdate>,
) -> Result<StatusCode, ServerError> {
    let engine = state.engine.as_ref();
    let username = user.username.as_str();
    let active = payload.active;
    with_retry(RetryPolicy::default(), move || {
        engine.set_box_active(username, id, active)
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn card_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    WithRejection(Path(id), _): PathParam<Uuid>,
    WithRejection(Json(payload), _): JsonBody<CardNew>,
) -> Result<(StatusCode, Json<CardView>), ServerError> {
    let engine = state.engine.as_ref();
    let username = user.username.as_str();
    let card = engine_card(payload);
    let card = with_retry(RetryPolicy::default(), move || {
        engine.add_card(username, id, card.clone())
    })
    .await?;

    Ok((StatusCode::CREATED, Json(card_view(card))))
}

pub async fn open(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    WithRejection(Path(id), _): PathParam<Uuid>,
    WithRejection(Json(payload), _): JsonBody<OpenPacks>,
) -> Result<Json<PackOpeningResponse>, ServerError> {
    let engine = state.engine.as_ref();
    let username = user.username.as_str();
    let quantity = payload.quantity.unwrap_or(1);
    let opening = with_retry(RetryPolicy::default(), move || {
        engine.open_pack(username, id, quantity)
    })
    .await?;

    Ok(Json(PackOpeningResponse {
        box_id: opening.pack_box.id,
        quantity: opening.quantity,
        cost: opening.cost,
        total_value: opening.total_value,
        balance: opening.balance,
        pulls: opening.pulls.into_iter().map(pull_view).collect(),
        unlocked: opening
            .unlocked
            .into_iter()
            .map(|a| a.code().to_string())
            .collect(),
    }))
}
