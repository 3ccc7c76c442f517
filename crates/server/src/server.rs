use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Basic};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use std::sync::Arc;

use crate::{battles, boxes, pulls, user};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub db: DatabaseConnection,
}

/// Basic authentication against the `users` table.
///
/// On success the user row is stored in the request extensions for the
/// handlers.
async fn auth(
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let credentials = request
        .headers()
        .typed_get::<Authorization<Basic>>()
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if credentials.username().is_empty() || credentials.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user: Option<user::Model> = user::Entity::find()
        .filter(user::Column::Username.eq(credentials.username()))
        .filter(user::Column::Password.eq(credentials.password()))
        .one(&state.db)
        .await
        .map_err(|err| {
            tracing::error!("auth lookup failed: {err}");
            StatusCode::UNAUTHORIZED
        })?;

    let Some(user) = user else {
        tracing::debug!("rejected credentials for {}", credentials.username());
        return Err(StatusCode::UNAUTHORIZED);
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/me", get(user::me))
        .route("/me/coins", get(user::coins))
        .route("/me/stats", get(user::stats))
        .route("/me/achievements", get(user::achievements))
        .route("/boxes", get(boxes::list).post(boxes::box_new))
        .route(
            "/boxes/{id}",
            get(boxes::detail).patch(boxes::set_active),
        )
        .route("/boxes/{id}/cards", post(boxes::card_new))
        .route("/boxes/{id}/open", post(boxes::open))
        .route("/pulls", get(pulls::list))
        .route("/pulls/{id}/sell", post(pulls::sell))
        .route("/battles", get(battles::list).post(battles::battle_new))
        .route("/battles/{id}", get(battles::detail))
        .route("/battles/{id}/join", post(battles::join))
        .route("/battles/{id}/leave", post(battles::leave))
        .route("/battles/{id}/cancel", post(battles::cancel))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

pub async fn run_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
        db,
    };

    axum::serve(listener, router(state)).await
}
