use api_types::ErrorBody;
use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use engine::EngineError;

pub use server::{ServerState, router, run_with_listener};

mod battles;
mod boxes;
mod pulls;
mod server;
mod user;
mod views;

pub mod types {
    pub mod user {
        pub use api_types::user::{
            CoinHistoryQuery, CoinHistoryResponse, CoinTransactionKind, CoinTransactionView,
            CollectionStats, Me,
        };
    }

    pub mod boxes {
        pub use api_types::boxes::{
            BoxCreated, BoxDetailResponse, BoxListQuery, BoxListResponse, BoxNew, BoxUpdate,
            BoxView, CardNew, CardOddsView, CardView, OpenPacks, PackOpeningResponse,
        };
    }

    pub mod pull {
        pub use api_types::pull::{PullListQuery, PullListResponse, PullSold, PullStatus, PullView};
    }

    pub mod battle {
        pub use api_types::battle::{
            BattleDetailResponse, BattleListQuery, BattleListResponse, BattleMode, BattleNew,
            BattleStatus, BattleView, ParticipantView,
        };
    }

    pub mod achievement {
        pub use api_types::achievement::{AchievementView, AchievementsResponse};
    }
}

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::InvalidInput(_) | EngineError::InvalidCursor(_) => StatusCode::BAD_REQUEST,
        EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_) => StatusCode::CONFLICT,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::InsufficientFunds(_)
        | EngineError::InvalidState(_)
        | EngineError::EmptyPool(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(ErrorBody { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<JsonRejection> for ServerError {
    fn from(value: JsonRejection) -> Self {
        Self::Generic(value.body_text())
    }
}

impl From<QueryRejection> for ServerError {
    fn from(value: QueryRejection) -> Self {
        Self::Generic(value.body_text())
    }
}

impl From<PathRejection> for ServerError {
    fn from(value: PathRejection) -> Self {
        Self::Generic(value.body_text())
    }
}

/// Request extractors whose failures answer with the JSON error body.
pub(crate) type JsonBody<T> = WithRejection<Json<T>, ServerError>;
pub(crate) type QueryParams<T> = WithRejection<axum::extract::Query<T>, ServerError>;
pub(crate) type PathParam<T> = WithRejection<axum::extract::Path<T>, ServerError>;

#[cfg(test)]
mod tests {
    use sea_orm::DbErr;

    use super::*;

    fn status_of(err: EngineError) -> StatusCode {
        ServerError::from(err).into_response().status()
    }

    #[test]
    fn engine_forbidden_maps_to_403() {
        assert_eq!(
            status_of(EngineError::Forbidden("forbidden".to_string())),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn engine_not_found_maps_to_404() {
        assert_eq!(
            status_of(EngineError::KeyNotFound("x".to_string())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn engine_conflict_maps_to_409() {
        assert_eq!(
            status_of(EngineError::ExistingKey("x".to_string())),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn bad_input_and_cursor_map_to_400() {
        assert_eq!(
            status_of(EngineError::InvalidInput("x".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(EngineError::InvalidCursor("x".to_string())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn business_rules_map_to_422() {
        for err in [
            EngineError::InsufficientFunds("x".to_string()),
            EngineError::InvalidState("x".to_string()),
            EngineError::EmptyPool("x".to_string()),
        ] {
            assert_eq!(status_of(err), StatusCode::UNPROCESSABLE_ENTITY);
        }
    }

    #[test]
    fn database_errors_map_to_500() {
        assert_eq!(
            status_of(EngineError::Database(DbErr::Custom("boom".to_string()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn generic_maps_to_400() {
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
