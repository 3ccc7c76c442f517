//! Users table.
//!
//! The engine keys everything by `username`. `coins` is the in-app balance and
//! only changes together with a row in the coin ledger.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// A user profile with its coin balance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub coins: i64,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub username: String,
    pub password: String,
    pub coins: i64,
    pub is_admin: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for User {
    fn from(model: Model) -> Self {
        Self {
            username: model.username,
            coins: model.coins,
            is_admin: model.is_admin,
            created_at: model.created_at,
        }
    }
}
