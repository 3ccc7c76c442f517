use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    CoinTransaction, CoinTransactionKind, EngineError, ResultEngine, User, coin_transactions,
    users, util::normalize_optional_text,
};

use super::{Engine, with_tx};

/// Most ledger rows returned by a single history call.
const MAX_HISTORY: u64 = 200;

impl Engine {
    /// Create a user with an empty balance.
    pub async fn new_user(&self, username: &str, password: &str, is_admin: bool) -> ResultEngine<User> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(EngineError::InvalidInput(
                "username and password must not be empty".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            if users::Entity::find_by_id(username.to_string())
                .one(&db_tx)
                .await?
                .is_some()
            {
                return Err(EngineError::ExistingKey(username.to_string()));
            }
            let model = users::ActiveModel {
                username: ActiveValue::Set(username.to_string()),
                password: ActiveValue::Set(password.to_string()),
                coins: ActiveValue::Set(0),
                is_admin: ActiveValue::Set(is_admin),
                created_at: ActiveValue::Set(Utc::now()),
            }
            .insert(&db_tx)
            .await?;
            tracing::info!("created user {username}");
            Ok(User::from(model))
        })
    }

    /// Return the user profile with its current balance.
    pub async fn user(&self, username: &str) -> ResultEngine<User> {
        with_tx!(self, |db_tx| {
            let model = self.require_user(&db_tx, username).await?;
            Ok(User::from(model))
        })
    }

    /// Credit coins from outside the game (operator grant).
    ///
    /// Returns the new balance.
    pub async fn grant_coins(
        &self,
        username: &str,
        amount: i64,
        reason: Option<&str>,
    ) -> ResultEngine<i64> {
        if amount <= 0 {
            return Err(EngineError::InvalidInput(
                "granted amount must be > 0".to_string(),
            ));
        }
        let reason = normalize_optional_text(reason);
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, username).await?;
            let balance = self
                .credit(&db_tx, username, amount, CoinTransactionKind::Grant, reason)
                .await?;
            tracing::info!("granted {amount} coins to {username}");
            Ok(balance)
        })
    }

    /// Ledger rows of a user, newest first.
    pub async fn coin_history(
        &self,
        username: &str,
        limit: u64,
    ) -> ResultEngine<Vec<CoinTransaction>> {
        let limit = limit.clamp(1, MAX_HISTORY);
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, username).await?;
            let rows = coin_transactions::Entity::find()
                .filter(coin_transactions::Column::UserId.eq(username.to_string()))
                .order_by_desc(coin_transactions::Column::CreatedAt)
                .order_by_desc(coin_transactions::Column::Id)
                .limit(limit)
                .all(&db_tx)
                .await?;
            rows.into_iter().map(CoinTransaction::try_from).collect()
        })
    }

    /// Take `amount` coins from a user, failing if the balance is too low.
    ///
    /// The check and the decrement are a single conditional UPDATE. Returns
    /// the new balance.
    pub(super) async fn debit(
        &self,
        db: &DatabaseTransaction,
        username: &str,
        amount: i64,
        kind: CoinTransactionKind,
        reference: Option<String>,
    ) -> ResultEngine<i64> {
        if amount < 0 {
            return Err(EngineError::InvalidInput(
                "debit amount must be >= 0".to_string(),
            ));
        }
        let updated = users::Entity::update_many()
            .col_expr(
                users::Column::Coins,
                Expr::col(users::Column::Coins).sub(amount),
            )
            .filter(users::Column::Username.eq(username.to_string()))
            .filter(users::Column::Coins.gte(amount))
            .exec(db)
            .await?;
        if updated.rows_affected == 0 {
            let user = self.require_user(db, username).await?;
            return Err(EngineError::InsufficientFunds(format!(
                "{username} has {} coins, needs {amount}",
                user.coins
            )));
        }
        self.record(db, username, -amount, kind, reference).await
    }

    /// Give `amount` coins to a user. Returns the new balance.
    pub(super) async fn credit(
        &self,
        db: &DatabaseTransaction,
        username: &str,
        amount: i64,
        kind: CoinTransactionKind,
        reference: Option<String>,
    ) -> ResultEngine<i64> {
        if amount < 0 {
            return Err(EngineError::InvalidInput(
                "credit amount must be >= 0".to_string(),
            ));
        }
        let updated = users::Entity::update_many()
            .col_expr(
                users::Column::Coins,
                Expr::col(users::Column::Coins).add(amount),
            )
            .filter(users::Column::Username.eq(username.to_string()))
            .exec(db)
            .await?;
        if updated.rows_affected == 0 {
            return Err(EngineError::KeyNotFound("user not exists".to_string()));
        }
        self.record(db, username, amount, kind, reference).await
    }

    async fn record(
        &self,
        db: &DatabaseTransaction,
        username: &str,
        amount: i64,
        kind: CoinTransactionKind,
        reference: Option<String>,
    ) -> ResultEngine<i64> {
        let balance_after = self.require_user(db, username).await?.coins;
        let entry = CoinTransaction {
            id: Uuid::new_v4(),
            user_id: username.to_string(),
            kind,
            amount,
            balance_after,
            reference,
            created_at: Utc::now(),
        };
        coin_transactions::ActiveModel::from(&entry)
            .insert(db)
            .await?;
        Ok(balance_after)
    }
}
