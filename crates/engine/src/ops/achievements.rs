use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, Statement, TransactionTrait, prelude::*,
};

use crate::{
    Achievement, AchievementProgress, AchievementState, CoinTransactionKind, ResultEngine,
    achievements,
};

use super::{Engine, with_tx};

impl Engine {
    /// The achievement catalog with the user's unlock state.
    pub async fn achievements(&self, username: &str) -> ResultEngine<Vec<AchievementState>> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, username).await?;
            let unlocked = self.unlocked_achievements(&db_tx, username).await?;
            Ok(Achievement::ALL
                .into_iter()
                .map(|achievement| AchievementState {
                    achievement,
                    unlocked_at: unlocked.get(&achievement).copied(),
                })
                .collect())
        })
    }

    async fn unlocked_achievements(
        &self,
        db: &DatabaseTransaction,
        username: &str,
    ) -> ResultEngine<HashMap<Achievement, chrono::DateTime<Utc>>> {
        let rows = achievements::Entity::find()
            .filter(achievements::Column::UserId.eq(username.to_string()))
            .all(db)
            .await?;
        let mut out = HashMap::with_capacity(rows.len());
        for row in rows {
            // Codes from a retired catalog entry are ignored.
            if let Ok(achievement) = Achievement::try_from(row.code.as_str()) {
                out.insert(achievement, row.unlocked_at);
            }
        }
        Ok(out)
    }

    pub(super) async fn achievement_progress(
        &self,
        db: &DatabaseTransaction,
        username: &str,
    ) -> ResultEngine<AchievementProgress> {
        let backend = db.get_database_backend();

        let stmt = Statement::from_sql_and_values(
            backend,
            "SELECT COUNT(p.id) AS pulls, COALESCE(MAX(c.coin_value), 0) AS best \
             FROM pulls p JOIN cards c ON c.id = p.card_id \
             WHERE p.pulled_by = ?",
            [username.into()],
        );
        let row = db.query_one(stmt).await?;
        let pulls: i64 = row
            .as_ref()
            .map(|r| r.try_get("", "pulls"))
            .transpose()?
            .unwrap_or(0);
        let best: i64 = row
            .as_ref()
            .map(|r| r.try_get("", "best"))
            .transpose()?
            .unwrap_or(0);

        let stmt = Statement::from_sql_and_values(
            backend,
            "SELECT COUNT(id) AS won FROM battles WHERE winner_id = ?",
            [username.into()],
        );
        let won: i64 = db
            .query_one(stmt)
            .await?
            .map(|r| r.try_get("", "won"))
            .transpose()?
            .unwrap_or(0);

        Ok(AchievementProgress {
            pulls_drawn: u64::try_from(pulls).unwrap_or(0),
            best_card_value: best,
            battles_won: u64::try_from(won).unwrap_or(0),
        })
    }

    /// Unlock whatever the user now qualifies for and pay the rewards.
    ///
    /// Must run inside the transaction that changed the user's progress.
    pub(super) async fn evaluate_achievements(
        &self,
        db: &DatabaseTransaction,
        username: &str,
    ) -> ResultEngine<Vec<Achievement>> {
        let progress = self.achievement_progress(db, username).await?;
        let unlocked = self.unlocked_achievements(db, username).await?;

        let mut fresh = Vec::new();
        for achievement in Achievement::ALL {
            if unlocked.contains_key(&achievement) || !progress.satisfies(achievement) {
                continue;
            }
            achievements::ActiveModel {
                user_id: ActiveValue::Set(username.to_string()),
                code: ActiveValue::Set(achievement.code().to_string()),
                unlocked_at: ActiveValue::Set(Utc::now()),
            }
            .insert(db)
            .await?;
            self.credit(
                db,
                username,
                achievement.reward(),
                CoinTransactionKind::Achievement,
                Some(achievement.code().to_string()),
            )
            .await?;
            tracing::info!("{username} unlocked achievement {}", achievement.code());
            fresh.push(achievement);
        }
        Ok(fresh)
    }
}
