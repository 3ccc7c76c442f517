//! Achievement catalog and the table of unlocks.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Value at which a single card counts as a big hit.
pub const BIG_HIT_VALUE: i64 = 1000;

/// Pulls needed for [`Achievement::Collector`].
pub const COLLECTOR_PULLS: u64 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Achievement {
    FirstPull,
    Collector,
    BigHit,
    FirstBattleWin,
}

impl Achievement {
    pub const ALL: [Achievement; 4] = [
        Self::FirstPull,
        Self::Collector,
        Self::BigHit,
        Self::FirstBattleWin,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Self::FirstPull => "first_pull",
            Self::Collector => "collector",
            Self::BigHit => "big_hit",
            Self::FirstBattleWin => "first_battle_win",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::FirstPull => "First pull",
            Self::Collector => "Collector",
            Self::BigHit => "Big hit",
            Self::FirstBattleWin => "Champion",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::FirstPull => "Open your first pack",
            Self::Collector => "Pull 100 cards",
            Self::BigHit => "Pull a card worth 1000 coins or more",
            Self::FirstBattleWin => "Win a battle",
        }
    }

    /// Coins paid out on unlock.
    pub fn reward(self) -> i64 {
        match self {
            Self::FirstPull => 10,
            Self::Collector => 100,
            Self::BigHit => 50,
            Self::FirstBattleWin => 25,
        }
    }
}

impl TryFrom<&str> for Achievement {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|a| a.code() == value)
            .ok_or_else(|| EngineError::InvalidInput(format!("invalid achievement: {value}")))
    }
}

/// Progress counters an unlock is evaluated against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AchievementProgress {
    pub pulls_drawn: u64,
    pub best_card_value: i64,
    pub battles_won: u64,
}

impl AchievementProgress {
    pub fn satisfies(&self, achievement: Achievement) -> bool {
        match achievement {
            Achievement::FirstPull => self.pulls_drawn >= 1,
            Achievement::Collector => self.pulls_drawn >= COLLECTOR_PULLS,
            Achievement::BigHit => self.best_card_value >= BIG_HIT_VALUE,
            Achievement::FirstBattleWin => self.battles_won >= 1,
        }
    }
}

/// An achievement with the user's unlock time, if any.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AchievementState {
    pub achievement: Achievement,
    pub unlocked_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "user_achievements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub code: String,
    pub unlocked_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
