//! Battles: several users open the same packs and the best (or worst) haul
//! takes every card.

use chrono::{DateTime, Utc};
use rand::Rng;
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, util::parse_uuid};

pub const MIN_PARTICIPANTS: i32 = 2;
pub const MAX_PARTICIPANTS: i32 = 4;
pub const MAX_ROUNDS: i32 = 10;

/// How the winner of a battle is chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleMode {
    /// Highest total value wins.
    #[default]
    Highest,
    /// Lowest total value wins.
    Lowest,
    /// Any participant, uniformly at random.
    Random,
}

impl BattleMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Highest => "highest",
            Self::Lowest => "lowest",
            Self::Random => "random",
        }
    }

    /// Index of the winning entry in `totals`, which must be in seat order.
    ///
    /// Ties go to the earliest seat. Returns `None` for an empty slice.
    pub fn pick_winner<R: Rng + ?Sized>(self, totals: &[i64], rng: &mut R) -> Option<usize> {
        if totals.is_empty() {
            return None;
        }
        let winner = match self {
            Self::Highest => totals
                .iter()
                .enumerate()
                .fold(0, |best, (i, total)| if *total > totals[best] { i } else { best }),
            Self::Lowest => totals
                .iter()
                .enumerate()
                .fold(0, |best, (i, total)| if *total < totals[best] { i } else { best }),
            Self::Random => rng.random_range(0..totals.len()),
        };
        Some(winner)
    }
}

impl TryFrom<&str> for BattleMode {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "highest" => Ok(Self::Highest),
            "lowest" => Ok(Self::Lowest),
            "random" => Ok(Self::Random),
            other => Err(EngineError::InvalidInput(format!(
                "invalid battle mode: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleStatus {
    Open,
    Finished,
    Cancelled,
}

impl BattleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Finished => "finished",
            Self::Cancelled => "cancelled",
        }
    }
}

impl TryFrom<&str> for BattleStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "open" => Ok(Self::Open),
            "finished" => Ok(Self::Finished),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::InvalidInput(format!(
                "invalid battle status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Battle {
    pub id: Uuid,
    pub creator_id: String,
    pub box_id: Uuid,
    pub rounds: i32,
    pub max_participants: i32,
    pub mode: BattleMode,
    pub status: BattleStatus,
    /// Coins each participant pays to take a seat.
    pub entry_fee: i64,
    pub winner_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Battle {
    pub fn new(
        creator_id: String,
        box_id: Uuid,
        box_price: i64,
        rounds: i32,
        max_participants: i32,
        mode: BattleMode,
    ) -> ResultEngine<Self> {
        if !(1..=MAX_ROUNDS).contains(&rounds) {
            return Err(EngineError::InvalidInput(format!(
                "rounds must be between 1 and {MAX_ROUNDS}"
            )));
        }
        if !(MIN_PARTICIPANTS..=MAX_PARTICIPANTS).contains(&max_participants) {
            return Err(EngineError::InvalidInput(format!(
                "max_participants must be between {MIN_PARTICIPANTS} and {MAX_PARTICIPANTS}"
            )));
        }
        let entry_fee = box_price
            .checked_mul(i64::from(rounds))
            .ok_or_else(|| EngineError::InvalidInput("entry fee overflows".to_string()))?;

        Ok(Self {
            id: Uuid::new_v4(),
            creator_id,
            box_id,
            rounds,
            max_participants,
            mode,
            status: BattleStatus::Open,
            entry_fee,
            winner_id: None,
            created_at: Utc::now(),
            finished_at: None,
        })
    }
}

/// A seated participant and the value of what they pulled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Participant {
    pub user_id: String,
    pub seat: i32,
    pub total_value: i64,
    pub joined_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "battles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub creator_id: String,
    pub box_id: String,
    pub rounds: i32,
    pub max_participants: i32,
    pub mode: String,
    pub status: String,
    pub entry_fee: i64,
    pub winner_id: Option<String>,
    pub created_at: DateTimeUtc,
    pub finished_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::battle_participants::Entity")]
    Participants,
}

impl Related<super::battle_participants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Participants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Battle> for ActiveModel {
    fn from(value: &Battle) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            creator_id: ActiveValue::Set(value.creator_id.clone()),
            box_id: ActiveValue::Set(value.box_id.to_string()),
            rounds: ActiveValue::Set(value.rounds),
            max_participants: ActiveValue::Set(value.max_participants),
            mode: ActiveValue::Set(value.mode.as_str().to_string()),
            status: ActiveValue::Set(value.status.as_str().to_string()),
            entry_fee: ActiveValue::Set(value.entry_fee),
            winner_id: ActiveValue::Set(value.winner_id.clone()),
            created_at: ActiveValue::Set(value.created_at),
            finished_at: ActiveValue::Set(value.finished_at),
        }
    }
}

impl TryFrom<Model> for Battle {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "battle")?,
            creator_id: model.creator_id,
            box_id: parse_uuid(&model.box_id, "box")?,
            rounds: model.rounds,
            max_participants: model.max_participants,
            mode: BattleMode::try_from(model.mode.as_str())?,
            status: BattleStatus::try_from(model.status.as_str())?,
            entry_fee: model.entry_fee,
            winner_id: model.winner_id,
            created_at: model.created_at,
            finished_at: model.finished_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn highest_and_lowest_break_ties_by_seat() {
        let mut rng = StdRng::seed_from_u64(1);
        let totals = [300, 900, 900, 100, 100];
        assert_eq!(BattleMode::Highest.pick_winner(&totals, &mut rng), Some(1));
        assert_eq!(BattleMode::Lowest.pick_winner(&totals, &mut rng), Some(3));
    }

    #[test]
    fn random_picks_every_seat_eventually() {
        let mut rng = StdRng::seed_from_u64(42);
        let totals = [10, 20, 30];
        let mut seen = [false; 3];
        for _ in 0..200 {
            let winner = BattleMode::Random.pick_winner(&totals, &mut rng).unwrap();
            seen[winner] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn no_participants_no_winner() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(BattleMode::Highest.pick_winner(&[], &mut rng), None);
    }

    #[test]
    fn entry_fee_is_price_times_rounds() {
        let battle = Battle::new(
            "alice".to_string(),
            Uuid::new_v4(),
            150,
            3,
            2,
            BattleMode::Highest,
        )
        .unwrap();
        assert_eq!(battle.entry_fee, 450);
        assert_eq!(battle.status, BattleStatus::Open);
    }

    #[test]
    fn rejects_out_of_range_settings() {
        let id = Uuid::new_v4();
        assert!(Battle::new("a".into(), id, 10, 0, 2, BattleMode::Highest).is_err());
        assert!(Battle::new("a".into(), id, 10, MAX_ROUNDS + 1, 2, BattleMode::Highest).is_err());
        assert!(Battle::new("a".into(), id, 10, 1, 1, BattleMode::Highest).is_err());
        assert!(Battle::new("a".into(), id, 10, 1, MAX_PARTICIPANTS + 1, BattleMode::Lowest).is_err());
    }

    #[test]
    fn mode_round_trips_through_storage_string() {
        for mode in [BattleMode::Highest, BattleMode::Lowest, BattleMode::Random] {
            assert_eq!(BattleMode::try_from(mode.as_str()).unwrap(), mode);
        }
        assert!(BattleMode::try_from("crazy").is_err());
    }
}
