use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

pub mod user {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Me {
        pub username: String,
        pub coins: i64,
        pub is_admin: bool,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum CoinTransactionKind {
        Grant,
        PackPurchase,
        BattleEntry,
        BattleRefund,
        Sale,
        Achievement,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct CoinHistoryQuery {
        pub limit: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CoinTransactionView {
        pub id: Uuid,
        pub kind: CoinTransactionKind,
        /// Signed: negative for payments, positive for credits.
        pub amount: i64,
        pub balance_after: i64,
        pub reference: Option<String>,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CoinHistoryResponse {
        pub balance: i64,
        pub transactions: Vec<CoinTransactionView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CollectionStats {
        pub pulls_owned: u64,
        pub kept_value: i64,
        pub sold_value: i64,
        pub battles_played: u64,
        pub battles_won: u64,
    }
}

pub mod boxes {
    use super::*;

    /// A card definition, as sent by an administrator.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct CardNew {
        pub name: String,
        /// Defaults to `common`.
        pub rarity: Option<String>,
        pub coin_value: i64,
        /// Relative weight; probabilities are `pull_rate / sum(pull_rate)`.
        pub pull_rate: f64,
        pub image_url: Option<String>,
    }

    /// A box definition with its card pool.
    ///
    /// Also the file format of the admin `box import` command.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct BoxNew {
        pub name: String,
        pub description: Option<String>,
        pub price: i64,
        pub cards_per_pack: i32,
        pub cards: Vec<CardNew>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BoxCreated {
        pub id: Uuid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BoxUpdate {
        pub active: bool,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct BoxListQuery {
        pub include_inactive: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BoxView {
        pub id: Uuid,
        pub name: String,
        pub description: Option<String>,
        pub price: i64,
        pub cards_per_pack: i32,
        pub active: bool,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BoxListResponse {
        pub boxes: Vec<BoxView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CardView {
        pub id: Uuid,
        pub box_id: Uuid,
        pub name: String,
        pub rarity: String,
        pub coin_value: i64,
        pub pull_rate: f64,
        pub image_url: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CardOddsView {
        #[serde(flatten)]
        pub card: CardView,
        /// Chance of drawing this card on each draw, in `[0, 1]`.
        pub probability: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BoxDetailResponse {
        #[serde(flatten)]
        pub pack_box: BoxView,
        pub cards: Vec<CardOddsView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OpenPacks {
        /// Defaults to 1.
        pub quantity: Option<u32>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PackOpeningResponse {
        pub box_id: Uuid,
        pub quantity: u32,
        pub cost: i64,
        pub total_value: i64,
        pub balance: i64,
        pub pulls: Vec<super::pull::PullView>,
        /// Codes of the achievements unlocked by this opening.
        pub unlocked: Vec<String>,
    }
}

pub mod pull {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum PullStatus {
        Kept,
        Sold,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct PullListQuery {
        pub status: Option<PullStatus>,
        pub box_id: Option<Uuid>,
        /// Opaque pagination cursor (base64), from `next_cursor`.
        pub cursor: Option<String>,
        pub limit: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PullView {
        pub id: Uuid,
        pub owner: String,
        pub pulled_by: String,
        pub status: PullStatus,
        pub battle_id: Option<Uuid>,
        pub round: Option<i32>,
        pub created_at: DateTime<Utc>,
        pub card: super::boxes::CardView,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PullListResponse {
        pub pulls: Vec<PullView>,
        /// Opaque cursor for fetching the next page (older items).
        pub next_cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PullSold {
        pub id: Uuid,
        pub balance: i64,
    }
}

pub mod battle {
    use super::*;

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum BattleMode {
        #[default]
        Highest,
        Lowest,
        Random,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum BattleStatus {
        Open,
        Finished,
        Cancelled,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BattleNew {
        pub box_id: Uuid,
        pub rounds: i32,
        pub max_participants: i32,
        #[serde(default)]
        pub mode: BattleMode,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct BattleListQuery {
        pub status: Option<BattleStatus>,
        pub limit: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BattleView {
        pub id: Uuid,
        pub creator: String,
        pub box_id: Uuid,
        pub rounds: i32,
        pub max_participants: i32,
        pub mode: BattleMode,
        pub status: BattleStatus,
        pub entry_fee: i64,
        pub winner: Option<String>,
        pub created_at: DateTime<Utc>,
        pub finished_at: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BattleListResponse {
        pub battles: Vec<BattleView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ParticipantView {
        pub username: String,
        pub seat: i32,
        pub total_value: i64,
        pub joined_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BattleDetailResponse {
        #[serde(flatten)]
        pub battle: BattleView,
        pub participants: Vec<ParticipantView>,
        pub pulls: Vec<super::pull::PullView>,
    }
}

pub mod achievement {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AchievementView {
        pub code: String,
        pub title: String,
        pub description: String,
        pub reward: i64,
        pub unlocked_at: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AchievementsResponse {
        pub achievements: Vec<AchievementView>,
    }
}
