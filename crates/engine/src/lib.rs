//! Pack Attack engine.
//!
//! Domain types, sea-orm entities and every operation of the service. The
//! [`Engine`] is stateless apart from its database handle and RNG; each
//! operation runs in its own database transaction.

pub use achievements::{Achievement, AchievementProgress, AchievementState};
pub use battles::{Battle, BattleMode, BattleStatus, Participant};
pub use boxes::PackBox;
pub use cards::{Card, CardNew, MAX_CARD_VALUE};
pub use coin_transactions::{CoinTransaction, CoinTransactionKind};
pub use error::EngineError;
pub use ops::{
    BattleDetail, BoxDetail, CardOdds, CollectionStats, Engine, EngineBuilder, PackOpening,
    PullListFilter, PullPage,
};
pub use pulls::{Pull, PullStatus, PulledCard};
pub use retry::{RetryPolicy, with_retry};
pub use users::User;

pub mod draw;

mod achievements;
mod battle_participants;
mod battles;
mod boxes;
mod cards;
mod coin_transactions;
mod error;
mod ops;
mod pulls;
mod retry;
mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
