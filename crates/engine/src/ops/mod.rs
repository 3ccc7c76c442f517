use std::sync::{Mutex, PoisonError};

use rand::{SeedableRng, rngs::StdRng};
use sea_orm::DatabaseConnection;

mod access;
mod achievements;
mod battles;
mod catalog;
mod coins;
mod packs;
mod pulls;

pub use battles::BattleDetail;
pub use catalog::{BoxDetail, CardOdds};
pub use packs::PackOpening;
pub use pulls::{CollectionStats, PullListFilter, PullPage};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

pub struct Engine {
    database: DatabaseConnection,
    rng: Mutex<StdRng>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Run `f` with the engine RNG.
    ///
    /// The lock is released before returning, so it is never held across an
    /// `.await`.
    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    rng_seed: Option<u64>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Seed the draw RNG, making pack openings and battles reproducible.
    pub fn rng_seed(mut self, seed: Option<u64>) -> EngineBuilder {
        self.rng_seed = seed;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> crate::ResultEngine<Engine> {
        let rng = match self.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Engine {
            database: self.database,
            rng: Mutex::new(rng),
        })
    }
}
