//! The module contains the error the engine can throw.
//!
//! The errors are:
//!
//! - [`InsufficientFunds`] thrown when a user cannot pay for a pack or a battle.
//! - [`KeyNotFound`] thrown when an item is not found.
//! - [`EmptyPool`] thrown when a box has nothing that can be drawn.
//!
//!  [`InsufficientFunds`]: EngineError::InsufficientFunds
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`EmptyPool`]: EngineError::EmptyPool
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Empty pool: {0}")]
    EmptyPool(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Errors worth retrying: only the database can fail transiently.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InsufficientFunds(a), Self::InsufficientFunds(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidInput(a), Self::InvalidInput(b)) => a == b,
            (Self::InvalidState(a), Self::InvalidState(b)) => a == b,
            (Self::EmptyPool(a), Self::EmptyPool(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::InvalidCursor(a), Self::InvalidCursor(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
