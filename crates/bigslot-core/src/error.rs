//! Error types for BigSlot

use thiserror::Error;

use crate::{Amount, Currency, SymbolId};

/// Core error type
///
/// Expected gameplay conditions (`InsufficientFunds`, `NoSpinsRemaining`,
/// `RunComplete`, `UpgradeMaxed`) are returned to the caller with the game
/// state untouched. Data bugs (`UnknownSymbol`, `InvalidConfiguration`)
/// surface from constructors and validation so startup stops early.
#[derive(Error, Debug)]
pub enum SlotError {
    #[error("Insufficient {currency}: need {required}, have {available}")]
    InsufficientFunds {
        currency: Currency,
        required: Amount,
        available: Amount,
    },

    #[error("No spins remaining")]
    NoSpinsRemaining,

    #[error("Run complete, start a new run")]
    RunComplete,

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(SymbolId),

    #[error("Unknown upgrade: {0}")]
    UnknownUpgrade(String),

    #[error("Upgrade already at max level: {0}")]
    UpgradeMaxed(String),

    #[error("No drawable symbols: unlocked set is empty or has zero total weight")]
    EmptyDrawPool,

    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Corrupt persisted state: {0}")]
    CorruptPersistedState(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SlotError {
    /// Conditions a player can trigger during normal play
    pub fn is_gameplay(&self) -> bool {
        matches!(
            self,
            SlotError::InsufficientFunds { .. }
                | SlotError::NoSpinsRemaining
                | SlotError::RunComplete
                | SlotError::UpgradeMaxed(_)
        )
    }

    /// Shorthand for an `InvalidConfiguration` error
    pub fn config(msg: impl Into<String>) -> Self {
        SlotError::InvalidConfiguration(msg.into())
    }
}

/// Result type alias
pub type SlotResult<T> = Result<T, SlotError>;
