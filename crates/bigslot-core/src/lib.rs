//! # bigslot-core — Shared types for the BigSlot engine
//!
//! Identifiers, currency amounts and the error taxonomy used by every
//! other BigSlot crate.

pub mod error;

pub use error::*;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Coin and gem amounts. Currency is always integral.
pub type Amount = u64;

/// Identifier of a symbol registered in a symbol catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolId(pub u32);

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The two currencies a player holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Currency {
    /// Run-scoped currency, spent on spins and temporary upgrades
    Coins,
    /// Meta currency, survives run resets
    Gems,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Coins => f.write_str("coins"),
            Currency::Gems => f.write_str("gems"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_id_serializes_as_number() {
        let json = serde_json::to_string(&SymbolId(7)).unwrap();
        assert_eq!(json, "7");
        let back: SymbolId = serde_json::from_str("7").unwrap();
        assert_eq!(back, SymbolId(7));
    }

    #[test]
    fn test_currency_display() {
        assert_eq!(Currency::Coins.to_string(), "coins");
        assert_eq!(Currency::Gems.to_string(), "gems");
    }
}
