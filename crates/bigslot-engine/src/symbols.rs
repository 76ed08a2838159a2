//! Symbol definitions and the symbol catalog

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use bigslot_core::{Amount, SlotError, SlotResult, SymbolId};

/// Symbol type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    /// Regular paying symbol
    Regular,
    /// Wild - substitutes for the anchor of a line
    Wild,
    /// Scatter - pays on count anywhere in a line
    Scatter,
}

/// A symbol definition
///
/// `rarity_weight` is a share of the weighted draw: larger means more
/// common. A weight of zero keeps the symbol in the catalog but it is
/// never drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    /// Unique symbol ID
    pub id: SymbolId,
    /// Symbol name (e.g., "cherry", "wild")
    pub name: String,
    /// Symbol type
    pub kind: SymbolKind,
    /// Draw weight
    pub rarity_weight: u32,
    /// Coins per spin-cost unit for a 3-of-a-kind
    pub base_payout: Amount,
    /// Key used by the presentation layer to pick a sprite
    pub display_key: String,
}

impl Symbol {
    /// Create a regular symbol
    pub fn regular(id: u32, name: &str, rarity_weight: u32, base_payout: Amount) -> Self {
        Self {
            id: SymbolId(id),
            name: name.to_string(),
            kind: SymbolKind::Regular,
            rarity_weight,
            base_payout,
            display_key: format!("symbol_{name}"),
        }
    }

    /// Create a wild symbol
    pub fn wild(id: u32, name: &str, rarity_weight: u32) -> Self {
        Self {
            kind: SymbolKind::Wild,
            ..Self::regular(id, name, rarity_weight, 0)
        }
    }

    /// Create a scatter symbol
    pub fn scatter(id: u32, name: &str, rarity_weight: u32) -> Self {
        Self {
            kind: SymbolKind::Scatter,
            ..Self::regular(id, name, rarity_weight, 0)
        }
    }

    /// Can this symbol anchor a paying line?
    pub fn pays(&self) -> bool {
        self.base_payout > 0
    }

    /// Check if this is a special symbol (wild, scatter)
    pub fn is_special(&self) -> bool {
        !matches!(self.kind, SymbolKind::Regular)
    }
}

/// Ids of the standard symbol table
pub mod ids {
    use bigslot_core::SymbolId;

    pub const CHERRY: SymbolId = SymbolId(1);
    pub const LEMON: SymbolId = SymbolId(2);
    pub const ORANGE: SymbolId = SymbolId(3);
    pub const PLUM: SymbolId = SymbolId(4);
    pub const BELL: SymbolId = SymbolId(5);
    pub const BAR: SymbolId = SymbolId(6);
    pub const SEVEN: SymbolId = SymbolId(7);
    pub const DIAMOND: SymbolId = SymbolId(8);
    pub const WILD: SymbolId = SymbolId(9);
    pub const SCATTER: SymbolId = SymbolId(10);
}

/// Symbols unlocked at the start of every run
pub const STARTER_SYMBOLS: [SymbolId; 5] = [ids::CHERRY, ids::LEMON, ids::ORANGE, ids::PLUM, ids::BELL];

/// Standard ten-symbol table
pub fn standard_symbols() -> Vec<Symbol> {
    vec![
        Symbol::regular(1, "cherry", 80, 2),
        Symbol::regular(2, "lemon", 75, 3),
        Symbol::regular(3, "orange", 70, 4),
        Symbol::regular(4, "plum", 60, 5),
        Symbol::regular(5, "bell", 40, 8),
        Symbol::regular(6, "bar", 30, 12),
        Symbol::regular(7, "seven", 15, 25),
        Symbol::regular(8, "diamond", 5, 100),
        Symbol::wild(9, "wild", 10),
        Symbol::scatter(10, "scatter", 12),
    ]
}

/// Immutable symbol table, fixed once built
#[derive(Debug, Clone)]
pub struct SymbolCatalog {
    symbols: Vec<Symbol>,
    index: HashMap<SymbolId, usize>,
    wild_id: Option<SymbolId>,
    scatter_id: Option<SymbolId>,
}

impl SymbolCatalog {
    /// Build a catalog, rejecting inconsistent tables
    pub fn new(symbols: Vec<Symbol>) -> SlotResult<Self> {
        if symbols.is_empty() {
            return Err(SlotError::config("symbol catalog is empty"));
        }

        let mut seen = HashSet::with_capacity(symbols.len());
        for symbol in &symbols {
            if !seen.insert(symbol.id) {
                return Err(SlotError::config(format!("duplicate symbol id {}", symbol.id)));
            }
            if symbol.is_special() && symbol.base_payout != 0 {
                return Err(SlotError::config(format!(
                    "special symbol '{}' must have base payout 0",
                    symbol.name
                )));
            }
        }

        for kind in [SymbolKind::Wild, SymbolKind::Scatter] {
            let count = symbols.iter().filter(|s| s.kind == kind).count();
            if count > 1 {
                return Err(SlotError::config(format!("more than one {kind:?} symbol")));
            }
        }

        Ok(Self::index(symbols))
    }

    /// The standard catalog
    pub fn standard() -> Self {
        Self::index(standard_symbols())
    }

    fn index(symbols: Vec<Symbol>) -> Self {
        let index = symbols.iter().enumerate().map(|(i, s)| (s.id, i)).collect();
        let find = |kind| symbols.iter().find(|s| s.kind == kind).map(|s| s.id);
        let wild_id = find(SymbolKind::Wild);
        let scatter_id = find(SymbolKind::Scatter);
        Self {
            symbols,
            index,
            wild_id,
            scatter_id,
        }
    }

    /// Look up a symbol, failing on ids that were never registered
    pub fn lookup(&self, id: SymbolId) -> SlotResult<&Symbol> {
        self.get(id).ok_or(SlotError::UnknownSymbol(id))
    }

    /// Get symbol by ID
    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.index.get(&id).map(|&i| &self.symbols[i])
    }

    /// Check if an id is registered
    pub fn contains(&self, id: SymbolId) -> bool {
        self.index.contains_key(&id)
    }

    /// All symbols in registration order
    pub fn list_all(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Number of symbols
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Get wild symbol ID
    pub fn wild_id(&self) -> Option<SymbolId> {
        self.wild_id
    }

    /// Get scatter symbol ID
    pub fn scatter_id(&self) -> Option<SymbolId> {
        self.scatter_id
    }

    /// Fail on the first id that is not registered
    pub fn ensure_known(&self, ids: &[SymbolId]) -> SlotResult<()> {
        match ids.iter().find(|id| !self.contains(**id)) {
            Some(&id) => Err(SlotError::UnknownSymbol(id)),
            None => Ok(()),
        }
    }
}

impl Default for SymbolCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
