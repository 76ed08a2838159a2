//! Upgrade definitions
//!
//! Upgrades are bought with coins or gems. Temporary ones last until the
//! run ends; permanent ones are saved and re-applied at every run start.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use bigslot_core::{Amount, Currency, SlotError, SlotResult, SymbolId};
use bigslot_engine::{SymbolCatalog, ids};

/// How long an upgrade lasts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeScope {
    /// Cleared by the next run
    Temporary,
    /// Persisted and re-applied every run
    Permanent,
}

/// What buying one level does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum UpgradeEffect {
    /// Add rows to the grid (clamped to the configured maximum)
    ExpandRows(u8),
    /// Add reels to the grid (clamped to the configured maximum)
    ExpandCols(u8),
    /// Add a symbol to the draw pool
    UnlockSymbol(SymbolId),
    /// Recorded only; presentation decides what it means
    Marker,
}

/// Upgrade definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeDef {
    pub id: String,
    pub name: String,
    /// Price per level
    pub cost: Amount,
    pub currency: Currency,
    pub scope: UpgradeScope,
    pub effect: UpgradeEffect,
    /// Highest purchasable level
    pub max_level: u32,
}

impl UpgradeDef {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        cost: Amount,
        currency: Currency,
        scope: UpgradeScope,
        effect: UpgradeEffect,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            cost,
            currency,
            scope,
            effect,
            max_level: 1,
        }
    }

    /// Builder: set max level
    pub fn with_max_level(mut self, max_level: u32) -> Self {
        self.max_level = max_level;
        self
    }

    pub fn is_permanent(&self) -> bool {
        self.scope == UpgradeScope::Permanent
    }
}

/// The upgrade shop
pub fn standard_upgrades() -> Vec<UpgradeDef> {
    use Currency::{Coins, Gems};
    use UpgradeEffect::*;
    use UpgradeScope::{Permanent, Temporary};

    vec![
        UpgradeDef::new("extra_row", "Extra Row", 50, Coins, Temporary, ExpandRows(1))
            .with_max_level(2),
        UpgradeDef::new("extra_reel", "Extra Reel", 75, Coins, Temporary, ExpandCols(1))
            .with_max_level(2),
        UpgradeDef::new("unlock_bar", "Bar Symbol", 40, Coins, Temporary, UnlockSymbol(ids::BAR)),
        UpgradeDef::new("unlock_seven", "Lucky Seven", 60, Coins, Temporary, UnlockSymbol(ids::SEVEN)),
        UpgradeDef::new("unlock_wild", "Wild Card", 5, Gems, Permanent, UnlockSymbol(ids::WILD)),
        UpgradeDef::new("unlock_scatter", "Scatter Pays", 5, Gems, Permanent, UnlockSymbol(ids::SCATTER)),
        UpgradeDef::new("unlock_diamond", "Diamond Mine", 10, Gems, Permanent, UnlockSymbol(ids::DIAMOND)),
        UpgradeDef::new("wide_reels", "Wide Reels", 15, Gems, Permanent, ExpandCols(1)),
        UpgradeDef::new("lucky_charm", "Lucky Charm", 3, Gems, Permanent, Marker),
    ]
}

/// Validated, immutable upgrade table
#[derive(Debug, Clone)]
pub struct UpgradeCatalog {
    upgrades: Vec<UpgradeDef>,
    index: HashMap<String, usize>,
}

impl UpgradeCatalog {
    /// Build a catalog, checking ids, prices and unlock targets
    pub fn new(upgrades: Vec<UpgradeDef>, symbols: &SymbolCatalog) -> SlotResult<Self> {
        let mut seen = HashSet::with_capacity(upgrades.len());
        for upgrade in &upgrades {
            if upgrade.id.is_empty() {
                return Err(SlotError::config("upgrade id must not be empty"));
            }
            if !seen.insert(upgrade.id.as_str()) {
                return Err(SlotError::config(format!("duplicate upgrade id '{}'", upgrade.id)));
            }
            if upgrade.cost == 0 || upgrade.max_level == 0 {
                return Err(SlotError::config(format!(
                    "upgrade '{}' needs a positive cost and max level",
                    upgrade.id
                )));
            }
            if let UpgradeEffect::UnlockSymbol(symbol) = upgrade.effect {
                symbols.lookup(symbol)?;
            }
        }
        Ok(Self::index(upgrades))
    }

    /// Standard shop for the standard symbol catalog
    pub fn standard() -> Self {
        Self::index(standard_upgrades())
    }

    /// Catalog with nothing for sale
    pub fn empty() -> Self {
        Self::index(Vec::new())
    }

    fn index(upgrades: Vec<UpgradeDef>) -> Self {
        let index = upgrades
            .iter()
            .enumerate()
            .map(|(i, u)| (u.id.clone(), i))
            .collect();
        Self { upgrades, index }
    }

    /// Look up an upgrade, failing on unknown ids
    pub fn lookup(&self, id: &str) -> SlotResult<&UpgradeDef> {
        self.get(id)
            .ok_or_else(|| SlotError::UnknownUpgrade(id.to_string()))
    }

    pub fn get(&self, id: &str) -> Option<&UpgradeDef> {
        self.index.get(id).map(|&i| &self.upgrades[i])
    }

    pub fn list_all(&self) -> &[UpgradeDef] {
        &self.upgrades
    }

    pub fn len(&self) -> usize {
        self.upgrades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.upgrades.is_empty()
    }
}

impl Default for UpgradeCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_is_valid() {
        let symbols = SymbolCatalog::standard();
        let catalog = UpgradeCatalog::new(standard_upgrades(), &symbols).unwrap();
        assert_eq!(catalog.len(), standard_upgrades().len());
        assert!(catalog.lookup("unlock_wild").unwrap().is_permanent());
        assert_eq!(catalog.lookup("extra_row").unwrap().max_level, 2);
    }

    #[test]
    fn test_unknown_upgrade() {
        let catalog = UpgradeCatalog::standard();
        assert!(matches!(
            catalog.lookup("golden_lever"),
            Err(SlotError::UnknownUpgrade(id)) if id == "golden_lever"
        ));
    }

    #[test]
    fn test_rejects_bad_definitions() {
        let symbols = SymbolCatalog::standard();

        let dup = vec![
            UpgradeDef::new("a", "A", 1, Currency::Coins, UpgradeScope::Temporary, UpgradeEffect::Marker),
            UpgradeDef::new("a", "A2", 1, Currency::Coins, UpgradeScope::Temporary, UpgradeEffect::Marker),
        ];
        assert!(UpgradeCatalog::new(dup, &symbols).is_err());

        let free = vec![UpgradeDef::new(
            "free",
            "Free",
            0,
            Currency::Gems,
            UpgradeScope::Permanent,
            UpgradeEffect::Marker,
        )];
        assert!(UpgradeCatalog::new(free, &symbols).is_err());

        let ghost = vec![UpgradeDef::new(
            "ghost",
            "Ghost",
            5,
            Currency::Gems,
            UpgradeScope::Permanent,
            UpgradeEffect::UnlockSymbol(SymbolId(99)),
        )];
        assert!(matches!(
            UpgradeCatalog::new(ghost, &symbols),
            Err(SlotError::UnknownSymbol(SymbolId(99)))
        ));
    }

    #[test]
    fn test_effect_serialization() {
        let json = serde_json::to_value(UpgradeEffect::ExpandRows(1)).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "expand_rows", "value": 1 }));
        let marker = serde_json::to_value(UpgradeEffect::Marker).unwrap();
        assert_eq!(marker, serde_json::json!({ "type": "marker" }));
    }
}
