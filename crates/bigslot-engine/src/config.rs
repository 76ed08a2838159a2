//! Game configuration
//!
//! Everything the engine and the progression loop read but never write:
//! grid dimensions, bet ladder, run pacing and reward thresholds. Loaded
//! from JSON or YAML and validated before anything runs with it.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use bigslot_core::{Amount, SlotError, SlotResult};

use crate::paytable::WildMode;

/// Hard upper bound for either grid dimension
pub const MAX_GRID_DIM: u8 = 8;

/// Live slot dimensions and bet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotConfiguration {
    /// Visible rows per reel
    pub rows: u8,
    /// Number of reels (columns)
    pub cols: u8,
    /// Coins charged per spin
    pub spin_cost: Amount,
}

impl SlotConfiguration {
    /// Total grid positions
    pub fn total_positions(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    /// Square grids also pay on both diagonals
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }
}

/// Slot machine section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotSettings {
    pub rows: u8,
    pub cols: u8,
    pub max_rows: u8,
    pub max_cols: u8,
    pub spin_cost: Amount,
    /// Allowed spin costs, ascending
    pub bet_options: Vec<Amount>,
}

impl Default for SlotSettings {
    fn default() -> Self {
        Self {
            rows: 3,
            cols: 3,
            max_rows: 5,
            max_cols: 5,
            spin_cost: 10,
            bet_options: vec![5, 10, 25, 50, 100],
        }
    }
}

/// Run pacing section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionSettings {
    pub initial_coins: Amount,
    pub initial_spins: u32,
    pub spins_per_stage: u32,
    pub stages_per_run: u32,
}

impl Default for ProgressionSettings {
    fn default() -> Self {
        Self {
            initial_coins: 100,
            initial_spins: 20,
            spins_per_stage: 15,
            stages_per_run: 10,
        }
    }
}

/// Reward section
///
/// Win multipliers are expressed in multiples of the spin cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardSettings {
    /// Chance of a gem on any winning spin
    pub gem_drop_chance: f64,
    pub medium_win_multiplier: Amount,
    pub big_win_multiplier: Amount,
    pub mega_win_multiplier: Amount,
}

impl Default for RewardSettings {
    fn default() -> Self {
        Self {
            gem_drop_chance: 0.05,
            medium_win_multiplier: 5,
            big_win_multiplier: 10,
            mega_win_multiplier: 50,
        }
    }
}

/// Line evaluation rules
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSettings {
    pub wild_mode: WildMode,
}

/// Complete game configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub slot: SlotSettings,
    pub progression: ProgressionSettings,
    pub rewards: RewardSettings,
    pub rules: RuleSettings,
}

impl GameConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> SlotResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| SlotError::config(format!("JSON parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> SlotResult<Self> {
        let config: Self = serde_yml::from_str(yaml)
            .map_err(|e| SlotError::config(format!("YAML parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file; `.yaml`/`.yml` parse as YAML, anything else as JSON
    pub fn load_from<P: AsRef<Path>>(path: P) -> SlotResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

        let config = if is_yaml {
            Self::from_yaml_str(&content)?
        } else {
            Self::from_json_str(&content)?
        };
        log::info!("Loaded game configuration from {}", path.display());
        Ok(config)
    }

    /// Pretty JSON form
    pub fn to_json_pretty(&self) -> SlotResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| SlotError::Serialization(e.to_string()))
    }

    /// Slot configuration a fresh run starts with
    pub fn initial_slot(&self) -> SlotConfiguration {
        SlotConfiguration {
            rows: self.slot.rows,
            cols: self.slot.cols,
            spin_cost: self.slot.spin_cost,
        }
    }

    /// Validate every section
    pub fn validate(&self) -> SlotResult<()> {
        let slot = &self.slot;
        if slot.rows == 0 || slot.cols == 0 {
            return Err(SlotError::config("rows and cols must be >= 1"));
        }
        if slot.max_rows > MAX_GRID_DIM || slot.max_cols > MAX_GRID_DIM {
            return Err(SlotError::config(format!(
                "grid maxima must be <= {MAX_GRID_DIM}: {}x{}",
                slot.max_rows, slot.max_cols
            )));
        }
        if slot.rows > slot.max_rows || slot.cols > slot.max_cols {
            return Err(SlotError::config(format!(
                "initial grid {}x{} exceeds maximum {}x{}",
                slot.rows, slot.cols, slot.max_rows, slot.max_cols
            )));
        }
        if slot.spin_cost == 0 {
            return Err(SlotError::config("spin cost must be > 0"));
        }
        if slot.bet_options.is_empty() {
            return Err(SlotError::config("bet options must not be empty"));
        }
        if slot.bet_options[0] == 0 || slot.bet_options.windows(2).any(|w| w[0] >= w[1]) {
            return Err(SlotError::config(
                "bet options must be positive and strictly ascending",
            ));
        }
        if !slot.bet_options.contains(&slot.spin_cost) {
            return Err(SlotError::config(format!(
                "spin cost {} is not one of the bet options",
                slot.spin_cost
            )));
        }

        let progression = &self.progression;
        if progression.initial_spins == 0 {
            return Err(SlotError::config("initial spins must be > 0"));
        }
        if progression.spins_per_stage == 0 {
            return Err(SlotError::config("spins per stage must be > 0"));
        }
        if progression.stages_per_run == 0 {
            return Err(SlotError::config("stages per run must be > 0"));
        }

        let rewards = &self.rewards;
        if !(0.0..=1.0).contains(&rewards.gem_drop_chance) {
            return Err(SlotError::config(format!(
                "gem drop chance must be within [0, 1]: {}",
                rewards.gem_drop_chance
            )));
        }
        if rewards.medium_win_multiplier == 0 || rewards.big_win_multiplier == 0 {
            return Err(SlotError::config("win multipliers must be > 0"));
        }
        if rewards.medium_win_multiplier >= rewards.big_win_multiplier
            || rewards.big_win_multiplier >= rewards.mega_win_multiplier
        {
            return Err(SlotError::config(
                "win multipliers must ascend: medium < big < mega",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = GameConfig::default();
        assert!(config.validate().is_ok());
        let slot = config.initial_slot();
        assert_eq!((slot.rows, slot.cols, slot.spin_cost), (3, 3, 10));
        assert!(slot.is_square());
        assert_eq!(slot.total_positions(), 9);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "slot": { "rows": 3, "cols": 5 }, "rules": { "wild_mode": "plain" } }"#;
        let config = GameConfig::from_json_str(json).unwrap();
        assert_eq!(config.slot.cols, 5);
        assert_eq!(config.slot.spin_cost, 10);
        assert_eq!(config.progression.spins_per_stage, 15);
        assert_eq!(config.rules.wild_mode, WildMode::Plain);
    }

    #[test]
    fn test_yaml_config() {
        let yaml = "progression:\n  initial_coins: 1000\n  initial_spins: 10\nrewards:\n  gem_drop_chance: 0.1\n";
        let config = GameConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.progression.initial_coins, 1000);
        assert_eq!(config.progression.initial_spins, 10);
        assert!((config.rewards.gem_drop_chance - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let cases = [
            r#"{ "slot": { "rows": 0 } }"#,
            r#"{ "slot": { "spin_cost": 0 } }"#,
            r#"{ "slot": { "rows": 6 } }"#,
            r#"{ "slot": { "max_cols": 9, "cols": 3 } }"#,
            r#"{ "slot": { "spin_cost": 15 } }"#,
            r#"{ "slot": { "bet_options": [10, 5] } }"#,
            r#"{ "progression": { "spins_per_stage": 0 } }"#,
            r#"{ "rewards": { "gem_drop_chance": 1.5 } }"#,
            r#"{ "rewards": { "gem_drop_chance": -0.1 } }"#,
            r#"{ "rewards": { "big_win_multiplier": 60 } }"#,
        ];
        for json in cases {
            assert!(
                matches!(GameConfig::from_json_str(json), Err(SlotError::InvalidConfiguration(_))),
                "accepted invalid config: {json}"
            );
        }
    }

    #[test]
    fn test_parse_error_is_invalid_configuration() {
        assert!(matches!(
            GameConfig::from_json_str("{ not json"),
            Err(SlotError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.yml");
        fs::write(&path, "slot:\n  rows: 4\n  cols: 4\n").unwrap();
        let config = GameConfig::load_from(&path).unwrap();
        assert_eq!((config.slot.rows, config.slot.cols), (4, 4));

        let json_path = dir.path().join("game.json");
        fs::write(&json_path, config.to_json_pretty().unwrap()).unwrap();
        assert_eq!(GameConfig::load_from(&json_path).unwrap(), config);

        assert!(matches!(
            GameConfig::load_from(dir.path().join("missing.json")),
            Err(SlotError::Io(_))
        ));
    }
}
