//! Progression state — the single record a play session mutates
//!
//! Every mutation goes through a method here and is followed by a
//! [`GameEvent`] naming what changed. Readers take a
//! [`ProgressionSnapshot`], never a live reference.
//!
//! Run-scoped fields (coins, stage, spins, grid, unlocked symbols,
//! temporary upgrades) reset with [`ProgressionState::start_new_run`];
//! gems, permanent upgrades and lifetime stats carry over.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use bigslot_core::{Amount, Currency, SlotError, SlotResult, SymbolId};
use bigslot_engine::{GameConfig, STARTER_SYMBOLS, SlotConfiguration, SymbolCatalog};
use bigslot_event::{EventBus, GameEvent};

use crate::persistence::{LifetimeStats, SaveRecord};
use crate::upgrades::{UpgradeCatalog, UpgradeDef, UpgradeEffect, UpgradeScope};

/// Direction for [`ProgressionState::adjust_bet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetStep {
    Up,
    Down,
}

/// Immutable copy of the progression record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionSnapshot {
    pub coins: Amount,
    pub gems: Amount,
    /// 1-based
    pub current_stage: u32,
    pub spins_remaining: u32,
    /// Spins consumed this run
    pub total_spins: u32,
    pub slot: SlotConfiguration,
    /// Unlock order; never shrinks within a run
    pub unlocked_symbols: Vec<SymbolId>,
    /// Permanent upgrade levels
    pub upgrades: BTreeMap<String, u32>,
    /// Upgrade levels bought this run
    pub temp_upgrades: BTreeMap<String, u32>,
    pub stats: LifetimeStats,
}

impl ProgressionSnapshot {
    /// Past the last stage of the run
    pub fn is_run_complete(&self, stages_per_run: u32) -> bool {
        self.current_stage > stages_per_run
    }

    /// Level of an upgrade in either scope
    pub fn upgrade_level(&self, id: &str) -> u32 {
        self.upgrades
            .get(id)
            .or_else(|| self.temp_upgrades.get(id))
            .copied()
            .unwrap_or(0)
    }

    /// The persisted subset
    pub fn save_record(&self) -> SaveRecord {
        SaveRecord {
            gems: self.gems,
            upgrades: self.upgrades.clone(),
            stats: self.stats.clone(),
        }
    }
}

/// Owner of the progression record
pub struct ProgressionState {
    record: ProgressionSnapshot,
    config: Arc<GameConfig>,
    catalog: Arc<SymbolCatalog>,
    upgrades: Arc<UpgradeCatalog>,
    events: Arc<EventBus>,
    starters: Vec<SymbolId>,
}

impl ProgressionState {
    /// Validate the configuration and start from defaults
    pub fn new(
        config: Arc<GameConfig>,
        catalog: Arc<SymbolCatalog>,
        upgrades: Arc<UpgradeCatalog>,
        events: Arc<EventBus>,
    ) -> SlotResult<Self> {
        Self::with_starters(config, catalog, upgrades, events, STARTER_SYMBOLS.to_vec())
    }

    /// Like [`new`](Self::new), with a custom starting unlock set
    pub fn with_starters(
        config: Arc<GameConfig>,
        catalog: Arc<SymbolCatalog>,
        upgrades: Arc<UpgradeCatalog>,
        events: Arc<EventBus>,
        starters: Vec<SymbolId>,
    ) -> SlotResult<Self> {
        config.validate()?;
        if starters.is_empty() {
            return Err(SlotError::config("starting symbol set is empty"));
        }
        catalog.ensure_known(&starters)?;
        Ok(Self::build(config, catalog, upgrades, events, starters))
    }

    /// Default configuration, catalogs and a private event bus
    pub fn standard() -> Self {
        Self::build(
            Arc::new(GameConfig::default()),
            Arc::new(SymbolCatalog::standard()),
            Arc::new(UpgradeCatalog::standard()),
            Arc::new(EventBus::new()),
            STARTER_SYMBOLS.to_vec(),
        )
    }

    fn build(
        config: Arc<GameConfig>,
        catalog: Arc<SymbolCatalog>,
        upgrades: Arc<UpgradeCatalog>,
        events: Arc<EventBus>,
        starters: Vec<SymbolId>,
    ) -> Self {
        let mut unlocked = Vec::with_capacity(starters.len());
        for id in &starters {
            if !unlocked.contains(id) {
                unlocked.push(*id);
            }
        }

        let record = ProgressionSnapshot {
            coins: config.progression.initial_coins,
            gems: 0,
            current_stage: 1,
            spins_remaining: config.progression.initial_spins,
            total_spins: 0,
            slot: config.initial_slot(),
            unlocked_symbols: unlocked,
            upgrades: BTreeMap::new(),
            temp_upgrades: BTreeMap::new(),
            stats: LifetimeStats::default(),
        };

        Self {
            record,
            config,
            catalog,
            upgrades,
            events,
            starters,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // READ ACCESS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Copy of the full record
    pub fn snapshot(&self) -> ProgressionSnapshot {
        self.record.clone()
    }

    pub fn coins(&self) -> Amount {
        self.record.coins
    }

    pub fn gems(&self) -> Amount {
        self.record.gems
    }

    pub fn current_stage(&self) -> u32 {
        self.record.current_stage
    }

    pub fn spins_remaining(&self) -> u32 {
        self.record.spins_remaining
    }

    pub fn total_spins(&self) -> u32 {
        self.record.total_spins
    }

    pub fn slot(&self) -> SlotConfiguration {
        self.record.slot
    }

    pub fn unlocked_symbols(&self) -> &[SymbolId] {
        &self.record.unlocked_symbols
    }

    pub fn stats(&self) -> &LifetimeStats {
        &self.record.stats
    }

    pub fn upgrade_level(&self, id: &str) -> u32 {
        self.record.upgrade_level(id)
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<SymbolCatalog> {
        &self.catalog
    }

    pub fn upgrade_catalog(&self) -> &UpgradeCatalog {
        &self.upgrades
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn is_run_complete(&self) -> bool {
        self.record
            .is_run_complete(self.config.progression.stages_per_run)
    }

    /// Highest stage this run counts as reached
    pub fn stage_reached(&self) -> u32 {
        self.record
            .current_stage
            .min(self.config.progression.stages_per_run)
    }

    pub fn can_afford(&self, currency: Currency, amount: Amount) -> bool {
        self.balance(currency) >= amount
    }

    fn balance(&self, currency: Currency) -> Amount {
        match currency {
            Currency::Coins => self.record.coins,
            Currency::Gems => self.record.gems,
        }
    }

    /// Fail unless a spin could be paid for and consumed right now
    pub fn ensure_can_spin(&self) -> SlotResult<()> {
        if self.is_run_complete() {
            return Err(SlotError::RunComplete);
        }
        if self.record.spins_remaining == 0 {
            return Err(SlotError::NoSpinsRemaining);
        }
        let cost = self.record.slot.spin_cost;
        if self.record.coins < cost {
            return Err(SlotError::InsufficientFunds {
                currency: Currency::Coins,
                required: cost,
                available: self.record.coins,
            });
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CURRENCIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Credit coins; counts toward lifetime winnings
    pub fn add_coins(&mut self, amount: Amount) {
        if amount == 0 {
            return;
        }
        let record = &mut self.record;
        record.coins = record.coins.saturating_add(amount);
        record.stats.total_winnings = record.stats.total_winnings.saturating_add(amount);
        record.stats.biggest_win = record.stats.biggest_win.max(amount);
        self.emit_coins(GameEvent::signed(amount, false));
    }

    /// Debit coins, or fail with nothing changed
    pub fn spend_coins(&mut self, amount: Amount) -> SlotResult<()> {
        self.spend(Currency::Coins, amount)
    }

    pub fn add_gems(&mut self, amount: Amount) {
        if amount == 0 {
            return;
        }
        self.record.gems = self.record.gems.saturating_add(amount);
        self.emit_gems(GameEvent::signed(amount, false));
    }

    /// Debit gems, or fail with nothing changed
    pub fn spend_gems(&mut self, amount: Amount) -> SlotResult<()> {
        self.spend(Currency::Gems, amount)
    }

    fn spend(&mut self, currency: Currency, amount: Amount) -> SlotResult<()> {
        let available = self.balance(currency);
        if available < amount {
            return Err(SlotError::InsufficientFunds {
                currency,
                required: amount,
                available,
            });
        }
        if amount == 0 {
            return Ok(());
        }

        let delta = GameEvent::signed(amount, true);
        match currency {
            Currency::Coins => {
                self.record.coins -= amount;
                self.emit_coins(delta);
            }
            Currency::Gems => {
                self.record.gems -= amount;
                self.emit_gems(delta);
            }
        }
        Ok(())
    }

    fn emit_coins(&self, delta: i64) {
        self.events.emit(GameEvent::CoinsChanged {
            delta,
            total: self.record.coins,
        });
    }

    fn emit_gems(&self, delta: i64) {
        self.events.emit(GameEvent::GemsChanged {
            delta,
            total: self.record.gems,
        });
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SPINS & STAGES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Use up one spin
    pub fn consume_spin(&mut self) -> SlotResult<()> {
        if self.record.spins_remaining == 0 {
            return Err(SlotError::NoSpinsRemaining);
        }
        self.record.spins_remaining -= 1;
        self.record.total_spins = self.record.total_spins.saturating_add(1);
        self.emit_spins();
        Ok(())
    }

    /// Advance one stage and grant its spins
    pub fn next_stage(&mut self) {
        let record = &mut self.record;
        record.current_stage += 1;
        record.spins_remaining = record
            .spins_remaining
            .saturating_add(self.config.progression.spins_per_stage);

        log::info!(
            "Stage {} ({} spins remaining)",
            record.current_stage,
            record.spins_remaining
        );
        self.events.emit(GameEvent::StageChanged {
            stage: self.record.current_stage,
        });
        self.emit_spins();
    }

    fn emit_spins(&self) {
        self.events.emit(GameEvent::SpinsChanged {
            remaining: self.record.spins_remaining,
        });
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SLOT & SYMBOLS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Add a symbol to the draw pool; false if it was already there
    pub fn unlock_symbol(&mut self, id: SymbolId) -> SlotResult<bool> {
        self.catalog.lookup(id)?;
        if self.record.unlocked_symbols.contains(&id) {
            return Ok(false);
        }
        self.record.unlocked_symbols.push(id);
        log::debug!("Unlocked symbol {id}");
        self.events.emit(GameEvent::SymbolUnlocked { symbol: id });
        Ok(true)
    }

    /// Resize the grid, clamped to `[1, max]` per dimension
    pub fn expand_slot(&mut self, rows: u8, cols: u8) -> SlotConfiguration {
        let before = self.record.slot;
        self.resize_slot(rows, cols);
        self.emit_slot_change(before);
        self.record.slot
    }

    /// Clamped resize without notification
    fn resize_slot(&mut self, rows: u8, cols: u8) {
        let slot = &self.config.slot;
        self.record.slot.rows = rows.clamp(1, slot.max_rows);
        self.record.slot.cols = cols.clamp(1, slot.max_cols);
    }

    fn emit_slot_change(&self, before: SlotConfiguration) {
        let SlotConfiguration { rows, cols, .. } = self.record.slot;
        if before.rows != rows || before.cols != cols {
            self.events.emit(GameEvent::SlotExpanded { rows, cols });
        }
    }

    /// Step the spin cost along the bet ladder; returns the new cost
    ///
    /// A cost that is not on the ladder snaps to the nearest rung first.
    pub fn adjust_bet(&mut self, step: BetStep) -> Amount {
        let ladder = &self.config.slot.bet_options;
        let current = self.record.slot.spin_cost;
        let Some(index) = nearest_rung(ladder, current) else {
            return current;
        };

        let target = match step {
            BetStep::Up => (index + 1).min(ladder.len() - 1),
            BetStep::Down => index.saturating_sub(1),
        };
        let cost = ladder[target];
        if cost != current {
            self.record.slot.spin_cost = cost;
            self.events.emit(GameEvent::BetChanged { spin_cost: cost });
        }
        cost
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // UPGRADES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Buy one level of an upgrade; returns the new level
    ///
    /// All checks run before the currency is spent, so a failure leaves
    /// the record untouched.
    pub fn purchase_upgrade(&mut self, id: &str) -> SlotResult<u32> {
        let def = self.upgrades.lookup(id)?.clone();
        let level = self.upgrade_level(id);
        if level >= def.max_level {
            return Err(SlotError::UpgradeMaxed(def.id));
        }
        if let UpgradeEffect::UnlockSymbol(symbol) = def.effect {
            self.catalog.lookup(symbol)?;
        }

        self.spend(def.currency, def.cost)?;
        let level = level + 1;
        let levels = match def.scope {
            UpgradeScope::Permanent => &mut self.record.upgrades,
            UpgradeScope::Temporary => &mut self.record.temp_upgrades,
        };
        levels.insert(def.id.clone(), level);
        let slot_before = self.record.slot;
        self.apply_effect(&def, 1);
        self.emit_slot_change(slot_before);

        log::info!("Purchased {} level {} for {} {}", def.id, level, def.cost, def.currency);
        self.events.emit(GameEvent::UpgradeApplied { id: def.id, level });
        Ok(level)
    }

    /// Apply `levels` levels of an effect; grid changes are not announced
    fn apply_effect(&mut self, def: &UpgradeDef, levels: u32) {
        let times = u8::try_from(levels).unwrap_or(u8::MAX);
        let slot = self.record.slot;
        match def.effect {
            UpgradeEffect::ExpandRows(n) => {
                self.resize_slot(slot.rows.saturating_add(n.saturating_mul(times)), slot.cols);
            }
            UpgradeEffect::ExpandCols(n) => {
                self.resize_slot(slot.rows, slot.cols.saturating_add(n.saturating_mul(times)));
            }
            UpgradeEffect::UnlockSymbol(symbol) => {
                if let Err(e) = self.unlock_symbol(symbol) {
                    log::warn!("Upgrade {} cannot unlock {}: {}", def.id, symbol, e);
                }
            }
            UpgradeEffect::Marker => {}
        }
    }

    /// Apply every owned permanent upgrade to the current run
    fn reapply_permanent(&mut self) {
        let owned: Vec<(String, u32)> = self
            .record
            .upgrades
            .iter()
            .map(|(id, level)| (id.clone(), *level))
            .collect();

        for (id, level) in owned {
            match self.upgrades.get(&id).cloned() {
                Some(def) => self.apply_effect(&def, level),
                None => log::warn!("Skipping unknown saved upgrade '{id}'"),
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // RUN LIFECYCLE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Fold the current run's stage into `longest_run`
    pub fn record_run_progress(&mut self) {
        let reached = self.stage_reached();
        let stats = &mut self.record.stats;
        stats.longest_run = stats.longest_run.max(reached);
    }

    /// Reset run-scoped fields and count a new run
    pub fn start_new_run(&mut self) {
        self.record_run_progress();
        self.record.stats.total_runs = self.record.stats.total_runs.saturating_add(1);
        let run = self.record.stats.total_runs;
        log::info!("Run {run} started");
        self.events.emit(GameEvent::RunStarted { run });

        let before = self.snapshot();
        self.reset_run();
        self.emit_run_fields(&before);
    }

    fn reset_run(&mut self) {
        let progression = &self.config.progression;
        let record = &mut self.record;
        record.coins = progression.initial_coins;
        record.current_stage = 1;
        record.spins_remaining = progression.initial_spins;
        record.total_spins = 0;
        record.slot = self.config.initial_slot();
        record.temp_upgrades.clear();
        record.unlocked_symbols.clear();
        for id in &self.starters {
            if !record.unlocked_symbols.contains(id) {
                record.unlocked_symbols.push(*id);
            }
        }
        self.reapply_permanent();
    }

    /// Announce every run field that differs from `before`
    fn emit_run_fields(&self, before: &ProgressionSnapshot) {
        let record = &self.record;
        if record.coins != before.coins {
            self.emit_coins(signed_delta(before.coins, record.coins));
        }
        if record.current_stage != before.current_stage {
            self.events.emit(GameEvent::StageChanged {
                stage: record.current_stage,
            });
        }
        if record.spins_remaining != before.spins_remaining {
            self.emit_spins();
        }
        if record.slot.spin_cost != before.slot.spin_cost {
            self.events.emit(GameEvent::BetChanged {
                spin_cost: record.slot.spin_cost,
            });
        }
        self.emit_slot_change(before.slot);
    }

    /// Keep only permanent upgrades, capped at their max level
    ///
    /// Ids missing from the catalog are kept so they survive a round trip;
    /// they are skipped when effects are applied.
    fn sanitize_saved_upgrades(&self, saved: BTreeMap<String, u32>) -> BTreeMap<String, u32> {
        let mut kept = BTreeMap::new();
        for (id, level) in saved {
            let Some(def) = self.upgrades.get(&id) else {
                kept.insert(id, level);
                continue;
            };
            if !def.is_permanent() {
                log::warn!("Dropping saved temporary upgrade '{id}'");
                continue;
            }
            if level > def.max_level {
                log::warn!("Saved upgrade '{id}' level {level} capped at {}", def.max_level);
            }
            kept.insert(id, level.min(def.max_level));
        }
        kept
    }

    /// Overlay a loaded save record
    ///
    /// Meant for session start: the current run restarts from its initial
    /// state with the saved permanent upgrades applied.
    pub fn apply_save_record(&mut self, saved: SaveRecord) {
        let before = self.snapshot();
        self.record.gems = saved.gems;
        self.record.upgrades = self.sanitize_saved_upgrades(saved.upgrades);
        self.record.stats = saved.stats;
        self.reset_run();

        if self.record.gems != before.gems {
            self.emit_gems(signed_delta(before.gems, self.record.gems));
        }
        self.emit_run_fields(&before);
    }

    /// The persisted subset of the record
    pub fn save_record(&self) -> SaveRecord {
        self.record.save_record()
    }
}

impl std::fmt::Debug for ProgressionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressionState")
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}

fn signed_delta(from: Amount, to: Amount) -> i64 {
    let delta = i128::from(to) - i128::from(from);
    i64::try_from(delta).unwrap_or(if delta < 0 { i64::MIN } else { i64::MAX })
}

/// Index of the ladder rung closest to `cost` (lower rung on ties)
fn nearest_rung(ladder: &[Amount], cost: Amount) -> Option<usize> {
    ladder
        .iter()
        .enumerate()
        .min_by_key(|(_, rung)| rung.abs_diff(cost))
        .map(|(i, _)| i)
}
