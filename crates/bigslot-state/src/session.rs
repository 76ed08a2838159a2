//! Game session — one player's context, assembled once
//!
//! Owns the progression record, the slot machine and the optional
//! persistence adapter, and shares an [`EventBus`] with whoever wants to
//! listen. A spin round runs here end to end:
//!
//! ```text
//! precheck ─► spend + consume ─► spin ─► evaluate ─► credit ─► gem roll
//! ```

use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use bigslot_core::{Amount, SlotError, SlotResult};
use bigslot_engine::{
    GameConfig, MachineStats, ReelGrid, SlotMachine, SymbolCatalog, WeightedTable, WinLine,
    WinTier,
};
use bigslot_event::{EventBus, GameEvent};

use crate::persistence::PersistenceAdapter;
use crate::progression::{BetStep, ProgressionSnapshot, ProgressionState};
use crate::upgrades::UpgradeCatalog;

/// Result of one spin round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinOutcome {
    pub grid: ReelGrid,
    pub wins: Vec<WinLine>,
    pub total_payout: Amount,
    pub tier: WinTier,
    pub gem_awarded: bool,
    /// No spins left; time to call [`GameSession::end_stage`]
    pub stage_complete: bool,
}

/// Result of ending a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    /// Next stage begins at this number
    Continue { stage: u32 },
    /// Past the last stage
    RunComplete { stage_reached: u32 },
}

/// A play session
pub struct GameSession {
    config: Arc<GameConfig>,
    state: ProgressionState,
    machine: SlotMachine,
    persistence: Option<PersistenceAdapter>,
    events: Arc<EventBus>,
}

impl GameSession {
    /// Session with the standard catalogs and a fresh event bus
    pub fn new(config: GameConfig) -> SlotResult<Self> {
        Self::with_parts(
            config,
            Arc::new(SymbolCatalog::standard()),
            Arc::new(UpgradeCatalog::standard()),
            Arc::new(EventBus::new()),
        )
    }

    /// Session from explicit parts
    pub fn with_parts(
        config: GameConfig,
        catalog: Arc<SymbolCatalog>,
        upgrades: Arc<UpgradeCatalog>,
        events: Arc<EventBus>,
    ) -> SlotResult<Self> {
        let config = Arc::new(config);
        let state = ProgressionState::new(
            Arc::clone(&config),
            Arc::clone(&catalog),
            upgrades,
            Arc::clone(&events),
        )?;
        let machine = SlotMachine::new(catalog, config.rules.wild_mode);

        Ok(Self {
            config,
            state,
            machine,
            persistence: None,
            events,
        })
    }

    /// Builder: fixed rng seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.machine.seed(seed);
        self
    }

    /// Builder: attach persistence and overlay any saved record
    pub fn with_persistence(mut self, adapter: PersistenceAdapter) -> Self {
        if let Some(saved) = adapter.load() {
            log::info!(
                "Loaded save: {} gem(s), {} upgrade(s), {} run(s)",
                saved.gems,
                saved.upgrades.len(),
                saved.stats.total_runs
            );
            self.state.apply_save_record(saved);
        }
        self.persistence = Some(adapter);
        self
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ACCESS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn state(&self) -> &ProgressionState {
        &self.state
    }

    /// Direct mutable access to the progression record
    pub fn state_mut(&mut self) -> &mut ProgressionState {
        &mut self.state
    }

    pub fn snapshot(&self) -> ProgressionSnapshot {
        self.state.snapshot()
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn machine_stats(&self) -> &MachineStats {
        self.machine.stats()
    }

    pub fn persistence(&self) -> Option<&PersistenceAdapter> {
        self.persistence.as_ref()
    }

    pub fn is_run_complete(&self) -> bool {
        self.state.is_run_complete()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PLAYER ACTIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Play one spin round
    ///
    /// Fails with `RunComplete`, `NoSpinsRemaining` or `InsufficientFunds`
    /// before anything is spent.
    pub fn play_spin(&mut self) -> SlotResult<SpinOutcome> {
        self.state.ensure_can_spin()?;
        let slot = self.state.slot();
        let unlocked = self.state.unlocked_symbols().to_vec();
        WeightedTable::build(self.machine.catalog(), &unlocked)?;

        self.state.spend_coins(slot.spin_cost)?;
        self.state.consume_spin()?;

        let result = self.machine.play(&slot, &unlocked)?;
        self.events.emit(GameEvent::SpinCompleted {
            grid: result.grid.clone(),
        });

        let total_payout = result.evaluation.total_payout;
        let tier = WinTier::classify(total_payout, slot.spin_cost, &self.config.rewards);
        let mut gem_awarded = false;

        if total_payout > 0 {
            self.events.emit(GameEvent::Win {
                lines: result.evaluation.lines.clone(),
                total_payout,
                tier,
            });
            self.state.add_coins(total_payout);

            if tier.is_big() {
                log::info!("{tier:?} win: {total_payout} coins at bet {}", slot.spin_cost);
            }

            let chance = self.config.rewards.gem_drop_chance;
            if chance > 0.0 && self.machine.rng_mut().random_bool(chance) {
                self.state.add_gems(1);
                gem_awarded = true;
            }
        }

        Ok(SpinOutcome {
            grid: result.grid,
            wins: result.evaluation.lines,
            total_payout,
            tier,
            gem_awarded,
            stage_complete: self.state.spins_remaining() == 0,
        })
    }

    /// Advance to the next stage and save
    pub fn end_stage(&mut self) -> SlotResult<StageOutcome> {
        if self.state.is_run_complete() {
            return Err(SlotError::RunComplete);
        }
        self.state.next_stage();

        let outcome = if self.state.is_run_complete() {
            self.state.record_run_progress();
            let stage_reached = self.state.stage_reached();
            log::info!("Run complete at stage {stage_reached}");
            self.events.emit(GameEvent::RunCompleted { stage_reached });
            StageOutcome::RunComplete { stage_reached }
        } else {
            StageOutcome::Continue {
                stage: self.state.current_stage(),
            }
        };

        self.autosave();
        Ok(outcome)
    }

    /// Begin a fresh run and save
    pub fn start_new_run(&mut self) {
        self.state.start_new_run();
        self.autosave();
    }

    /// Buy one upgrade level; permanent purchases are saved at once
    pub fn purchase_upgrade(&mut self, id: &str) -> SlotResult<u32> {
        let level = self.state.purchase_upgrade(id)?;
        if self.state.upgrade_catalog().get(id).is_some_and(|u| u.is_permanent()) {
            self.autosave();
        }
        Ok(level)
    }

    pub fn adjust_bet(&mut self, step: BetStep) -> Amount {
        self.state.adjust_bet(step)
    }

    /// Save the permanent record; `Ok(false)` without persistence
    pub fn save(&self) -> SlotResult<bool> {
        match &self.persistence {
            Some(adapter) => adapter.save(&self.state.save_record()).map(|_| true),
            None => Ok(false),
        }
    }

    fn autosave(&self) {
        if let Err(e) = self.save() {
            log::warn!("Progress not saved: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigslot_event::EventLog;

    fn session(seed: u64) -> GameSession {
        GameSession::new(GameConfig::default()).unwrap().with_seed(seed)
    }

    #[test]
    fn test_spin_charges_and_consumes() {
        let mut session = session(1);
        let outcome = session.play_spin().unwrap();
        let snap = session.snapshot();

        assert_eq!(snap.spins_remaining, 19);
        assert_eq!(snap.total_spins, 1);
        assert_eq!(snap.coins, 100 - 10 + outcome.total_payout);
        assert_eq!(outcome.grid.cols(), 3);
        assert_eq!(outcome.grid.rows(), 3);
        assert!(!outcome.stage_complete);
    }

    #[test]
    fn test_spin_event_order() {
        let mut session = session(2);
        let (log, _) = EventLog::attach(session.events());
        session.play_spin().unwrap();

        let names = log.names();
        assert_eq!(&names[..3], &["state:coins", "state:spins", "spin:complete"]);
    }

    #[test]
    fn test_precheck_leaves_state_untouched() {
        let mut session = session(3);
        session.state_mut().spend_coins(95).unwrap();
        let before = session.snapshot();

        let err = session.play_spin().unwrap_err();
        assert!(matches!(err, SlotError::InsufficientFunds { .. }));
        assert_eq!(session.snapshot(), before);
    }

    #[test]
    fn test_no_spins_remaining() {
        let mut session = session(4);
        session.state_mut().add_coins(10_000);
        while session.state().spins_remaining() > 0 {
            session.play_spin().unwrap();
        }
        let coins = session.state().coins();
        assert!(matches!(session.play_spin(), Err(SlotError::NoSpinsRemaining)));
        assert_eq!(session.state().coins(), coins);
    }

    #[test]
    fn test_end_stage_until_run_complete() {
        let mut session = session(5);
        for stage in 2..=10 {
            assert_eq!(session.end_stage().unwrap(), StageOutcome::Continue { stage });
        }
        assert_eq!(
            session.end_stage().unwrap(),
            StageOutcome::RunComplete { stage_reached: 10 }
        );
        assert_eq!(session.state().stats().longest_run, 10);
        assert!(matches!(session.play_spin(), Err(SlotError::RunComplete)));
        assert!(matches!(session.end_stage(), Err(SlotError::RunComplete)));

        session.start_new_run();
        assert!(session.play_spin().is_ok());
    }

    #[test]
    fn test_save_without_persistence() {
        let session = session(6);
        assert!(!session.save().unwrap());
    }

    #[test]
    fn test_persistence_overlay() {
        let adapter = PersistenceAdapter::in_memory();
        {
            let mut session = session(7).with_persistence(adapter.clone());
            session.state_mut().add_gems(6);
            session.purchase_upgrade("unlock_wild").unwrap();
        }

        let session = session(8).with_persistence(adapter);
        assert_eq!(session.state().gems(), 1);
        assert_eq!(session.state().upgrade_level("unlock_wild"), 1);
        assert!(session
            .state()
            .unlocked_symbols()
            .contains(&bigslot_engine::ids::WILD));
    }

    #[test]
    fn test_gem_drop_certain() {
        let mut config = GameConfig::default();
        config.rewards.gem_drop_chance = 1.0;
        let mut session = GameSession::new(config).unwrap().with_seed(9);
        session.state_mut().add_coins(10_000);

        let mut wins = 0;
        for _ in 0..20 {
            let outcome = session.play_spin().unwrap();
            assert_eq!(outcome.gem_awarded, outcome.total_payout > 0);
            if outcome.gem_awarded {
                wins += 1;
            }
        }
        assert_eq!(session.state().gems(), wins);
    }
}
