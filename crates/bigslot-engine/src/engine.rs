//! Slot machine — owns the rng and the paytable, runs spins

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use bigslot_core::{Amount, SlotResult, SymbolId};

use crate::config::SlotConfiguration;
use crate::paytable::{Evaluation, PayTable, WildMode, WinLine};
use crate::spin::{self, ReelGrid};
use crate::symbols::SymbolCatalog;

/// Slot Machine
///
/// Stateless with respect to the player: reads the slot configuration and
/// unlocked symbols it is handed, never the progression record.
pub struct SlotMachine {
    /// Paytable (holds the catalog)
    paytable: PayTable,
    /// Random number generator
    rng: StdRng,
    /// Machine-level statistics
    stats: MachineStats,
}

/// Spin statistics for one machine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineStats {
    pub total_spins: u64,
    pub total_bet: Amount,
    pub total_paid: Amount,
    pub wins: u64,
    pub lines_paid: u64,
    pub biggest_payout: Amount,
}

impl MachineStats {
    /// Return to player, percent
    pub fn rtp(&self) -> f64 {
        if self.total_bet > 0 {
            (self.total_paid as f64 / self.total_bet as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Percent of spins that paid anything
    pub fn hit_rate(&self) -> f64 {
        if self.total_spins > 0 {
            (self.wins as f64 / self.total_spins as f64) * 100.0
        } else {
            0.0
        }
    }

    fn record(&mut self, spin_cost: Amount, eval: &Evaluation) {
        self.total_spins += 1;
        self.total_bet = self.total_bet.saturating_add(spin_cost);
        self.total_paid = self.total_paid.saturating_add(eval.total_payout);
        self.lines_paid += eval.lines.len() as u64;
        if eval.is_win() {
            self.wins += 1;
        }
        self.biggest_payout = self.biggest_payout.max(eval.total_payout);
    }
}

/// A spin together with its evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinResult {
    pub grid: ReelGrid,
    pub evaluation: Evaluation,
}

impl SlotMachine {
    /// Create with an OS-seeded rng
    pub fn new(catalog: Arc<SymbolCatalog>, wild_mode: WildMode) -> Self {
        Self {
            paytable: PayTable::new(catalog, wild_mode),
            rng: StdRng::from_os_rng(),
            stats: MachineStats::default(),
        }
    }

    /// Create with a fixed seed
    pub fn with_seed(catalog: Arc<SymbolCatalog>, wild_mode: WildMode, seed: u64) -> Self {
        let mut machine = Self::new(catalog, wild_mode);
        machine.seed(seed);
        machine
    }

    /// Seed RNG for reproducible results
    pub fn seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn catalog(&self) -> &SymbolCatalog {
        self.paytable.catalog()
    }

    pub fn paytable(&self) -> &PayTable {
        &self.paytable
    }

    pub fn wild_mode(&self) -> WildMode {
        self.paytable.wild_mode()
    }

    /// Get machine stats
    pub fn stats(&self) -> &MachineStats {
        &self.stats
    }

    /// Reset machine stats
    pub fn reset_stats(&mut self) {
        self.stats = MachineStats::default();
    }

    /// Mutable access to the rng, for draws that must share its stream
    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SPIN EXECUTION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Draw a fresh grid from the unlocked symbols
    pub fn spin(&mut self, config: &SlotConfiguration, unlocked: &[SymbolId]) -> SlotResult<ReelGrid> {
        spin::spin(self.paytable.catalog(), config, unlocked, &mut self.rng)
    }

    /// Evaluate a grid
    pub fn calculate_wins(&self, grid: &ReelGrid, spin_cost: Amount) -> SlotResult<Vec<WinLine>> {
        self.paytable.calculate_wins(grid, spin_cost)
    }

    /// Spin, evaluate and record stats
    pub fn play(&mut self, config: &SlotConfiguration, unlocked: &[SymbolId]) -> SlotResult<SpinResult> {
        let grid = self.spin(config, unlocked)?;
        let evaluation = self.paytable.evaluate(&grid, config.spin_cost)?;
        self.stats.record(config.spin_cost, &evaluation);

        log::debug!(
            "spin {}: {} line(s), paid {}",
            self.stats.total_spins,
            evaluation.win_count(),
            evaluation.total_payout
        );

        Ok(SpinResult { grid, evaluation })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::{STARTER_SYMBOLS, ids};

    fn machine(seed: u64) -> SlotMachine {
        SlotMachine::with_seed(Arc::new(SymbolCatalog::standard()), WildMode::Transparent, seed)
    }

    #[test]
    fn test_seeded_machines_agree() {
        let config = SlotConfiguration { rows: 3, cols: 3, spin_cost: 10 };
        let mut a = machine(42);
        let mut b = machine(42);
        for _ in 0..20 {
            assert_eq!(
                a.play(&config, &STARTER_SYMBOLS).unwrap(),
                b.play(&config, &STARTER_SYMBOLS).unwrap()
            );
        }
    }

    #[test]
    fn test_stats_accumulate() {
        let config = SlotConfiguration { rows: 3, cols: 3, spin_cost: 10 };
        let mut m = machine(3);
        let mut paid = 0;
        for _ in 0..500 {
            paid += m.play(&config, &STARTER_SYMBOLS).unwrap().evaluation.total_payout;
        }
        let stats = m.stats();
        assert_eq!(stats.total_spins, 500);
        assert_eq!(stats.total_bet, 5000);
        assert_eq!(stats.total_paid, paid);
        assert!(stats.hit_rate() > 0.0 && stats.hit_rate() < 100.0);

        m.reset_stats();
        assert_eq!(m.stats(), &MachineStats::default());
    }

    #[test]
    fn test_single_symbol_always_wins() {
        let config = SlotConfiguration { rows: 3, cols: 3, spin_cost: 5 };
        let mut m = machine(1);
        let result = m.play(&config, &[ids::PLUM]).unwrap();
        // 3 rows + 2 diagonals, plum pays 5 per spin-cost unit
        assert_eq!(result.evaluation.win_count(), 5);
        assert_eq!(result.evaluation.total_payout, 5 * 5 * 5);
    }
}
