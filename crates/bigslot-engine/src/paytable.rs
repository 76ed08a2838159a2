//! Paytable and win calculation

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use bigslot_core::{Amount, SlotError, SlotResult, SymbolId};

use crate::config::RewardSettings;
use crate::spin::ReelGrid;
use crate::symbols::SymbolCatalog;

/// Shortest run that pays
pub const MIN_MATCH: usize = 3;

/// Scatters needed in one line for a bonus
pub const SCATTER_MIN: usize = 3;

/// Scatter bonus per scatter, in spin-cost units
pub const SCATTER_PAY_PER_SYMBOL: Amount = 10;

/// How wilds take part in line matching
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WildMode {
    /// Leading wilds are skipped when choosing the anchor and every wild
    /// extends the run
    #[default]
    Transparent,
    /// The first symbol is the anchor and wilds match nothing but themselves
    Plain,
}

/// Which line of the grid a win was found on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    /// Horizontal line through the given row
    Row(u8),
    /// Top-left to bottom-right
    Diagonal,
    /// Top-right to bottom-left
    AntiDiagonal,
}

/// What produced a win
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinKind {
    /// Left-anchored run of matching symbols
    Line,
    /// Scatter count anywhere on the line
    Scatter,
}

/// A payline definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payline {
    pub kind: LineKind,
    /// (col, row) for each reel, left to right
    pub positions: Vec<(u8, u8)>,
}

impl Payline {
    /// Create a straight line (same row across all reels)
    pub fn straight(row: u8, cols: u8) -> Self {
        Self {
            kind: LineKind::Row(row),
            positions: (0..cols).map(|col| (col, row)).collect(),
        }
    }

    /// `reel[i][i]`
    pub fn diagonal(size: u8) -> Self {
        Self {
            kind: LineKind::Diagonal,
            positions: (0..size).map(|i| (i, i)).collect(),
        }
    }

    /// `reel[i][size - 1 - i]`
    pub fn anti_diagonal(size: u8) -> Self {
        Self {
            kind: LineKind::AntiDiagonal,
            positions: (0..size).map(|i| (i, size - 1 - i)).collect(),
        }
    }
}

/// Lines evaluated for a grid: every row top to bottom, then both
/// diagonals when the grid is square
pub fn paylines_for(rows: u8, cols: u8) -> Vec<Payline> {
    let mut lines: Vec<Payline> = (0..rows).map(|row| Payline::straight(row, cols)).collect();
    if rows == cols {
        lines.push(Payline::diagonal(cols));
        lines.push(Payline::anti_diagonal(cols));
    }
    lines
}

/// A win result on a single line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinLine {
    /// Line the win was found on
    pub line: LineKind,
    /// Run or scatter win
    pub kind: WinKind,
    /// Winning symbol ID (the anchor, or the scatter)
    pub symbol_id: SymbolId,
    /// Run length, or scatter count
    pub match_count: u8,
    /// Coins paid
    pub payout: Amount,
    /// Positions of contributing symbols (col, row)
    pub positions: Vec<(u8, u8)>,
}

/// Win size relative to the spin cost
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinTier {
    #[default]
    None,
    Small,
    Medium,
    Big,
    Mega,
}

impl WinTier {
    /// Classify a total payout for a given spin cost
    pub fn classify(total_payout: Amount, spin_cost: Amount, rewards: &RewardSettings) -> Self {
        if total_payout == 0 {
            return WinTier::None;
        }
        let at_least = |multiplier: Amount| total_payout >= spin_cost.saturating_mul(multiplier);
        if at_least(rewards.mega_win_multiplier) {
            WinTier::Mega
        } else if at_least(rewards.big_win_multiplier) {
            WinTier::Big
        } else if at_least(rewards.medium_win_multiplier) {
            WinTier::Medium
        } else {
            WinTier::Small
        }
    }

    /// Big or better
    pub fn is_big(self) -> bool {
        self >= WinTier::Big
    }
}

/// Result of evaluating a grid
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub lines: Vec<WinLine>,
    pub total_payout: Amount,
}

impl Evaluation {
    fn from_lines(lines: Vec<WinLine>) -> Self {
        let total_payout = lines.iter().fold(0, |acc: Amount, w| acc.saturating_add(w.payout));
        Self { lines, total_payout }
    }

    /// Check if this is a winning spin
    pub fn is_win(&self) -> bool {
        self.total_payout > 0
    }

    /// Get win count
    pub fn win_count(&self) -> usize {
        self.lines.len()
    }
}

/// Complete paytable
#[derive(Debug, Clone)]
pub struct PayTable {
    catalog: Arc<SymbolCatalog>,
    wild_mode: WildMode,
}

impl PayTable {
    pub fn new(catalog: Arc<SymbolCatalog>, wild_mode: WildMode) -> Self {
        Self { catalog, wild_mode }
    }

    pub fn wild_mode(&self) -> WildMode {
        self.wild_mode
    }

    pub fn catalog(&self) -> &SymbolCatalog {
        &self.catalog
    }

    /// Evaluate every line of a grid
    ///
    /// Lines are independent: one spin may pay on several rows and both
    /// diagonals at once. Fails on any symbol missing from the catalog.
    pub fn calculate_wins(&self, grid: &ReelGrid, spin_cost: Amount) -> SlotResult<Vec<WinLine>> {
        for column in grid.columns() {
            self.catalog.ensure_known(column)?;
        }

        let (Ok(rows), Ok(cols)) = (u8::try_from(grid.rows()), u8::try_from(grid.cols())) else {
            return Err(SlotError::InvalidGrid(format!(
                "{}x{} is too large to evaluate",
                grid.rows(),
                grid.cols()
            )));
        };

        let mut wins = Vec::new();
        for payline in paylines_for(rows, cols) {
            let symbols: Vec<SymbolId> = payline
                .positions
                .iter()
                .filter_map(|&(col, row)| grid.get(col as usize, row as usize))
                .collect();
            if symbols.len() != payline.positions.len() {
                continue;
            }

            if let Some(win) = self.evaluate_run(&symbols, &payline, spin_cost)? {
                wins.push(win);
            }
            if let Some(win) = self.evaluate_scatter(&symbols, &payline, spin_cost) {
                wins.push(win);
            }
        }
        Ok(wins)
    }

    /// Evaluate a grid and total the payout
    pub fn evaluate(&self, grid: &ReelGrid, spin_cost: Amount) -> SlotResult<Evaluation> {
        Ok(Evaluation::from_lines(self.calculate_wins(grid, spin_cost)?))
    }

    fn evaluate_run(
        &self,
        symbols: &[SymbolId],
        payline: &Payline,
        spin_cost: Amount,
    ) -> SlotResult<Option<WinLine>> {
        if symbols.len() < MIN_MATCH {
            return Ok(None);
        }

        let wild = match self.wild_mode {
            WildMode::Transparent => self.catalog.wild_id(),
            WildMode::Plain => None,
        };
        let is_wild = |s: SymbolId| Some(s) == wild;

        // All-wild lines have no anchor
        let Some(anchor) = symbols.iter().copied().find(|&s| !is_wild(s)) else {
            return Ok(None);
        };

        // Strict left-anchored run
        let run = symbols
            .iter()
            .take_while(|&&s| s == anchor || is_wild(s))
            .count();
        if run < MIN_MATCH {
            return Ok(None);
        }

        let symbol = self.catalog.lookup(anchor)?;
        if !symbol.pays() {
            return Ok(None);
        }

        let payout = symbol
            .base_payout
            .saturating_mul((run - 2) as Amount)
            .saturating_mul(spin_cost);

        Ok(Some(WinLine {
            line: payline.kind,
            kind: WinKind::Line,
            symbol_id: anchor,
            match_count: u8::try_from(run).unwrap_or(u8::MAX),
            payout,
            positions: payline.positions[..run].to_vec(),
        }))
    }

    fn evaluate_scatter(&self, symbols: &[SymbolId], payline: &Payline, spin_cost: Amount) -> Option<WinLine> {
        let scatter = self.catalog.scatter_id()?;

        let positions: Vec<(u8, u8)> = symbols
            .iter()
            .zip(&payline.positions)
            .filter(|(s, _)| **s == scatter)
            .map(|(_, &pos)| pos)
            .collect();

        let count = positions.len();
        if count < SCATTER_MIN {
            return None;
        }

        Some(WinLine {
            line: payline.kind,
            kind: WinKind::Scatter,
            symbol_id: scatter,
            match_count: u8::try_from(count).unwrap_or(u8::MAX),
            payout: (count as Amount)
                .saturating_mul(SCATTER_PAY_PER_SYMBOL)
                .saturating_mul(spin_cost),
            positions,
        })
    }
}
