//! Reel grid generation by weighted draw

use rand::Rng;
use serde::{Deserialize, Serialize};

use bigslot_core::{SlotError, SlotResult, SymbolId};

use crate::config::{MAX_GRID_DIM, SlotConfiguration};
use crate::symbols::SymbolCatalog;

/// Result of one spin: columns (reels) of `rows` symbol ids each
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawGrid")]
pub struct ReelGrid {
    columns: Vec<Vec<SymbolId>>,
}

/// Unchecked wire form, validated through [`ReelGrid::from_columns`]
#[derive(Deserialize)]
struct RawGrid {
    columns: Vec<Vec<SymbolId>>,
}

impl TryFrom<RawGrid> for ReelGrid {
    type Error = SlotError;

    fn try_from(raw: RawGrid) -> SlotResult<Self> {
        Self::from_columns(raw.columns)
    }
}

impl ReelGrid {
    /// Build from columns; all columns must be non-empty, equally tall and
    /// at most `MAX_GRID_DIM` in either dimension
    pub fn from_columns(columns: Vec<Vec<SymbolId>>) -> SlotResult<Self> {
        let Some(first) = columns.first() else {
            return Err(SlotError::InvalidGrid("grid has no columns".into()));
        };
        let rows = first.len();
        if rows == 0 {
            return Err(SlotError::InvalidGrid("grid has no rows".into()));
        }
        let max = MAX_GRID_DIM as usize;
        if rows > max || columns.len() > max {
            return Err(SlotError::InvalidGrid(format!(
                "{rows}x{} exceeds the {MAX_GRID_DIM}x{MAX_GRID_DIM} maximum",
                columns.len()
            )));
        }
        if let Some(col) = columns.iter().position(|c| c.len() != rows) {
            return Err(SlotError::InvalidGrid(format!(
                "column {col} has {} rows, expected {rows}",
                columns[col].len()
            )));
        }
        Ok(Self { columns })
    }

    /// Number of reels
    pub fn cols(&self) -> usize {
        self.columns.len()
    }

    /// Symbols per reel
    pub fn rows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    /// Symbol at (col, row)
    pub fn get(&self, col: usize, row: usize) -> Option<SymbolId> {
        self.columns.get(col).and_then(|c| c.get(row)).copied()
    }

    /// One reel, top to bottom
    pub fn column(&self, col: usize) -> Option<&[SymbolId]> {
        self.columns.get(col).map(Vec::as_slice)
    }

    /// All reels, left to right
    pub fn columns(&self) -> &[Vec<SymbolId>] {
        &self.columns
    }

    /// One row, left to right
    pub fn row(&self, row: usize) -> Vec<SymbolId> {
        self.columns.iter().filter_map(|c| c.get(row).copied()).collect()
    }

    /// Every cell with its position
    pub fn cells(&self) -> impl Iterator<Item = ((usize, usize), SymbolId)> + '_ {
        self.columns
            .iter()
            .enumerate()
            .flat_map(|(col, c)| c.iter().enumerate().map(move |(row, &s)| ((col, row), s)))
    }

    /// Take the reels out of the grid
    pub fn into_columns(self) -> Vec<Vec<SymbolId>> {
        self.columns
    }
}

/// Cumulative-weight table over a set of symbols
///
/// Zero-weight symbols are left out, so they can never be drawn.
#[derive(Debug, Clone)]
pub struct WeightedTable {
    entries: Vec<(SymbolId, u64)>,
    total: u64,
    last: SymbolId,
}

impl WeightedTable {
    /// Build from an unlocked set; duplicates count once
    pub fn build(catalog: &SymbolCatalog, unlocked: &[SymbolId]) -> SlotResult<Self> {
        let mut entries: Vec<(SymbolId, u64)> = Vec::with_capacity(unlocked.len());
        let mut total = 0u64;

        for &id in unlocked {
            let symbol = catalog.lookup(id)?;
            if symbol.rarity_weight == 0 || entries.iter().any(|(seen, _)| *seen == id) {
                continue;
            }
            total += u64::from(symbol.rarity_weight);
            entries.push((id, total));
        }

        let Some(&(last, _)) = entries.last() else {
            return Err(SlotError::EmptyDrawPool);
        };
        Ok(Self { entries, total, last })
    }

    /// Sum of all drawable weights
    pub fn total_weight(&self) -> u64 {
        self.total
    }

    /// Symbols that can be drawn, in table order
    pub fn symbols(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    /// First symbol whose cumulative weight exceeds `roll`
    pub fn select(&self, roll: u64) -> SymbolId {
        self.entries
            .iter()
            .find(|(_, cumulative)| *cumulative > roll)
            .map_or(self.last, |(id, _)| *id)
    }

    /// Uniform roll in `[0, total)` then select
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> SymbolId {
        self.select(rng.random_range(0..self.total))
    }
}

/// Generate a grid of `config.cols` reels with `config.rows` independent
/// draws each. Touches nothing but the rng.
pub fn spin<R: Rng + ?Sized>(
    catalog: &SymbolCatalog,
    config: &SlotConfiguration,
    unlocked: &[SymbolId],
    rng: &mut R,
) -> SlotResult<ReelGrid> {
    if config.rows == 0
        || config.cols == 0
        || config.rows > MAX_GRID_DIM
        || config.cols > MAX_GRID_DIM
    {
        return Err(SlotError::config(format!(
            "cannot spin a {}x{} grid",
            config.rows, config.cols
        )));
    }

    let table = WeightedTable::build(catalog, unlocked)?;
    let columns = (0..config.cols)
        .map(|_| (0..config.rows).map(|_| table.draw(rng)).collect())
        .collect();

    Ok(ReelGrid { columns })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::{STARTER_SYMBOLS, Symbol, ids};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn config(rows: u8, cols: u8) -> SlotConfiguration {
        SlotConfiguration { rows, cols, spin_cost: 10 }
    }

    #[test]
    fn test_grid_shape() {
        let catalog = SymbolCatalog::standard();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..100 {
            let grid = spin(&catalog, &config(3, 5), &STARTER_SYMBOLS, &mut rng).unwrap();
            assert_eq!(grid.cols(), 5);
            assert!(grid.columns().iter().all(|c| c.len() == 3));
            assert!(grid.cells().all(|(_, s)| STARTER_SYMBOLS.contains(&s)));
        }
    }

    #[test]
    fn test_cumulative_selection() {
        let catalog = SymbolCatalog::standard();
        // cherry 80, lemon 75
        let table = WeightedTable::build(&catalog, &[ids::CHERRY, ids::LEMON]).unwrap();
        assert_eq!(table.total_weight(), 155);
        assert_eq!(table.select(0), ids::CHERRY);
        assert_eq!(table.select(79), ids::CHERRY);
        assert_eq!(table.select(80), ids::LEMON);
        assert_eq!(table.select(154), ids::LEMON);
    }

    #[test]
    fn test_duplicates_count_once() {
        let catalog = SymbolCatalog::standard();
        let table = WeightedTable::build(&catalog, &[ids::BELL, ids::BELL, ids::BAR]).unwrap();
        assert_eq!(table.total_weight(), 70);
        assert_eq!(table.symbols().count(), 2);
    }

    #[test]
    fn test_zero_weight_never_drawn() {
        let catalog = SymbolCatalog::new(vec![
            Symbol::regular(1, "common", 10, 1),
            Symbol::regular(2, "never", 0, 50),
            Symbol::regular(3, "rare", 1, 5),
        ])
        .unwrap();
        let unlocked = [SymbolId(1), SymbolId(2), SymbolId(3)];
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let grid = spin(&catalog, &config(5, 5), &unlocked, &mut rng).unwrap();
        assert!(grid.cells().all(|(_, s)| s != SymbolId(2)));
    }

    #[test]
    fn test_empty_pool() {
        let catalog = SymbolCatalog::new(vec![Symbol::regular(1, "never", 0, 1)]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(matches!(
            spin(&catalog, &config(3, 3), &[SymbolId(1)], &mut rng),
            Err(SlotError::EmptyDrawPool)
        ));
        assert!(matches!(
            spin(&catalog, &config(3, 3), &[], &mut rng),
            Err(SlotError::EmptyDrawPool)
        ));
    }

    #[test]
    fn test_unknown_unlocked_symbol() {
        let catalog = SymbolCatalog::standard();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(matches!(
            spin(&catalog, &config(3, 3), &[ids::CHERRY, SymbolId(500)], &mut rng),
            Err(SlotError::UnknownSymbol(SymbolId(500)))
        ));
    }

    #[test]
    fn test_ragged_grid_rejected() {
        assert!(ReelGrid::from_columns(vec![]).is_err());
        assert!(ReelGrid::from_columns(vec![vec![]]).is_err());
        assert!(ReelGrid::from_columns(vec![vec![ids::BELL], vec![ids::BELL, ids::BAR]]).is_err());

        let grid = ReelGrid::from_columns(vec![vec![ids::BELL, ids::BAR], vec![ids::PLUM, ids::SEVEN]]).unwrap();
        assert_eq!(grid.row(1), vec![ids::BAR, ids::SEVEN]);
        assert_eq!(grid.column(1), Some(&[ids::PLUM, ids::SEVEN][..]));
        assert_eq!(grid.get(2, 0), None);

        let tall = vec![vec![ids::BELL; MAX_GRID_DIM as usize + 1]; 3];
        assert!(matches!(ReelGrid::from_columns(tall), Err(SlotError::InvalidGrid(_))));
        let wide = vec![vec![ids::BELL; 3]; 259];
        assert!(matches!(ReelGrid::from_columns(wide), Err(SlotError::InvalidGrid(_))));
    }

    #[test]
    fn test_oversized_spin_rejected() {
        let catalog = SymbolCatalog::standard();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let result = spin(&catalog, &config(3, MAX_GRID_DIM + 1), &STARTER_SYMBOLS, &mut rng);
        assert!(matches!(result, Err(SlotError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_deserialize_checks_bounds() {
        let ok: ReelGrid = serde_json::from_str(r#"{"columns": [[1, 2], [3, 4]]}"#).unwrap();
        assert_eq!(ok.rows(), 2);

        let wide = serde_json::json!({ "columns": vec![vec![1; 3]; 259] });
        assert!(serde_json::from_value::<ReelGrid>(wide).is_err());
        assert!(serde_json::from_str::<ReelGrid>(r#"{"columns": [[1], [2, 3]]}"#).is_err());
    }
}
