//! # bigslot-engine — Spin and payout engine for BigSlot
//!
//! Generates reel grids by weighted draw over the player's unlocked symbols
//! and evaluates them against a line paytable.
//!
//! ## Architecture
//!
//! ```text
//! SlotMachine
//!     │
//!     ├── SymbolCatalog (weights, base payouts, wild/scatter)
//!     ├── PayTable (rows + square-grid diagonals, WildMode)
//!     └── StdRng
//!           │
//!           v
//!     ReelGrid → Vec<WinLine> → WinTier
//! ```

pub mod config;
pub mod engine;
pub mod paytable;
pub mod spin;
pub mod symbols;

pub use config::*;
pub use engine::*;
pub use paytable::*;
pub use spin::{ReelGrid, WeightedTable};
pub use symbols::*;
