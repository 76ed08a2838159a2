//! # bigslot-state — Progression, upgrades and persistence
//!
//! ```text
//! ┌──────────────────────────── GameSession ────────────────────────────┐
//! │  ProgressionState ◄── UpgradeCatalog        SlotMachine (engine)     │
//! │        │                                                             │
//! │        ├──► EventBus (notifications)                                 │
//! │        └──► PersistenceAdapter ──► KeyValueStore (memory | file)     │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The session is the only writer of its progression record. Share the
//! [`bigslot_event::EventBus`] to observe it.

pub mod persistence;
pub mod progression;
pub mod session;
pub mod upgrades;

pub use persistence::*;
pub use progression::*;
pub use session::*;
pub use upgrades::*;
