//! GameEvent — a notification with its timestamp

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bigslot_core::{Amount, SymbolId};
use bigslot_engine::{ReelGrid, WinLine, WinTier};

/// Notification kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    CoinsChanged { delta: i64, total: Amount },
    GemsChanged { delta: i64, total: Amount },
    SpinsChanged { remaining: u32 },
    StageChanged { stage: u32 },
    SymbolUnlocked { symbol: SymbolId },
    SlotExpanded { rows: u8, cols: u8 },
    BetChanged { spin_cost: Amount },
    UpgradeApplied { id: String, level: u32 },
    RunStarted { run: u32 },
    RunCompleted { stage_reached: u32 },
    SpinCompleted { grid: ReelGrid },
    Win { lines: Vec<WinLine>, total_payout: Amount, tier: WinTier },
}

impl GameEvent {
    /// Stable event name, `category:field`
    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::CoinsChanged { .. } => "state:coins",
            GameEvent::GemsChanged { .. } => "state:gems",
            GameEvent::SpinsChanged { .. } => "state:spins",
            GameEvent::StageChanged { .. } => "state:stage",
            GameEvent::SymbolUnlocked { .. } => "state:symbols",
            GameEvent::SlotExpanded { .. } => "state:slot",
            GameEvent::BetChanged { .. } => "state:bet",
            GameEvent::UpgradeApplied { .. } => "state:upgrades",
            GameEvent::RunStarted { .. } => "run:start",
            GameEvent::RunCompleted { .. } => "run:complete",
            GameEvent::SpinCompleted { .. } => "spin:complete",
            GameEvent::Win { .. } => "win",
        }
    }

    /// Coin/gem delta as a signed amount
    pub fn signed(amount: Amount, negative: bool) -> i64 {
        let magnitude = i64::try_from(amount).unwrap_or(i64::MAX);
        if negative { -magnitude } else { magnitude }
    }
}

/// A game event with its emit time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event: GameEvent,
    pub timestamp: DateTime<Utc>,
}

impl EventEnvelope {
    /// Stamp an event with the current time
    pub fn new(event: GameEvent) -> Self {
        Self {
            event,
            timestamp: Utc::now(),
        }
    }

    /// Get event name
    pub fn name(&self) -> &'static str {
        self.event.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(GameEvent::CoinsChanged { delta: 5, total: 105 }.name(), "state:coins");
        assert_eq!(GameEvent::StageChanged { stage: 2 }.name(), "state:stage");
        assert_eq!(
            GameEvent::Win { lines: vec![], total_payout: 0, tier: WinTier::None }.name(),
            "win"
        );
    }

    #[test]
    fn test_signed_delta() {
        assert_eq!(GameEvent::signed(10, false), 10);
        assert_eq!(GameEvent::signed(10, true), -10);
        assert_eq!(GameEvent::signed(u64::MAX, false), i64::MAX);
    }

    #[test]
    fn test_envelope_serialization() {
        let envelope = EventEnvelope::new(GameEvent::SpinsChanged { remaining: 19 });
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["event"]["type"], "spins_changed");
        assert_eq!(json["event"]["remaining"], 19);

        let back: EventEnvelope = serde_json::from_value(json).unwrap();
        assert_eq!(back, envelope);
    }
}
