//! TradeRecord: a completed round-trip trade and the tags that explain it.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::position::PositionSide;

/// Setup that opened a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySetup {
    /// Sweep, matching break of structure, then a retrace into the order block.
    SweepBosOrderBlock,
    /// Sweep and matching break of structure on the same bar.
    SweepBos,
    /// Recent sweep and break, wick inside an unfilled fair value gap.
    SweepBosGap,
    /// Recent sweep and break, price on the discount/premium side of
    /// equilibrium, with zone confluence.
    EquilibriumConfluence,
}

impl EntrySetup {
    pub fn name(self) -> &'static str {
        match self {
            EntrySetup::SweepBosOrderBlock => "sweep_bos_order_block",
            EntrySetup::SweepBos => "sweep_bos",
            EntrySetup::SweepBosGap => "sweep_bos_gap",
            EntrySetup::EquilibriumConfluence => "equilibrium_confluence",
        }
    }
}

impl fmt::Display for EntrySetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a position (or part of it) was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit1,
    TakeProfit2,
    TimeStop,
}

impl ExitReason {
    pub fn name(self) -> &'static str {
        match self {
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TakeProfit1 => "take_profit_1",
            ExitReason::TakeProfit2 => "take_profit_2",
            ExitReason::TimeStop => "time_stop",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Win/loss classification fed back into the risk counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeOutcome {
    Win,
    Loss,
}

/// A single exit leg: partial or full.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitFill {
    pub bar_index: usize,
    pub reason: ExitReason,
    pub quantity: u32,
    pub price: f64,
}

/// A complete round-trip trade, emitted once the last unit is closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub side: PositionSide,
    pub setup: EntrySetup,

    pub entry_bar: usize,
    pub entry_price: f64,
    pub exit_bar: usize,
    pub exit_price: f64,
    pub quantity: u32,

    /// Sum over exit legs of signed price move times quantity.
    pub realized_points: f64,
    pub bars_held: usize,
    pub exit_reason: ExitReason,
    pub outcome: TradeOutcome,
}

impl TradeRecord {
    pub fn is_winner(&self) -> bool {
        self.outcome == TradeOutcome::Win
    }
}
