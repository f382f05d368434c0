//! Per-bar report returned by `StrategyEngine::on_bar`.

use serde::{Deserialize, Serialize};

use crate::detectors::MarketContext;
use crate::domain::{
    ExitFill, FairValueGap, OrderBlock, Position, StructureBreak, SweepEvent, SwingPoint,
    TradeRecord,
};
use crate::signal::{EntrySignal, GateVerdict};

/// Everything that happened on one bar, in pipeline order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarReport {
    pub bar_index: usize,

    // ── Detectors ──
    pub swing_high: Option<SwingPoint>,
    pub swing_low: Option<SwingPoint>,
    pub sweeps: Vec<SweepEvent>,
    pub structure_break: Option<StructureBreak>,
    pub order_block: Option<OrderBlock>,
    pub invalidated_blocks: Vec<OrderBlock>,
    pub gap: Option<FairValueGap>,
    pub filled_gaps: Vec<FairValueGap>,
    pub market: MarketContext,

    // ── Position ──
    pub exits: Vec<ExitFill>,
    pub closed_trade: Option<TradeRecord>,
    /// `None` while a position stays open through the bar.
    pub gate: Option<GateVerdict>,
    pub signal: Option<EntrySignal>,
    pub entered: Option<Position>,
}

impl BarReport {
    /// True when any detector fired on this bar.
    pub fn has_structure_event(&self) -> bool {
        self.swing_high.is_some()
            || self.swing_low.is_some()
            || !self.sweeps.is_empty()
            || self.structure_break.is_some()
            || self.order_block.is_some()
            || self.gap.is_some()
    }

    pub fn is_quiet(&self) -> bool {
        !self.has_structure_event()
            && self.exits.is_empty()
            && self.entered.is_none()
            && self.invalidated_blocks.is_empty()
            && self.filled_gaps.is_empty()
    }
}
