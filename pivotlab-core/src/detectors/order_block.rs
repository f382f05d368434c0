//! Order block tracking.
//!
//! On the bar a break of structure confirms, the engine walks back for the
//! nearest candle whose body opposes the break. The zone spans the high/low
//! extremes from that candle up to (not including) the break bar, and its
//! volume is the volume traded across the same window. Zones wider than
//! `ATR * atr_multiplier` are discarded.

use tracing::{debug, warn};

use super::history::BarHistory;
use crate::domain::{Bar, Direction, OrderBlock, StructureBreak};

/// What happened to the candidate zone of a structure break.
#[derive(Debug, Clone, PartialEq)]
pub enum ZoneOutcome {
    Accepted(OrderBlock),
    /// No opposing candle within the scan limit.
    NoOrigin,
    /// Zero-height window.
    Degenerate,
    /// Wider than the ATR bound.
    TooWide { height: f64, limit: f64 },
    /// ATR not ready yet.
    MissingAtr,
}

#[derive(Debug, Clone)]
pub struct OrderBlockEngine {
    scan_limit: usize,
    atr_multiplier: f64,
    max_blocks: usize,
    blocks: Vec<OrderBlock>,
}

impl OrderBlockEngine {
    pub fn new(scan_limit: usize, atr_multiplier: f64, max_blocks: usize) -> Self {
        assert!(scan_limit >= 1, "scan_limit must be >= 1");
        assert!(max_blocks >= 1, "max_blocks must be >= 1");
        Self {
            scan_limit,
            atr_multiplier,
            max_blocks,
            blocks: Vec::with_capacity(max_blocks + 1),
        }
    }

    /// Invalidate live zones breached by `bar`. Zones created on this bar
    /// are not checked. Returns the zones invalidated, which leave the set.
    pub fn update(&mut self, bar: &Bar) -> Vec<OrderBlock> {
        let mut invalidated = Vec::new();
        self.blocks.retain_mut(|ob| {
            if ob.created_bar < bar.index && ob.is_breached_by(bar) {
                ob.invalidated = true;
                debug!(
                    bar = bar.index,
                    start = ob.start_bar_index,
                    kind = ?ob.kind,
                    "order block invalidated"
                );
                invalidated.push(ob.clone());
                false
            } else {
                true
            }
        });
        invalidated
    }

    /// Derive the zone for a freshly confirmed break. `history.current()`
    /// must be the break bar.
    pub fn on_structure_break(
        &mut self,
        brk: &StructureBreak,
        history: &BarHistory,
        atr: Option<f64>,
    ) -> ZoneOutcome {
        let outcome = self.derive(brk, history, atr);
        match &outcome {
            ZoneOutcome::Accepted(ob) => {
                debug!(
                    bar = brk.bar_index,
                    start = ob.start_bar_index,
                    top = ob.top,
                    bottom = ob.bottom,
                    "order block accepted"
                );
                self.insert(ob.clone());
            }
            ZoneOutcome::MissingAtr => {
                warn!(bar = brk.bar_index, "ATR not ready; order block skipped");
            }
            other => debug!(bar = brk.bar_index, ?other, "order block discarded"),
        }
        outcome
    }

    fn derive(&self, brk: &StructureBreak, history: &BarHistory, atr: Option<f64>) -> ZoneOutcome {
        let opposing = |bar: &Bar| match brk.direction {
            Direction::Bullish => bar.is_bearish(),
            Direction::Bearish => bar.is_bullish(),
        };
        let Some(origin_offset) = (1..=self.scan_limit)
            .find(|&k| history.back(k).is_some_and(|b| opposing(b)))
        else {
            return ZoneOutcome::NoOrigin;
        };
        let Some(origin) = history.back(origin_offset) else {
            return ZoneOutcome::NoOrigin;
        };

        let mut top = f64::NEG_INFINITY;
        let mut bottom = f64::INFINITY;
        let mut volume = 0.0;
        for bar in history.range(1, origin_offset) {
            top = top.max(bar.high);
            bottom = bottom.min(bar.low);
            volume += bar.volume;
        }

        let height = top - bottom;
        if height.is_nan() || height <= 0.0 {
            return ZoneOutcome::Degenerate;
        }
        let Some(atr) = atr else {
            return ZoneOutcome::MissingAtr;
        };
        let limit = atr * self.atr_multiplier;
        if height > limit {
            return ZoneOutcome::TooWide { height, limit };
        }

        ZoneOutcome::Accepted(OrderBlock {
            start_bar_index: origin.index,
            start_time: origin.time,
            created_bar: brk.bar_index,
            top,
            bottom,
            kind: brk.direction,
            volume,
            invalidated: false,
            consumed: false,
        })
    }

    fn insert(&mut self, ob: OrderBlock) {
        self.blocks.push(ob);
        while self.blocks.len() > self.max_blocks {
            let oldest = self
                .blocks
                .iter()
                .enumerate()
                .min_by_key(|(_, b)| b.start_bar_index)
                .map(|(i, _)| i);
            match oldest {
                Some(i) => {
                    let evicted = self.blocks.remove(i);
                    debug!(start = evicted.start_bar_index, "order block evicted");
                }
                None => break,
            }
        }
    }

    /// Most recent tradeable zone of `kind` that `bar` retraces into.
    /// Zones created on `bar` itself are skipped.
    pub fn retraced_zone(&self, kind: Direction, bar: &Bar) -> Option<&OrderBlock> {
        self.blocks
            .iter()
            .filter(|ob| ob.kind == kind && ob.is_tradeable() && ob.created_bar < bar.index)
            .filter(|ob| ob.is_retraced_by(bar))
            .max_by_key(|ob| ob.created_bar)
    }

    /// Mark the zone starting at `start_bar_index` as used by an entry.
    pub fn consume(&mut self, start_bar_index: usize) -> bool {
        match self
            .blocks
            .iter_mut()
            .find(|ob| ob.start_bar_index == start_bar_index)
        {
            Some(ob) if !ob.consumed => {
                ob.consumed = true;
                true
            }
            _ => false,
        }
    }

    pub fn blocks(&self) -> &[OrderBlock] {
        &self.blocks
    }

    /// Live bullish count minus live bearish count.
    pub fn net_count(&self) -> f64 {
        self.blocks.iter().map(|ob| ob.kind.sign()).sum()
    }
}
