//! Entry signal aggregation.
//!
//! - `score`: bounded 0–100 quality score from five capped sub-scores.
//! - `filters`: admission filters that gate every entry (session, volume, trend).
//! - `aggregator`: setup matching and the final entry decision.
//!
//! Everything here reads the detectors' current state through a
//! `SignalContext`; nothing in this module mutates detector state.

pub mod aggregator;
pub mod filters;
pub mod score;

pub use aggregator::{Decision, EntrySignal, SignalAggregator};
pub use filters::{AdmissionFilter, FilterChain, SessionFilter, TrendFilter, VolumeFilter};
pub use score::{QualityScore, QualityScorer};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::detectors::{
    FairValueGapTracker, GapUpdate, MarketContext, OrderBlockEngine, RecentEvents, SweepUpdate,
    Trend,
};
use crate::domain::{Bar, Direction, FairValueGap, StructureBreak};

/// Read-only view of one bar's detector state, indicators and events.
#[derive(Debug, Clone, Copy)]
pub struct SignalContext<'a> {
    pub bar: &'a Bar,
    pub market: MarketContext,
    pub events: &'a RecentEvents,
    pub sweeps: &'a SweepUpdate,
    pub structure_break: Option<&'a StructureBreak>,
    pub order_blocks: &'a OrderBlockEngine,
    pub gaps: &'a FairValueGapTracker,
    pub gap_update: &'a GapUpdate,
    pub trend_ema: Option<f64>,
    pub adx: Option<f64>,
    pub volume_ema: Option<f64>,
}

impl<'a> SignalContext<'a> {
    pub fn recent_sweep(&self, direction: Direction) -> bool {
        self.events.sweeps.is_active(direction, self.bar.index)
    }

    pub fn recent_break(&self, direction: Direction) -> bool {
        self.events.breaks.is_active(direction, self.bar.index)
    }

    /// Bar volume over its EMA.
    pub fn volume_ratio(&self) -> Option<f64> {
        self.volume_ema
            .filter(|v| *v > 0.0)
            .map(|v| self.bar.volume / v)
    }

    /// Close on the trend side of the EMA, with a rising (or falling)
    /// three-bar structure or a recent break in the same direction.
    pub fn trend_aligned(&self, direction: Direction) -> bool {
        let Some(ema) = self.trend_ema else {
            return false;
        };
        let structure = match direction {
            Direction::Bullish => self.market.trend == Trend::Up,
            Direction::Bearish => self.market.trend == Trend::Down,
        };
        let above = (self.bar.close - ema) * direction.sign() > 0.0;
        (structure || self.recent_break(direction)) && above
    }

    /// Most recent same-direction gap that was open coming into this bar.
    /// A gap this bar filled still counts.
    pub fn open_gap(&self, direction: Direction) -> Option<&'a FairValueGap> {
        let just_filled = self
            .gap_update
            .filled
            .iter()
            .filter(|g| g.kind == direction)
            .max_by_key(|g| g.detected_bar);
        let still_open = self.gaps.latest_open(direction);
        match (just_filled, still_open) {
            (Some(a), Some(b)) => Some(if a.detected_bar > b.detected_bar { a } else { b }),
            (a, b) => a.or(b),
        }
    }
}

/// Outcome of the entry gates for one bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum GateVerdict {
    Passed,
    /// Not enough bars processed yet.
    Warmup,
    OutsideSession,
    CoolingDown { until: NaiveDateTime },
    DailyCapReached { trades: u32 },
    LowVolume,
    AgainstTrend,
    MissingIndicator { name: String },
    BelowQuality { score: u8, threshold: u8 },
}

impl GateVerdict {
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    pub fn name(&self) -> &'static str {
        match self {
            GateVerdict::Passed => "passed",
            GateVerdict::Warmup => "warmup",
            GateVerdict::OutsideSession => "outside_session",
            GateVerdict::CoolingDown { .. } => "cooling_down",
            GateVerdict::DailyCapReached { .. } => "daily_cap_reached",
            GateVerdict::LowVolume => "low_volume",
            GateVerdict::AgainstTrend => "against_trend",
            GateVerdict::MissingIndicator { .. } => "missing_indicator",
            GateVerdict::BelowQuality { .. } => "below_quality",
        }
    }
}

/// Owned detector state for building a `SignalContext` in tests.
#[cfg(test)]
pub(crate) struct Fixture {
    pub bar: Bar,
    pub market: MarketContext,
    pub events: RecentEvents,
    pub sweeps: SweepUpdate,
    pub structure_break: Option<StructureBreak>,
    pub order_blocks: OrderBlockEngine,
    pub gaps: FairValueGapTracker,
    pub gap_update: GapUpdate,
    pub trend_ema: Option<f64>,
    pub adx: Option<f64>,
    pub volume_ema: Option<f64>,
}

#[cfg(test)]
impl Fixture {
    /// Bar 10 at 09:40, retracing into the bullish zone `[98, 101]` built by
    /// `with_bullish_zone`.
    pub fn new() -> Self {
        let mut bar = crate::indicators::make_ohlc_bars(&[(101.5, 102.0, 100.0, 101.8)])[0].clone();
        bar.index = 10;
        bar.time += chrono::Duration::minutes(10);
        Self {
            bar,
            market: MarketContext {
                trend: Trend::Neutral,
                equilibrium: None,
            },
            events: RecentEvents::new(20),
            sweeps: SweepUpdate::default(),
            structure_break: None,
            order_blocks: OrderBlockEngine::new(10, 3.5, 30),
            gaps: FairValueGapTracker::new(50),
            gap_update: GapUpdate::default(),
            trend_ema: None,
            adx: None,
            volume_ema: None,
        }
    }

    pub fn with_bullish_zone(mut self) -> Self {
        let mut history = crate::detectors::BarHistory::new(16);
        for bar in crate::indicators::make_ohlc_bars(&[
            (100.0, 101.0, 99.0, 100.5),
            (100.5, 101.0, 98.0, 98.5),
            (98.5, 100.0, 98.2, 99.8),
            (99.8, 104.0, 99.5, 103.5),
        ]) {
            history.push(bar);
        }
        let brk = StructureBreak {
            direction: Direction::Bullish,
            level: 99.0,
            formation_bar: 2,
            bar_index: 3,
        };
        self.order_blocks.on_structure_break(&brk, &history, Some(2.0));
        self
    }

    pub fn with_recent(mut self, direction: Direction) -> Self {
        self.events.sweeps.open(direction, 6);
        self.events.breaks.open(direction, 8);
        self
    }

    pub fn ctx(&self) -> SignalContext<'_> {
        SignalContext {
            bar: &self.bar,
            market: self.market,
            events: &self.events,
            sweeps: &self.sweeps,
            structure_break: self.structure_break.as_ref(),
            order_blocks: &self.order_blocks,
            gaps: &self.gaps,
            gap_update: &self.gap_update,
            trend_ema: self.trend_ema,
            adx: self.adx,
            volume_ema: self.volume_ema,
        }
    }
}
