//! Host interface: everything the engine consumes from or produces for its
//! surroundings.
//!
//! The engine never executes orders itself. It submits requests and assumes
//! they fill at the bar's close (entries) or at the level that triggered
//! them (exits). Series and annotations are advisory: a host that drops
//! them must see exactly the same orders.

use serde::{Deserialize, Serialize};

use crate::domain::PositionSide;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderAction {
    EnterLong,
    EnterShort,
    ExitPartial,
    ExitFull,
}

impl OrderAction {
    pub fn entry(side: PositionSide) -> Self {
        match side {
            PositionSide::Long => OrderAction::EnterLong,
            PositionSide::Short => OrderAction::EnterShort,
        }
    }

    pub fn is_entry(self) -> bool {
        matches!(self, OrderAction::EnterLong | OrderAction::EnterShort)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub bar_index: usize,
    pub action: OrderAction,
    pub quantity: u32,
    /// Assumed fill price.
    pub price: f64,
    /// Setup name for entries, exit reason for exits.
    pub reason: String,
}

/// Per-bar output series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesTag {
    /// +1 swing high, -1 swing low.
    Swing,
    /// +1 bullish sweep, -1 bearish sweep.
    Sweep,
    /// +1 bullish break, -1 bearish break.
    StructureBreak,
    /// Live bullish zones minus live bearish zones.
    OrderBlocks,
    /// +1 bullish gap detected, -1 bearish.
    FairValueGap,
    /// Signed open quantity.
    Position,
    /// Quality score of the bar's entry candidate.
    Quality,
}

impl SeriesTag {
    pub const ALL: [SeriesTag; 7] = [
        SeriesTag::Swing,
        SeriesTag::Sweep,
        SeriesTag::StructureBreak,
        SeriesTag::OrderBlocks,
        SeriesTag::FairValueGap,
        SeriesTag::Position,
        SeriesTag::Quality,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SeriesTag::Swing => "swing",
            SeriesTag::Sweep => "sweep",
            SeriesTag::StructureBreak => "structure_break",
            SeriesTag::OrderBlocks => "order_blocks",
            SeriesTag::FairValueGap => "fair_value_gap",
            SeriesTag::Position => "position",
            SeriesTag::Quality => "quality",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Marker {
    SwingHigh,
    SwingLow,
    Sweep,
    StructureBreak,
    OrderBlock,
    FairValueGap,
    Entry,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub bar_index: usize,
    pub price: f64,
    pub marker: Marker,
    pub label: String,
}

pub trait Host {
    fn submit(&mut self, order: OrderRequest);

    /// Account equity for percentage-risk sizing.
    fn equity(&self) -> Option<f64> {
        None
    }

    fn write_series(&mut self, _bar_index: usize, _tag: SeriesTag, _value: f64) {}

    fn annotate(&mut self, _annotation: Annotation) {}
}

/// Drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHost;

impl Host for NullHost {
    fn submit(&mut self, _order: OrderRequest) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub bar_index: usize,
    pub tag: SeriesTag,
    pub value: f64,
}

/// Keeps every request, series value and annotation it receives.
#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    pub equity: Option<f64>,
    pub orders: Vec<OrderRequest>,
    pub series: Vec<SeriesPoint>,
    pub annotations: Vec<Annotation>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_equity(equity: f64) -> Self {
        Self {
            equity: Some(equity),
            ..Self::default()
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &OrderRequest> {
        self.orders.iter().filter(|o| o.action.is_entry())
    }

    pub fn exits(&self) -> impl Iterator<Item = &OrderRequest> {
        self.orders.iter().filter(|o| !o.action.is_entry())
    }

    /// Values of one series in bar order.
    pub fn series_of(&self, tag: SeriesTag) -> Vec<f64> {
        self.series
            .iter()
            .filter(|p| p.tag == tag)
            .map(|p| p.value)
            .collect()
    }
}

impl Host for RecordingHost {
    fn submit(&mut self, order: OrderRequest) {
        self.orders.push(order);
    }

    fn equity(&self) -> Option<f64> {
        self.equity
    }

    fn write_series(&mut self, bar_index: usize, tag: SeriesTag, value: f64) {
        self.series.push(SeriesPoint {
            bar_index,
            tag,
            value,
        });
    }

    fn annotate(&mut self, annotation: Annotation) {
        self.annotations.push(annotation);
    }
}
