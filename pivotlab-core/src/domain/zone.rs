//! Price zones derived from structure: order blocks and fair value gaps.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::bar::Bar;
use super::structure::Direction;

/// Supply/demand zone left by the last opposing candle before a structure break.
///
/// A bullish block sits below the market after a bullish break and is
/// invalidated when a later bar's low trades under `bottom`. A bearish block
/// is the mirror. Invalidation is permanent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBlock {
    pub start_bar_index: usize,
    pub start_time: NaiveDateTime,
    /// Bar on which the originating structure break confirmed.
    pub created_bar: usize,
    pub top: f64,
    pub bottom: f64,
    pub kind: Direction,
    pub volume: f64,
    pub invalidated: bool,
    /// Set once an entry has traded off this zone.
    pub consumed: bool,
}

impl OrderBlock {
    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    /// Eligible to trigger an entry.
    pub fn is_tradeable(&self) -> bool {
        !self.invalidated && !self.consumed
    }

    /// Whether `bar` breaches the zone on the side that invalidates it.
    pub fn is_breached_by(&self, bar: &Bar) -> bool {
        match self.kind {
            Direction::Bullish => bar.low < self.bottom,
            Direction::Bearish => bar.high > self.top,
        }
    }

    /// Whether `bar` retraces into the zone and closes back on the
    /// trade side of it.
    ///
    /// Long: the low reaches the top of the zone and the close holds above
    /// its bottom. Short: the high reaches the bottom and the close holds
    /// below the top.
    pub fn is_retraced_by(&self, bar: &Bar) -> bool {
        match self.kind {
            Direction::Bullish => bar.low <= self.top && bar.close >= self.bottom,
            Direction::Bearish => bar.high >= self.bottom && bar.close <= self.top,
        }
    }
}

/// Three-candle imbalance, reported when the third candle closes.
///
/// The second candle's range clears the first's: bullish when its low is
/// above the first high, bearish when its high is below the first low. The
/// gap spans the space between those two levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairValueGap {
    pub upper: f64,
    pub lower: f64,
    /// First candle of the pattern.
    pub bar_index: usize,
    /// Bar on which the pattern completed.
    pub detected_bar: usize,
    pub kind: Direction,
    pub filled: bool,
}

impl FairValueGap {
    /// Whether the bar's range touches the gap.
    pub fn is_touched_by(&self, bar: &Bar) -> bool {
        bar.low <= self.upper && bar.high >= self.lower
    }

    /// Whether the trade-side wick of `bar` sits inside the gap: the low for
    /// a bullish gap, the high for a bearish one.
    pub fn holds_wick_of(&self, bar: &Bar) -> bool {
        let wick = match self.kind {
            Direction::Bullish => bar.low,
            Direction::Bearish => bar.high,
        };
        wick >= self.lower && wick <= self.upper
    }
}
