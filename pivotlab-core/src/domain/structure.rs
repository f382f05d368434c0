//! Market-structure events: swing pivots, liquidity sweeps, structure breaks.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Direction of a market event or trade setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Bullish,
    Bearish,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Bullish => Direction::Bearish,
            Direction::Bearish => Direction::Bullish,
        }
    }

    /// +1.0 for bullish, -1.0 for bearish. Used for indicator series output.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Bullish => 1.0,
            Direction::Bearish => -1.0,
        }
    }
}

/// Which extreme a swing pivot marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwingKind {
    High,
    Low,
}

/// A confirmed local pivot high or low.
///
/// `swept` flips from false to true once, when a liquidity sweep takes the
/// level. It never reverts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    pub bar_index: usize,
    pub time: NaiveDateTime,
    pub price: f64,
    pub kind: SwingKind,
    pub swept: bool,
}

impl SwingPoint {
    pub fn new(bar_index: usize, time: NaiveDateTime, price: f64, kind: SwingKind) -> Self {
        Self {
            bar_index,
            time,
            price,
            kind,
            swept: false,
        }
    }

    /// Marks the pivot swept. Returns false if it was already swept.
    pub fn mark_swept(&mut self) -> bool {
        if self.swept {
            return false;
        }
        self.swept = true;
        true
    }
}

/// Price traded through a resting pivot and closed back on the origin side.
///
/// A bullish sweep takes a swing low (stops below the market) and closes
/// back above it; a bearish sweep is the mirror with a swing high.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepEvent {
    pub direction: Direction,
    pub bar_index: usize,
    pub pivot: SwingPoint,
}

impl SweepEvent {
    pub fn level(&self) -> f64 {
        self.pivot.price
    }
}

/// A confirmed break of structure.
///
/// `direction` is the direction price broke: a body closing below the level
/// is a bearish break, above is bullish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureBreak {
    pub direction: Direction,
    pub level: f64,
    pub formation_bar: usize,
    pub bar_index: usize,
}
