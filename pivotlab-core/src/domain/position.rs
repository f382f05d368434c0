//! Open position state.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::structure::Direction;
use super::trade::EntrySetup;

/// Side of an open position. A flat book has no `Position` at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// +1.0 for long, -1.0 for short.
    pub fn sign(self) -> f64 {
        match self {
            PositionSide::Long => 1.0,
            PositionSide::Short => -1.0,
        }
    }

    /// Long trades follow bullish setups, shorts bearish ones.
    pub fn from_direction(direction: Direction) -> Self {
        match direction {
            Direction::Bullish => PositionSide::Long,
            Direction::Bearish => PositionSide::Short,
        }
    }

    /// Whether `price` has moved to or beyond `level` in the trade's favor.
    pub fn reached(self, price: f64, level: f64) -> bool {
        match self {
            PositionSide::Long => price >= level,
            PositionSide::Short => price <= level,
        }
    }
}

/// The single live position.
///
/// Take-profit tiers do not change state: they reduce `quantity` and move
/// `stop_loss` in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub side: PositionSide,
    pub setup: EntrySetup,
    pub entry_bar: usize,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub initial_quantity: u32,
    pub quantity: u32,
    pub stop_loss: f64,
    pub take_profit_1: f64,
    pub take_profit_2: f64,
    pub bars_since_entry: usize,
    pub tp1_taken: bool,
}

impl Position {
    /// Price distance from entry to the initial stop.
    pub fn initial_risk(&self, initial_stop: f64) -> f64 {
        (self.entry_price - initial_stop).abs()
    }

    /// Unrealized points per unit at `price`.
    pub fn open_points(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.side.sign()
    }
}
