//! Market context: short-term trend and the equilibrium level.

use serde::{Deserialize, Serialize};

use super::history::BarHistory;

/// Three-bar trend classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    /// Higher highs and higher lows across the last three bars.
    Up,
    /// Lower highs and lower lows across the last three bars.
    Down,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketContext {
    pub trend: Trend,
    /// Midpoint of the prior bars' high/low range; `None` on the first bar.
    pub equilibrium: Option<f64>,
}

impl MarketContext {
    pub fn evaluate(history: &BarHistory, equilibrium_lookback: usize) -> Self {
        Self {
            trend: trend(history),
            equilibrium: equilibrium(history, equilibrium_lookback),
        }
    }

    /// Long side: price at or below equilibrium.
    pub fn is_discount(&self, price: f64) -> bool {
        self.equilibrium.is_some_and(|eq| price <= eq)
    }

    /// Short side: price at or above equilibrium.
    pub fn is_premium(&self, price: f64) -> bool {
        self.equilibrium.is_some_and(|eq| price >= eq)
    }
}

fn trend(history: &BarHistory) -> Trend {
    let (Some(b0), Some(b1), Some(b2)) = (history.back(0), history.back(1), history.back(2)) else {
        return Trend::Neutral;
    };
    if b0.high > b1.high && b0.low > b1.low && b1.high > b2.high && b1.low > b2.low {
        Trend::Up
    } else if b0.high < b1.high && b0.low < b1.low && b1.high < b2.high && b1.low < b2.low {
        Trend::Down
    } else {
        Trend::Neutral
    }
}

fn equilibrium(history: &BarHistory, lookback: usize) -> Option<f64> {
    let (high, low) = history
        .range(1, lookback)
        .fold(None, |acc: Option<(f64, f64)>, bar| match acc {
            None => Some((bar.high, bar.low)),
            Some((h, l)) => Some((h.max(bar.high), l.min(bar.low))),
        })?;
    Some(low + (high - low) * 0.5)
}
