//! Trailing-stop proposals.
//!
//! A trail is computed from the bars *before* the current one, clamped so it
//! sits no further from the close than the open profit (and the configured
//! maximum), and only returned when it would tighten the stop while staying
//! on the right side of the close.

use serde::{Deserialize, Serialize};

use crate::detectors::BarHistory;
use crate::domain::{Position, PositionSide};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrailingMode {
    Off,
    /// Extreme of the last `lookback` bars.
    Structure { lookback: usize, start_after: usize },
    /// Extreme of the last `lookback` bars, each pushed away by
    /// `atr_multiple * ATR * (1 - (k - 1) * decay)` for the bar `k` back.
    WeightedAtr {
        lookback: usize,
        start_after: usize,
        atr_multiple: f64,
        decay: f64,
    },
}

impl Default for TrailingMode {
    fn default() -> Self {
        TrailingMode::Structure {
            lookback: 3,
            start_after: 5,
        }
    }
}

impl TrailingMode {
    pub fn weighted_atr() -> Self {
        TrailingMode::WeightedAtr {
            lookback: 5,
            start_after: 3,
            atr_multiple: 2.0,
            decay: 0.15,
        }
    }

    /// Trailing starts once `bars_since_entry` exceeds this.
    pub fn start_after(&self) -> Option<usize> {
        match *self {
            TrailingMode::Off => None,
            TrailingMode::Structure { start_after, .. }
            | TrailingMode::WeightedAtr { start_after, .. } => Some(start_after),
        }
    }

    /// Proposed new stop for `position`, or `None` when nothing should move.
    ///
    /// `history.current()` is the bar being managed. `max_trail` is the
    /// absolute cap on the stop's distance from the close.
    pub fn propose(
        &self,
        position: &Position,
        history: &BarHistory,
        atr: Option<f64>,
        max_trail: f64,
    ) -> Option<f64> {
        let start_after = self.start_after()?;
        if position.bars_since_entry <= start_after {
            return None;
        }
        let close = history.current()?.close;
        let side = position.side;

        let raw = match *self {
            TrailingMode::Off => return None,
            TrailingMode::Structure { lookback, .. } => extreme(side, history, lookback, |_| 0.0)?,
            TrailingMode::WeightedAtr {
                lookback,
                atr_multiple,
                decay,
                ..
            } => {
                let distance = atr? * atr_multiple;
                extreme(side, history, lookback, |k| {
                    distance * (1.0 - (k as f64 - 1.0) * decay)
                })?
            }
        };

        // Never trail further from the close than the profit on the table.
        let max_distance = position.open_points(close).min(max_trail);
        let trail = match side {
            PositionSide::Long if close - raw > max_distance => close - max_distance,
            PositionSide::Short if raw - close > max_distance => close + max_distance,
            _ => raw,
        };

        let improves = match side {
            PositionSide::Long => trail > position.stop_loss && trail < close,
            PositionSide::Short => trail < position.stop_loss && trail > close,
        };
        improves.then_some(trail)
    }
}

/// Lowest `low - offset(k)` (long) or highest `high + offset(k)` (short) over
/// the `lookback` bars before the current one.
fn extreme(
    side: PositionSide,
    history: &BarHistory,
    lookback: usize,
    offset: impl Fn(usize) -> f64,
) -> Option<f64> {
    (1..=lookback)
        .filter_map(|k| history.back(k).map(|bar| (k, bar)))
        .map(|(k, bar)| match side {
            PositionSide::Long => bar.low - offset(k),
            PositionSide::Short => bar.high + offset(k),
        })
        .reduce(|a, b| match side {
            PositionSide::Long => a.min(b),
            PositionSide::Short => a.max(b),
        })
}
