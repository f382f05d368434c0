//! Fair value gap tracking.
//!
//! At bar `i` a bullish gap exists when `low[i-1] > high[i-2]` (zone
//! `[high[i-2], low[i-1]]`) and a bearish gap when `high[i-1] < low[i-2]`
//! (zone `[high[i-1], low[i-2]]`). A gap is filled the first time a later
//! bar's range re-enters it, and dropped once older than the lookback,
//! filled or not.

use std::collections::VecDeque;

use tracing::debug;

use super::history::BarHistory;
use crate::domain::{Bar, Direction, FairValueGap};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GapUpdate {
    pub detected: Option<FairValueGap>,
    pub filled: Vec<FairValueGap>,
}

#[derive(Debug, Clone)]
pub struct FairValueGapTracker {
    lookback_bars: usize,
    gaps: VecDeque<FairValueGap>,
}

impl FairValueGapTracker {
    pub fn new(lookback_bars: usize) -> Self {
        assert!(lookback_bars >= 1, "gap lookback must be >= 1");
        Self {
            lookback_bars,
            gaps: VecDeque::new(),
        }
    }

    pub fn update(&mut self, history: &BarHistory) -> GapUpdate {
        let mut update = GapUpdate::default();
        let Some(bar) = history.current() else {
            return update;
        };

        let lookback = self.lookback_bars;
        self.gaps
            .retain(|g| bar.index.saturating_sub(g.detected_bar) <= lookback);

        for gap in self.gaps.iter_mut() {
            if !gap.filled && gap.detected_bar < bar.index && gap.is_touched_by(bar) {
                gap.filled = true;
                debug!(bar = bar.index, upper = gap.upper, lower = gap.lower, "gap filled");
                update.filled.push(gap.clone());
            }
        }

        if let (Some(middle), Some(first)) = (history.back(1), history.back(2)) {
            update.detected = Self::detect(bar, middle, first);
        }
        if let Some(gap) = &update.detected {
            debug!(
                bar = bar.index,
                kind = ?gap.kind,
                upper = gap.upper,
                lower = gap.lower,
                "fair value gap"
            );
            self.gaps.push_back(gap.clone());
        }
        update
    }

    fn detect(bar: &Bar, middle: &Bar, first: &Bar) -> Option<FairValueGap> {
        let (kind, lower, upper) = if middle.low > first.high {
            (Direction::Bullish, first.high, middle.low)
        } else if middle.high < first.low {
            (Direction::Bearish, middle.high, first.low)
        } else {
            return None;
        };
        Some(FairValueGap {
            upper,
            lower,
            bar_index: first.index,
            detected_bar: bar.index,
            kind,
            filled: false,
        })
    }

    /// Most recent unfilled gap of `kind`.
    pub fn latest_open(&self, kind: Direction) -> Option<&FairValueGap> {
        self.gaps.iter().rev().find(|g| g.kind == kind && !g.filled)
    }

    pub fn gaps(&self) -> impl Iterator<Item = &FairValueGap> {
        self.gaps.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_ohlc_bars;

    fn run(tracker: &mut FairValueGapTracker, data: &[(f64, f64, f64, f64)]) -> Vec<GapUpdate> {
        let mut history = BarHistory::new(16);
        make_ohlc_bars(data)
            .into_iter()
            .map(|bar| {
                history.push(bar);
                tracker.update(&history)
            })
            .collect()
    }

    #[test]
    fn bullish_gap_zone() {
        let mut tracker = FairValueGapTracker::new(50);
        let updates = run(
            &mut tracker,
            &[
                (100.0, 101.0, 99.0, 100.8),
                (102.0, 104.0, 101.5, 103.5), // low 101.5 > high 101.0
                (103.5, 105.0, 103.0, 104.5),
            ],
        );
        let gap = updates[2].detected.as_ref().expect("bullish gap");
        assert_eq!(gap.kind, Direction::Bullish);
        assert_eq!(gap.lower, 101.0);
        assert_eq!(gap.upper, 101.5);
        assert_eq!(gap.bar_index, 0);
        assert_eq!(gap.detected_bar, 2);
        assert!(tracker.latest_open(Direction::Bullish).is_some());
    }

    #[test]
    fn bearish_gap_zone() {
        let mut tracker = FairValueGapTracker::new(50);
        let updates = run(
            &mut tracker,
            &[
                (100.0, 101.0, 99.0, 99.2),
                (98.0, 98.5, 96.0, 96.5), // high 98.5 < low 99.0
                (96.5, 97.0, 95.0, 95.5),
            ],
        );
        let gap = updates[2].detected.as_ref().unwrap();
        assert_eq!(gap.kind, Direction::Bearish);
        assert_eq!(gap.lower, 98.5);
        assert_eq!(gap.upper, 99.0);
    }

    #[test]
    fn later_bar_fills_gap_once() {
        let mut tracker = FairValueGapTracker::new(50);
        let updates = run(
            &mut tracker,
            &[
                (100.0, 101.0, 99.0, 100.8),
                (102.0, 104.0, 101.5, 103.5),
                (103.5, 105.0, 103.0, 104.5),
                (104.5, 105.0, 101.2, 102.0), // wick back into [101.0, 101.5]
                (102.0, 103.0, 100.5, 101.0),
            ],
        );
        assert_eq!(updates[3].filled.len(), 1);
        assert!(updates[4].filled.is_empty());
        assert!(tracker.latest_open(Direction::Bullish).is_none());
    }

    #[test]
    fn gaps_pruned_after_lookback() {
        let mut tracker = FairValueGapTracker::new(2);
        let mut data = vec![
            (100.0, 101.0, 99.0, 100.8),
            (102.0, 104.0, 101.5, 103.5),
            (103.5, 105.0, 103.0, 104.5),
        ];
        // Overlapping bars well above the gap: no new gaps, no fill.
        data.extend(std::iter::repeat((104.5, 105.0, 104.0, 104.6)).take(3));
        run(&mut tracker, &data);
        assert_eq!(tracker.gaps().count(), 0);
    }
}
