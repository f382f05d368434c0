//! Swing pivot detection.
//!
//! The bar `window` positions back from the current bar is a swing high when
//! its high is >= every high in the `window` bars on each side of it, and a
//! swing low when its low is <= every low on each side. Ties qualify, so a
//! flat top produces a pivot on each tied bar. A pivot is therefore only
//! known `window` bars after it prints.

use std::collections::VecDeque;

use tracing::debug;

use super::history::BarHistory;
use crate::domain::{Bar, SwingKind, SwingPoint};

/// Pivots confirmed on the current bar.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SwingUpdate {
    pub high: Option<SwingPoint>,
    pub low: Option<SwingPoint>,
}

impl SwingUpdate {
    /// +1 for a new high, -1 for a new low, 0 otherwise (or both).
    pub fn series_value(&self) -> f64 {
        let high = if self.high.is_some() { 1.0 } else { 0.0 };
        let low = if self.low.is_some() { 1.0 } else { 0.0 };
        high - low
    }
}

#[derive(Debug, Clone)]
pub struct SwingDetector {
    window: usize,
    threshold: f64,
    keep: usize,
    highs: VecDeque<SwingPoint>,
    lows: VecDeque<SwingPoint>,
}

impl SwingDetector {
    /// `threshold` is the minimum margin, in price units, by which a pivot
    /// must clear its strictest neighbor; 0 disables the check. `keep` bounds
    /// how many recent pivots of each kind are retained for other stages.
    pub fn new(window: usize, threshold: f64, keep: usize) -> Self {
        assert!(window >= 1, "swing window must be >= 1");
        assert!(keep >= 2, "must keep at least two pivots per kind");
        Self {
            window,
            threshold,
            keep,
            highs: VecDeque::with_capacity(keep),
            lows: VecDeque::with_capacity(keep),
        }
    }

    /// Bars of history needed before a pivot can be evaluated.
    pub fn required_bars(&self) -> usize {
        2 * self.window + 1
    }

    pub fn update(&mut self, history: &BarHistory) -> SwingUpdate {
        if history.len() < self.required_bars() {
            return SwingUpdate::default();
        }
        let Some(pivot) = history.back(self.window) else {
            return SwingUpdate::default();
        };

        let neighbors = || {
            history
                .range(0, self.window - 1)
                .chain(history.range(self.window + 1, 2 * self.window))
        };

        let max_neighbor_high = neighbors().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let min_neighbor_low = neighbors().map(|b| b.low).fold(f64::INFINITY, f64::min);

        let mut update = SwingUpdate::default();

        if pivot.high >= max_neighbor_high && self.clears(pivot.high - max_neighbor_high) {
            let point = Self::point(pivot, SwingKind::High);
            debug!(bar = pivot.index, price = pivot.high, "swing high");
            Self::remember(&mut self.highs, point.clone(), self.keep);
            update.high = Some(point);
        }

        if pivot.low <= min_neighbor_low && self.clears(min_neighbor_low - pivot.low) {
            let point = Self::point(pivot, SwingKind::Low);
            debug!(bar = pivot.index, price = pivot.low, "swing low");
            Self::remember(&mut self.lows, point.clone(), self.keep);
            update.low = Some(point);
        }

        update
    }

    fn clears(&self, margin: f64) -> bool {
        self.threshold <= 0.0 || margin >= self.threshold
    }

    fn point(bar: &Bar, kind: SwingKind) -> SwingPoint {
        let price = match kind {
            SwingKind::High => bar.high,
            SwingKind::Low => bar.low,
        };
        SwingPoint::new(bar.index, bar.time, price, kind)
    }

    fn remember(ring: &mut VecDeque<SwingPoint>, point: SwingPoint, keep: usize) {
        if ring.len() == keep {
            ring.pop_front();
        }
        ring.push_back(point);
    }

    /// Recent swing highs, most recent first.
    pub fn recent_highs(&self) -> impl Iterator<Item = &SwingPoint> {
        self.highs.iter().rev()
    }

    /// Recent swing lows, most recent first.
    pub fn recent_lows(&self) -> impl Iterator<Item = &SwingPoint> {
        self.lows.iter().rev()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_ohlc_bars;

    fn run(detector: &mut SwingDetector, data: &[(f64, f64, f64, f64)]) -> Vec<SwingUpdate> {
        let mut history = BarHistory::new(32);
        make_ohlc_bars(data)
            .into_iter()
            .map(|bar| {
                history.push(bar);
                detector.update(&history)
            })
            .collect()
    }

    #[test]
    fn detects_high_after_window_bars() {
        let mut det = SwingDetector::new(2, 0.0, 10);
        let updates = run(
            &mut det,
            &[
                (10.0, 11.0, 9.0, 10.5),
                (10.5, 12.0, 10.0, 11.5),
                (11.5, 15.0, 11.0, 14.0), // pivot
                (14.0, 14.5, 12.0, 12.5),
                (12.5, 13.0, 11.5, 12.0),
            ],
        );
        assert!(updates[..4].iter().all(|u| u.high.is_none()));
        let high = updates[4].high.as_ref().expect("swing high on bar 4");
        assert_eq!(high.bar_index, 2);
        assert_eq!(high.price, 15.0);
        assert_eq!(high.kind, SwingKind::High);
        assert!(!high.swept);
        assert_eq!(updates[4].series_value(), 1.0);
    }

    #[test]
    fn detects_low_symmetric() {
        let mut det = SwingDetector::new(1, 0.0, 10);
        let updates = run(
            &mut det,
            &[
                (10.0, 11.0, 9.0, 10.0),
                (10.0, 10.5, 7.0, 8.0),
                (8.0, 10.0, 8.0, 9.5),
            ],
        );
        let low = updates[2].low.as_ref().unwrap();
        assert_eq!(low.price, 7.0);
        assert_eq!(low.bar_index, 1);
        assert_eq!(det.recent_lows().count(), 1);
    }

    #[test]
    fn flat_top_qualifies_on_each_tied_bar() {
        let mut det = SwingDetector::new(1, 0.0, 10);
        let updates = run(
            &mut det,
            &[
                (10.0, 11.0, 9.0, 10.0),
                (10.0, 12.0, 9.5, 11.0),
                (11.0, 12.0, 10.0, 11.0),
                (11.0, 11.5, 9.0, 10.0),
            ],
        );
        assert!(updates[2].high.is_some());
        assert!(updates[3].high.is_some());
    }

    #[test]
    fn threshold_rejects_marginal_pivot() {
        let data = [
            (10.0, 11.0, 9.0, 10.0),
            (10.0, 11.5, 9.5, 11.0),
            (11.0, 11.0, 10.0, 10.5),
        ];
        let mut loose = SwingDetector::new(1, 0.0, 10);
        assert!(run(&mut loose, &data)[2].high.is_some());

        let mut strict = SwingDetector::new(1, 1.0, 10);
        assert!(run(&mut strict, &data)[2].high.is_none());

        let mut exact = SwingDetector::new(1, 0.5, 10);
        assert!(run(&mut exact, &data)[2].high.is_some());
    }

    #[test]
    fn keeps_bounded_recent_pivots() {
        let mut det = SwingDetector::new(1, 0.0, 2);
        // Zig-zag: a high every other bar.
        let data: Vec<(f64, f64, f64, f64)> = (0..12)
            .map(|i| {
                if i % 2 == 0 {
                    (10.0, 10.5, 9.0, 10.0)
                } else {
                    (10.0, 12.0 + i as f64, 9.5, 11.0)
                }
            })
            .collect();
        run(&mut det, &data);
        let highs: Vec<usize> = det.recent_highs().map(|p| p.bar_index).collect();
        assert_eq!(highs, vec![9, 7]);
    }

    #[test]
    fn insufficient_history_is_not_ready() {
        let mut det = SwingDetector::new(3, 0.0, 10);
        let updates = run(&mut det, &[(10.0, 20.0, 1.0, 10.0); 6]);
        assert!(updates.iter().all(|u| u.high.is_none() && u.low.is_none()));
    }
}
