//! Liquidity sweep detection.
//!
//! Unswept swing pivots rest in two ordered queues. Each bar first drops
//! pivots past the validity horizon, then looks (most recent first) for a
//! low that was traded through and closed back above, and a high that was
//! traded through and closed back below. A swept pivot leaves the queue for
//! good.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Bar, Direction, SweepEvent, SwingKind, SwingPoint};

/// How long an unswept pivot stays eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ValidityHorizon {
    /// Wall-clock minutes measured on bar timestamps.
    Minutes(i64),
    /// Bars elapsed since the pivot bar.
    Bars(usize),
}

impl ValidityHorizon {
    fn is_expired(&self, point: &SwingPoint, bar: &Bar) -> bool {
        match *self {
            ValidityHorizon::Minutes(minutes) => chrono::Duration::try_minutes(minutes)
                .and_then(|span| bar.time.checked_sub_signed(span))
                .is_some_and(|cutoff| point.time < cutoff),
            ValidityHorizon::Bars(bars) => bar.index.saturating_sub(point.bar_index) > bars,
        }
    }
}

/// Sweeps found on the current bar.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepUpdate {
    pub bullish: Option<SweepEvent>,
    pub bearish: Option<SweepEvent>,
}

impl SweepUpdate {
    pub fn events(&self) -> impl Iterator<Item = &SweepEvent> {
        self.bullish.iter().chain(self.bearish.iter())
    }

    /// +1 bullish, -1 bearish, 0 for none or both.
    pub fn series_value(&self) -> f64 {
        self.events().map(|e| e.direction.sign()).sum()
    }
}

#[derive(Debug, Clone)]
pub struct LiquiditySweepDetector {
    horizon: ValidityHorizon,
    max_candidates: usize,
    max_active: usize,
    highs: VecDeque<SwingPoint>,
    lows: VecDeque<SwingPoint>,
    last_swept_high: Option<f64>,
    last_swept_low: Option<f64>,
}

impl LiquiditySweepDetector {
    /// `max_candidates` limits how many of the most recent pivots per side
    /// are tested each bar; `max_active` caps each queue (oldest evicted).
    pub fn new(horizon: ValidityHorizon, max_candidates: usize, max_active: usize) -> Self {
        assert!(max_candidates >= 1, "max_candidates must be >= 1");
        assert!(max_active >= max_candidates, "max_active must be >= max_candidates");
        Self {
            horizon,
            max_candidates,
            max_active,
            highs: VecDeque::new(),
            lows: VecDeque::new(),
            last_swept_high: None,
            last_swept_low: None,
        }
    }

    /// Start tracking a freshly confirmed pivot.
    pub fn track(&mut self, point: SwingPoint) {
        let queue = match point.kind {
            SwingKind::High => &mut self.highs,
            SwingKind::Low => &mut self.lows,
        };
        if queue.len() == self.max_active {
            queue.pop_front();
        }
        queue.push_back(point);
    }

    pub fn update(&mut self, bar: &Bar) -> SweepUpdate {
        let horizon = self.horizon;
        self.highs.retain(|p| !horizon.is_expired(p, bar));
        self.lows.retain(|p| !horizon.is_expired(p, bar));

        let bullish = Self::sweep(&mut self.lows, self.max_candidates, bar, |p| {
            bar.low < p && bar.close > p
        })
        .map(|pivot| {
            self.last_swept_low = Some(pivot.price);
            debug!(bar = bar.index, level = pivot.price, "bullish liquidity sweep");
            SweepEvent {
                direction: Direction::Bullish,
                bar_index: bar.index,
                pivot,
            }
        });

        let bearish = Self::sweep(&mut self.highs, self.max_candidates, bar, |p| {
            bar.high > p && bar.close < p
        })
        .map(|pivot| {
            self.last_swept_high = Some(pivot.price);
            debug!(bar = bar.index, level = pivot.price, "bearish liquidity sweep");
            SweepEvent {
                direction: Direction::Bearish,
                bar_index: bar.index,
                pivot,
            }
        });

        SweepUpdate { bullish, bearish }
    }

    fn sweep(
        queue: &mut VecDeque<SwingPoint>,
        max_candidates: usize,
        bar: &Bar,
        taken: impl Fn(f64) -> bool,
    ) -> Option<SwingPoint> {
        let pos = queue
            .iter()
            .enumerate()
            .rev()
            .take(max_candidates)
            .find(|(_, p)| p.bar_index < bar.index && taken(p.price))
            .map(|(i, _)| i)?;
        let mut pivot = queue.remove(pos)?;
        pivot.mark_swept();
        Some(pivot)
    }

    /// Unswept highs, oldest first.
    pub fn active_highs(&self) -> impl Iterator<Item = &SwingPoint> {
        self.highs.iter()
    }

    /// Unswept lows, oldest first.
    pub fn active_lows(&self) -> impl Iterator<Item = &SwingPoint> {
        self.lows.iter()
    }

    /// Most recently swept high, used to anchor short stops.
    pub fn last_swept_high(&self) -> Option<f64> {
        self.last_swept_high
    }

    /// Most recently swept low, used to anchor long stops.
    pub fn last_swept_low(&self) -> Option<f64> {
        self.last_swept_low
    }
}
