//! Bounded ring buffer of recent bars.

use std::collections::VecDeque;

use crate::domain::Bar;

/// The last `capacity` finalized bars, newest at the back.
///
/// Lookback reads use an offset from the current bar: `back(0)` is the bar
/// being processed, `back(1)` the one before it.
#[derive(Debug, Clone)]
pub struct BarHistory {
    bars: VecDeque<Bar>,
    capacity: usize,
    bars_seen: usize,
}

impl BarHistory {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "history capacity must be >= 1");
        Self {
            bars: VecDeque::with_capacity(capacity),
            capacity,
            bars_seen: 0,
        }
    }

    pub fn push(&mut self, bar: Bar) {
        if self.bars.len() == self.capacity {
            self.bars.pop_front();
        }
        self.bars.push_back(bar);
        self.bars_seen += 1;
    }

    /// Bar `offset` positions before the current one.
    pub fn back(&self, offset: usize) -> Option<&Bar> {
        let len = self.bars.len();
        if offset >= len {
            return None;
        }
        self.bars.get(len - 1 - offset)
    }

    pub fn current(&self) -> Option<&Bar> {
        self.bars.back()
    }

    /// Bars at offsets `from..=to`, most recent first.
    pub fn range(&self, from: usize, to: usize) -> impl Iterator<Item = &Bar> {
        (from..=to).filter_map(move |offset| self.back(offset))
    }

    /// Number of bars currently retained.
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Total bars pushed since creation, including evicted ones.
    pub fn bars_seen(&self) -> usize {
        self.bars_seen
    }
}
