//! Break-of-structure detection.
//!
//! Two policies are available, one per configuration:
//!
//! - `Alternating`: a two-bar reversal forms a single candidate level which a
//!   later bar either confirms (body fully beyond the level), cancels (body
//!   fully back on the origin side) or leaves pending (body straddles it).
//!   A new candidate must have the opposite polarity of the last confirmed one.
//! - `SwingPivot`: each bar the close is compared with the older of the two
//!   most recent swing highs and lows; a break fires on the rising edge.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::history::BarHistory;
use super::swing::SwingDetector;
use crate::domain::{Bar, Direction, StructureBreak};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BosPolicy {
    Alternating,
    SwingPivot,
}

/// Polarity of the reversal pattern that formed a candidate.
///
/// A `Bull` candidate (bearish bar, then bullish bar) sits at the lower of
/// the two lows and confirms when price later breaks down through it, so it
/// produces a bearish break. `Bear` is the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateKind {
    Bull,
    Bear,
}

impl CandidateKind {
    pub fn break_direction(self) -> Direction {
        match self {
            CandidateKind::Bull => Direction::Bearish,
            CandidateKind::Bear => Direction::Bullish,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BosCandidate {
    pub kind: CandidateKind,
    pub level: f64,
    pub formation_bar: usize,
}

/// The single candidate slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CandidateState {
    NoCandidate,
    Formed(BosCandidate),
}

#[derive(Debug, Clone)]
pub struct StructureBreakDetector {
    policy: BosPolicy,
    min_bars: usize,
    state: CandidateState,
    last_confirmed: Option<CandidateKind>,
    above_pivot_high: bool,
    below_pivot_low: bool,
}

impl StructureBreakDetector {
    pub fn new(policy: BosPolicy, min_bars: usize) -> Self {
        assert!(min_bars >= 2, "structure detection needs at least two bars");
        Self {
            policy,
            min_bars,
            state: CandidateState::NoCandidate,
            last_confirmed: None,
            above_pivot_high: false,
            below_pivot_low: false,
        }
    }

    pub fn update(&mut self, history: &BarHistory, swings: &SwingDetector) -> Option<StructureBreak> {
        if history.bars_seen() < self.min_bars {
            return None;
        }
        let bar = history.current()?;
        match self.policy {
            BosPolicy::Alternating => self.update_alternating(bar, history.back(1)?),
            BosPolicy::SwingPivot => self.update_swing_pivot(bar, swings),
        }
    }

    fn update_alternating(&mut self, bar: &Bar, prev: &Bar) -> Option<StructureBreak> {
        match self.state {
            CandidateState::NoCandidate => {
                self.try_form(bar, prev);
                None
            }
            CandidateState::Formed(candidate) if bar.index > candidate.formation_bar => {
                self.resolve(bar, candidate)
            }
            CandidateState::Formed(_) => None,
        }
    }

    fn try_form(&mut self, bar: &Bar, prev: &Bar) {
        let kind = if prev.is_bearish() && bar.is_bullish() {
            CandidateKind::Bull
        } else if prev.is_bullish() && bar.is_bearish() {
            CandidateKind::Bear
        } else {
            return;
        };
        if self.last_confirmed == Some(kind) {
            return;
        }
        let level = match kind {
            CandidateKind::Bull => prev.low.min(bar.low),
            CandidateKind::Bear => prev.high.max(bar.high),
        };
        debug!(bar = bar.index, ?kind, level, "structure candidate formed");
        self.state = CandidateState::Formed(BosCandidate {
            kind,
            level,
            formation_bar: bar.index,
        });
    }

    fn resolve(&mut self, bar: &Bar, candidate: BosCandidate) -> Option<StructureBreak> {
        let level = candidate.level;
        let below = bar.open < level && bar.close < level;
        let above = bar.open > level && bar.close > level;
        let (confirmed, cancelled) = match candidate.kind {
            CandidateKind::Bull => (below, above),
            CandidateKind::Bear => (above, below),
        };

        if cancelled {
            debug!(bar = bar.index, level, "structure candidate cancelled");
            self.state = CandidateState::NoCandidate;
            return None;
        }
        if !confirmed {
            return None;
        }

        self.state = CandidateState::NoCandidate;
        self.last_confirmed = Some(candidate.kind);
        let event = StructureBreak {
            direction: candidate.kind.break_direction(),
            level,
            formation_bar: candidate.formation_bar,
            bar_index: bar.index,
        };
        debug!(bar = bar.index, direction = ?event.direction, level, "break of structure");
        Some(event)
    }

    fn update_swing_pivot(&mut self, bar: &Bar, swings: &SwingDetector) -> Option<StructureBreak> {
        let older_high = swings.recent_highs().nth(1);
        let older_low = swings.recent_lows().nth(1);

        let above = older_high.is_some_and(|p| bar.close > p.price);
        let below = older_low.is_some_and(|p| bar.close < p.price);
        let bullish_edge = above && !self.above_pivot_high;
        let bearish_edge = below && !self.below_pivot_low;
        self.above_pivot_high = above;
        self.below_pivot_low = below;

        let (direction, pivot) = match (bullish_edge, bearish_edge) {
            (true, _) => (Direction::Bullish, older_high?),
            (false, true) => (Direction::Bearish, older_low?),
            (false, false) => return None,
        };
        let event = StructureBreak {
            direction,
            level: pivot.price,
            formation_bar: pivot.bar_index,
            bar_index: bar.index,
        };
        debug!(bar = bar.index, ?direction, level = pivot.price, "break of structure");
        Some(event)
    }

    pub fn state(&self) -> CandidateState {
        self.state
    }

    pub fn last_confirmed(&self) -> Option<CandidateKind> {
        self.last_confirmed
    }
}
