//! Setup matching and the entry decision.
//!
//! Directions are tried long first, then short. Within a direction the
//! enabled setups are tried in a fixed order and the first match wins:
//! `SweepBosOrderBlock`, `SweepBos`, `SweepBosGap`, `EquilibriumConfluence`.
//! With quality filtering on, a match scoring below the threshold is
//! rejected and the other direction is still tried.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::score::{QualityScore, QualityScorer};
use super::{GateVerdict, SignalContext};
use crate::config::{QualityConfig, SetupConfig, TradingMode};
use crate::domain::{Direction, EntrySetup, PositionSide};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntrySignal {
    pub direction: Direction,
    pub setup: EntrySetup,
    /// Start bar of the order block the entry uses, if any.
    pub order_block: Option<usize>,
    pub score: QualityScore,
}

/// What the aggregator decided for one bar.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Enter(EntrySignal),
    /// A setup matched but failed the quality gate.
    Rejected(GateVerdict),
    NoSetup,
}

pub struct SignalAggregator {
    setups: SetupConfig,
    trading_mode: TradingMode,
    scorer: QualityScorer,
}

impl SignalAggregator {
    pub fn new(setups: SetupConfig, trading_mode: TradingMode, quality: QualityConfig) -> Self {
        Self {
            setups,
            trading_mode,
            scorer: QualityScorer::new(quality),
        }
    }

    pub fn evaluate(&self, ctx: &SignalContext<'_>) -> Decision {
        let mut decision = Decision::NoSetup;
        for direction in [Direction::Bullish, Direction::Bearish] {
            if !self.trading_mode.allows(PositionSide::from_direction(direction)) {
                continue;
            }
            let Some((setup, order_block)) = self.match_setup(ctx, direction) else {
                continue;
            };
            let score = self.scorer.score(ctx, direction);
            if self.scorer.enabled() && score.total() < self.scorer.threshold() {
                debug!(
                    bar = ctx.bar.index,
                    ?direction,
                    %setup,
                    score = score.total(),
                    "setup below quality threshold"
                );
                decision = Decision::Rejected(GateVerdict::BelowQuality {
                    score: score.total(),
                    threshold: self.scorer.threshold(),
                });
                continue;
            }
            return Decision::Enter(EntrySignal {
                direction,
                setup,
                order_block,
                score,
            });
        }
        decision
    }

    /// First enabled setup that holds for `direction`, with the order block
    /// it relies on.
    pub fn match_setup(
        &self,
        ctx: &SignalContext<'_>,
        direction: Direction,
    ) -> Option<(EntrySetup, Option<usize>)> {
        let recent = ctx.recent_sweep(direction) && ctx.recent_break(direction);
        let zone = ctx
            .order_blocks
            .retraced_zone(direction, ctx.bar)
            .map(|ob| ob.start_bar_index);
        let gap = ctx
            .open_gap(direction)
            .filter(|g| g.holds_wick_of(ctx.bar))
            .is_some();

        if self.setups.sweep_bos_order_block && recent && zone.is_some() {
            return Some((EntrySetup::SweepBosOrderBlock, zone));
        }
        if self.setups.sweep_bos {
            let swept_now = ctx.sweeps.events().any(|e| e.direction == direction);
            let broke_now = ctx.structure_break.is_some_and(|b| b.direction == direction);
            if swept_now && broke_now {
                return Some((EntrySetup::SweepBos, None));
            }
        }
        if self.setups.sweep_bos_gap && recent && gap {
            return Some((EntrySetup::SweepBosGap, None));
        }
        if self.setups.equilibrium_confluence && recent {
            let close = ctx.bar.close;
            let side_ok = match direction {
                Direction::Bullish => ctx.market.is_discount(close),
                Direction::Bearish => ctx.market.is_premium(close),
            };
            if side_ok && (zone.is_some() || gap) {
                return Some((EntrySetup::EquilibriumConfluence, zone));
            }
        }
        None
    }
}
