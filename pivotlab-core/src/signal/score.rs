//! Entry quality score.
//!
//! Five independent sub-scores, each capped at 20:
//!
//! | component  | rule                                                    |
//! |------------|---------------------------------------------------------|
//! | trend      | 20 when the close is on the trend side of the EMA       |
//! | strength   | ADX > 30: 20, > 25: 15, > 20: 10                        |
//! | volume     | volume / EMA > 1.5: 20, > 1.2: 15, > 1.0: 10            |
//! | confluence | 20 for sweep + break + retraced order block             |
//! | session    | prime session: 20, late session: 15                     |

use serde::{Deserialize, Serialize};

use super::SignalContext;
use crate::config::QualityConfig;
use crate::domain::Direction;

const CAP: u8 = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityScore {
    pub trend: u8,
    pub strength: u8,
    pub volume: u8,
    pub confluence: u8,
    pub session: u8,
}

impl QualityScore {
    /// Sum of the sub-scores, never above 100.
    pub fn total(&self) -> u8 {
        let sum: u16 = [
            self.trend,
            self.strength,
            self.volume,
            self.confluence,
            self.session,
        ]
        .iter()
        .map(|&s| u16::from(s.min(CAP)))
        .sum();
        sum.min(100) as u8
    }
}

#[derive(Debug, Clone)]
pub struct QualityScorer {
    config: QualityConfig,
}

impl QualityScorer {
    pub fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    pub fn threshold(&self) -> u8 {
        self.config.threshold
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn score(&self, ctx: &SignalContext<'_>, direction: Direction) -> QualityScore {
        QualityScore {
            trend: if ctx.trend_aligned(direction) { CAP } else { 0 },
            strength: strength(ctx.adx),
            volume: volume(ctx.volume_ratio()),
            confluence: if confluence(ctx, direction) { CAP } else { 0 },
            session: self.session(ctx),
        }
    }

    fn session(&self, ctx: &SignalContext<'_>) -> u8 {
        let time = ctx.bar.time.time();
        if self.config.prime_session.contains(time) {
            20
        } else if self.config.late_session.contains(time) {
            15
        } else {
            0
        }
    }
}

fn strength(adx: Option<f64>) -> u8 {
    match adx {
        Some(a) if a > 30.0 => 20,
        Some(a) if a > 25.0 => 15,
        Some(a) if a > 20.0 => 10,
        _ => 0,
    }
}

fn volume(ratio: Option<f64>) -> u8 {
    match ratio {
        Some(r) if r > 1.5 => 20,
        Some(r) if r > 1.2 => 15,
        Some(r) if r > 1.0 => 10,
        _ => 0,
    }
}

fn confluence(ctx: &SignalContext<'_>, direction: Direction) -> bool {
    ctx.recent_sweep(direction)
        && ctx.recent_break(direction)
        && ctx.order_blocks.retraced_zone(direction, ctx.bar).is_some()
}
