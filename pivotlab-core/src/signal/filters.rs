//! Admission filters.
//!
//! A filter inspects market conditions on the current bar and either passes
//! or names the reason for rejection. Filters never see the position or the
//! risk counters.

use tracing::debug;

use super::{GateVerdict, SignalContext};
use crate::config::{FilterConfig, SessionWindow};
use crate::domain::Direction;

pub trait AdmissionFilter: Send + Sync {
    fn name(&self) -> &str;

    fn evaluate(&self, ctx: &SignalContext<'_>) -> GateVerdict;
}

/// Passes bars whose time of day falls in any configured window.
#[derive(Debug, Clone)]
pub struct SessionFilter {
    windows: Vec<SessionWindow>,
}

impl SessionFilter {
    pub fn new(windows: Vec<SessionWindow>) -> Self {
        assert!(!windows.is_empty(), "session filter needs at least one window");
        Self { windows }
    }
}

impl AdmissionFilter for SessionFilter {
    fn name(&self) -> &str {
        "session"
    }

    fn evaluate(&self, ctx: &SignalContext<'_>) -> GateVerdict {
        let time = ctx.bar.time.time();
        if self.windows.iter().any(|w| w.contains(time)) {
            GateVerdict::Passed
        } else {
            GateVerdict::OutsideSession
        }
    }
}

/// Passes bars whose volume exceeds its EMA by `min_ratio`.
#[derive(Debug, Clone)]
pub struct VolumeFilter {
    min_ratio: f64,
}

impl VolumeFilter {
    pub fn new(min_ratio: f64) -> Self {
        assert!(min_ratio > 0.0, "min_ratio must be > 0");
        Self { min_ratio }
    }
}

impl AdmissionFilter for VolumeFilter {
    fn name(&self) -> &str {
        "volume"
    }

    fn evaluate(&self, ctx: &SignalContext<'_>) -> GateVerdict {
        match ctx.volume_ratio() {
            Some(ratio) if ratio > self.min_ratio => GateVerdict::Passed,
            Some(ratio) => {
                debug!(bar = ctx.bar.index, ratio, "volume below threshold");
                GateVerdict::LowVolume
            }
            None => GateVerdict::MissingIndicator {
                name: "volume_ema".into(),
            },
        }
    }
}

/// Passes when either side is trend-aligned and ADX shows a trend.
#[derive(Debug, Clone)]
pub struct TrendFilter {
    min_adx: f64,
}

impl TrendFilter {
    pub fn new(min_adx: f64) -> Self {
        assert!((0.0..=100.0).contains(&min_adx), "min_adx must be in [0, 100]");
        Self { min_adx }
    }
}

impl AdmissionFilter for TrendFilter {
    fn name(&self) -> &str {
        "trend"
    }

    fn evaluate(&self, ctx: &SignalContext<'_>) -> GateVerdict {
        if ctx.trend_ema.is_none() {
            return GateVerdict::MissingIndicator {
                name: "trend_ema".into(),
            };
        }
        let Some(adx) = ctx.adx else {
            return GateVerdict::MissingIndicator { name: "adx".into() };
        };
        let aligned =
            ctx.trend_aligned(Direction::Bullish) || ctx.trend_aligned(Direction::Bearish);
        if aligned && adx > self.min_adx {
            GateVerdict::Passed
        } else {
            GateVerdict::AgainstTrend
        }
    }
}

/// The session filter runs before the risk gates, the market filters after.
pub struct FilterChain {
    pub session: Option<SessionFilter>,
    pub market: Vec<Box<dyn AdmissionFilter>>,
}

impl FilterChain {
    pub fn from_config(config: &FilterConfig) -> Self {
        let mut market: Vec<Box<dyn AdmissionFilter>> = Vec::new();
        if let Some(volume) = &config.volume {
            market.push(Box::new(VolumeFilter::new(volume.min_ratio)));
        }
        if let Some(trend) = &config.trend {
            market.push(Box::new(TrendFilter::new(trend.min_adx)));
        }
        Self {
            session: config.sessions.clone().map(SessionFilter::new),
            market,
        }
    }

    pub fn check_session(&self, ctx: &SignalContext<'_>) -> GateVerdict {
        self.session
            .as_ref()
            .map_or(GateVerdict::Passed, |f| f.evaluate(ctx))
    }

    /// First rejection among the market filters, in order.
    pub fn check_market(&self, ctx: &SignalContext<'_>) -> GateVerdict {
        self.market
            .iter()
            .map(|f| f.evaluate(ctx))
            .find(|v| !v.is_passed())
            .unwrap_or(GateVerdict::Passed)
    }

    pub fn names(&self) -> Vec<&str> {
        self.session
            .iter()
            .map(|f| f.name())
            .chain(self.market.iter().map(|f| f.name()))
            .collect()
    }
}
