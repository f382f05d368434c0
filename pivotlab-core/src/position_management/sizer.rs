//! Position sizers: turn a stop distance and account equity into a whole
//! number of units.
//!
//! Every sizer returns at least one unit. Missing inputs degrade to the
//! minimum rather than blocking the entry.

use tracing::warn;

use crate::config::{SizingConfig, SizingMethod};

/// Inputs available at entry time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingContext {
    /// Distance from entry to stop, in price points.
    pub stop_distance: f64,
    /// Account equity from the host, if it reports one.
    pub equity: Option<f64>,
}

pub trait Sizer: Send + Sync {
    /// Units to trade; never below 1.
    fn size(&self, ctx: &SizingContext) -> u32;

    fn name(&self) -> &str;
}

/// Always the same quantity.
#[derive(Debug, Clone)]
pub struct FixedSizer {
    quantity: u32,
}

impl FixedSizer {
    pub fn new(quantity: u32) -> Self {
        assert!(quantity >= 1, "quantity must be >= 1");
        Self { quantity }
    }
}

impl Sizer for FixedSizer {
    fn size(&self, _ctx: &SizingContext) -> u32 {
        self.quantity
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Risk a fixed share of equity per trade.
///
/// # Formula
/// ```text
/// risk_budget = equity * percent / 100
/// quantity    = floor(risk_budget / (stop_distance * point_value)), min 1
/// ```
#[derive(Debug, Clone)]
pub struct RiskPercentSizer {
    percent: f64,
    point_value: f64,
}

impl RiskPercentSizer {
    pub fn new(percent: f64, point_value: f64) -> Self {
        assert!(percent > 0.0 && percent <= 100.0, "percent must be in (0, 100]");
        assert!(point_value > 0.0, "point_value must be > 0");
        Self {
            percent,
            point_value,
        }
    }
}

impl Sizer for RiskPercentSizer {
    fn size(&self, ctx: &SizingContext) -> u32 {
        let equity = match ctx.equity {
            Some(e) if e.is_finite() && e > 0.0 => e,
            other => {
                warn!(equity = ?other, "equity unavailable; sizing to 1 unit");
                return 1;
            }
        };
        if !ctx.stop_distance.is_finite() || ctx.stop_distance <= 0.0 {
            warn!(distance = ctx.stop_distance, "non-positive stop distance; sizing to 1 unit");
            return 1;
        }
        let budget = equity * self.percent / 100.0;
        let units = (budget / (ctx.stop_distance * self.point_value)).floor();
        if units >= u32::MAX as f64 {
            u32::MAX
        } else {
            (units as u32).max(1)
        }
    }

    fn name(&self) -> &str {
        "risk_percent"
    }
}

pub fn build_sizer(config: &SizingConfig) -> Box<dyn Sizer> {
    match config.method {
        SizingMethod::Fixed { quantity } => Box::new(FixedSizer::new(quantity)),
        SizingMethod::RiskPercent {
            percent,
            point_value,
        } => Box::new(RiskPercentSizer::new(percent, point_value)),
    }
}

/// Halve `quantity` (min 1) while ATR runs above its average times `ratio`.
pub fn volatility_adjusted(
    quantity: u32,
    ratio: Option<f64>,
    atr: Option<f64>,
    atr_average: Option<f64>,
) -> u32 {
    match (ratio, atr, atr_average) {
        (Some(ratio), Some(atr), Some(avg)) if atr > avg * ratio => (quantity / 2).max(1),
        _ => quantity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(stop_distance: f64, equity: Option<f64>) -> SizingContext {
        SizingContext {
            stop_distance,
            equity,
        }
    }

    #[test]
    fn fixed_ignores_inputs() {
        let sizer = FixedSizer::new(3);
        assert_eq!(sizer.size(&ctx(0.0, None)), 3);
        assert_eq!(sizer.name(), "fixed");
    }

    #[test]
    fn risk_percent_floors_units() {
        // 1% of 100k = 1000; 5 points * $50 = $250 per unit → 4 units.
        let sizer = RiskPercentSizer::new(1.0, 50.0);
        assert_eq!(sizer.size(&ctx(5.0, Some(100_000.0))), 4);
        // $1000 / (7 * 50) = 2.86 → 2
        assert_eq!(sizer.size(&ctx(7.0, Some(100_000.0))), 2);
    }

    #[test]
    fn risk_percent_minimum_one_unit() {
        let sizer = RiskPercentSizer::new(1.0, 50.0);
        assert_eq!(sizer.size(&ctx(100.0, Some(10_000.0))), 1);
    }

    #[test]
    fn missing_equity_sizes_to_one() {
        let sizer = RiskPercentSizer::new(1.0, 50.0);
        assert_eq!(sizer.size(&ctx(5.0, None)), 1);
        assert_eq!(sizer.size(&ctx(5.0, Some(0.0))), 1);
        assert_eq!(sizer.size(&ctx(5.0, Some(-500.0))), 1);
    }

    #[test]
    fn zero_distance_sizes_to_one() {
        let sizer = RiskPercentSizer::new(1.0, 50.0);
        assert_eq!(sizer.size(&ctx(0.0, Some(100_000.0))), 1);
        assert_eq!(sizer.size(&ctx(-2.0, Some(100_000.0))), 1);
    }

    #[test]
    fn high_volatility_halves_size() {
        assert_eq!(volatility_adjusted(4, Some(1.5), Some(4.0), Some(2.0)), 2);
        assert_eq!(volatility_adjusted(1, Some(1.5), Some(4.0), Some(2.0)), 1);
        assert_eq!(volatility_adjusted(4, Some(1.5), Some(2.5), Some(2.0)), 4);
        assert_eq!(volatility_adjusted(4, None, Some(4.0), Some(2.0)), 4);
        assert_eq!(volatility_adjusted(4, Some(1.5), Some(4.0), None), 4);
    }

    #[test]
    fn build_from_config() {
        let config = SizingConfig {
            high_volatility_ratio: None,
            method: SizingMethod::RiskPercent {
                percent: 2.0,
                point_value: 1.0,
            },
        };
        assert_eq!(build_sizer(&config).name(), "risk_percent");
        assert_eq!(build_sizer(&SizingConfig::default()).name(), "fixed");
    }
}
