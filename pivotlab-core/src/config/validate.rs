//! Boundary checks for `StrategyConfig`.

use super::{
    AdaptiveTargets, ConfigError, SessionWindow, SizingMethod, StrategyConfig,
};
use crate::detectors::ValidityHorizon;
use crate::position_management::TrailingMode;

fn at_least(field: &'static str, value: usize, min: usize) -> Result<(), ConfigError> {
    if value < min {
        return Err(ConfigError::TooSmall { field, min, value });
    }
    Ok(())
}

/// One year of wall-clock minutes, the longest horizon or cooldown allowed.
pub const MAX_MINUTES: i64 = 366 * 24 * 60;

/// Longest "recent event" window, in bars.
pub const MAX_EVENT_WINDOW_BARS: usize = 100_000;

fn at_most(field: &'static str, value: usize, max: usize) -> Result<(), ConfigError> {
    if value > max {
        return Err(ConfigError::TooLarge { field, max, value });
    }
    Ok(())
}

fn minutes(field: &'static str, value: i64) -> Result<(), ConfigError> {
    if !(1..=MAX_MINUTES).contains(&value) {
        return Err(ConfigError::OutOfRange {
            field,
            min: 1.0,
            max: MAX_MINUTES as f64,
            value: value as f64,
        });
    }
    Ok(())
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::NotPositive { field, value });
    }
    Ok(())
}

fn within(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if !(min..=max).contains(&value) {
        return Err(ConfigError::OutOfRange {
            field,
            min,
            max,
            value,
        });
    }
    Ok(())
}

fn targets(field: &'static str, tp1: f64, tp2: f64) -> Result<(), ConfigError> {
    if !(tp1.is_finite() && tp2.is_finite() && tp1 > 0.0 && tp1 < tp2) {
        return Err(ConfigError::TargetOrder { field, tp1, tp2 });
    }
    Ok(())
}

fn session(field: &'static str, window: &SessionWindow) -> Result<(), ConfigError> {
    if window.start >= window.end {
        return Err(ConfigError::EmptySession {
            field,
            start: window.start,
            end: window.end,
        });
    }
    Ok(())
}

impl StrategyConfig {
    /// Reject any configuration the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        at_least("swing.window", self.swing.window, 1)?;
        at_least("swing.keep", self.swing.keep, 2)?;
        if !self.swing.threshold.is_finite() || self.swing.threshold < 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "swing.threshold",
                min: 0.0,
                max: f64::MAX,
                value: self.swing.threshold,
            });
        }

        at_least("sweep.max_candidates", self.sweep.max_candidates, 1)?;
        at_least("sweep.max_active", self.sweep.max_active, self.sweep.max_candidates)?;
        match self.sweep.horizon {
            ValidityHorizon::Minutes(m) => minutes("sweep.horizon", m)?,
            ValidityHorizon::Bars(b) => at_least("sweep.horizon", b, 1)?,
        }

        at_least("structure.min_bars", self.structure.min_bars, 2)?;

        at_least("order_block.scan_limit", self.order_block.scan_limit, 1)?;
        at_least("order_block.max_blocks", self.order_block.max_blocks, 1)?;
        positive("order_block.atr_multiplier", self.order_block.atr_multiplier)?;

        at_least("gap.lookback_bars", self.gap.lookback_bars, 1)?;
        at_least("context.equilibrium_lookback", self.context.equilibrium_lookback, 1)?;
        at_most(
            "context.event_window_bars",
            self.context.event_window_bars,
            MAX_EVENT_WINDOW_BARS,
        )?;

        let ind = &self.indicators;
        at_least("indicators.atr_period", ind.atr_period, 1)?;
        at_least("indicators.atr_average_period", ind.atr_average_period, 1)?;
        at_least("indicators.adx_period", ind.adx_period, 1)?;
        at_least("indicators.trend_ema_period", ind.trend_ema_period, 1)?;
        at_least("indicators.volume_ema_period", ind.volume_ema_period, 1)?;

        if !self.setups.any_enabled() {
            return Err(ConfigError::NoSetupEnabled);
        }

        if let Some(sessions) = &self.filters.sessions {
            if sessions.is_empty() {
                return Err(ConfigError::NoSessions {
                    field: "filters.sessions",
                });
            }
            for w in sessions {
                session("filters.sessions", w)?;
            }
        }
        if let Some(volume) = &self.filters.volume {
            positive("filters.volume.min_ratio", volume.min_ratio)?;
        }
        if let Some(trend) = &self.filters.trend {
            within("filters.trend.min_adx", trend.min_adx, 0.0, 100.0)?;
        }

        within("quality.threshold", f64::from(self.quality.threshold), 0.0, 100.0)?;
        session("quality.prime_session", &self.quality.prime_session)?;
        session("quality.late_session", &self.quality.late_session)?;

        if let Some(cap) = self.risk.max_daily_trades {
            at_least("risk.max_daily_trades", cap as usize, 1)?;
        }
        if let Some(cooldown) = &self.risk.cooldown {
            at_least("risk.cooldown.after_losses", cooldown.after_losses as usize, 1)?;
            minutes("risk.cooldown.minutes", cooldown.minutes)?;
        }

        let entry = &self.entry;
        if !entry.stop_atr_multiple.is_finite() || entry.stop_atr_multiple < 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "entry.stop_atr_multiple",
                min: 0.0,
                max: f64::MAX,
                value: entry.stop_atr_multiple,
            });
        }
        positive("entry.max_stop_ticks", entry.max_stop_ticks)?;
        positive("entry.tick_size", entry.tick_size)?;
        targets("entry", entry.tp1_multiple, entry.tp2_multiple)?;
        if let Some(AdaptiveTargets {
            volatility_ratio,
            tp1_multiple,
            tp2_multiple,
        }) = &entry.adaptive_targets
        {
            positive("entry.adaptive_targets.volatility_ratio", *volatility_ratio)?;
            targets("entry.adaptive_targets", *tp1_multiple, *tp2_multiple)?;
        }

        match &self.sizing.method {
            SizingMethod::Fixed { quantity } => {
                at_least("sizing.method.quantity", *quantity as usize, 1)?
            }
            SizingMethod::RiskPercent {
                percent,
                point_value,
            } => {
                positive("sizing.method.percent", *percent)?;
                within("sizing.method.percent", *percent, 0.0, 100.0)?;
                positive("sizing.method.point_value", *point_value)?;
            }
        }
        if let Some(ratio) = self.sizing.high_volatility_ratio {
            positive("sizing.high_volatility_ratio", ratio)?;
        }

        positive("management.max_trail_ticks", self.management.max_trail_ticks)?;
        if let Some(bars) = self.management.time_stop_bars {
            at_least("management.time_stop_bars", bars, 1)?;
        }
        match self.management.trailing {
            TrailingMode::Off => {}
            TrailingMode::Structure { lookback, .. } => {
                at_least("management.trailing.lookback", lookback, 1)?;
            }
            TrailingMode::WeightedAtr {
                lookback,
                atr_multiple,
                decay,
                ..
            } => {
                at_least("management.trailing.lookback", lookback, 1)?;
                positive("management.trailing.atr_multiple", atr_multiple)?;
                within("management.trailing.decay", decay, 0.0, 1.0)?;
                // The oldest bar's weight must stay non-negative.
                let floor = 1.0 - (lookback as f64 - 1.0) * decay;
                within("management.trailing.decay", floor, 0.0, 1.0)?;
            }
        }

        Ok(())
    }
}
