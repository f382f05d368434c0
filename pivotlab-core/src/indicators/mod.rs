//! Streaming indicators.
//!
//! Every indicator is fed one finalized bar at a time and keeps only the
//! state it needs to produce the next value. Until enough bars have been
//! seen the indicator is "not ready" and returns `None`.

pub mod adx;
pub mod atr;
pub mod ema;
pub mod sma;

pub use adx::Adx;
pub use atr::Atr;
pub use ema::Ema;
pub use sma::Sma;

use crate::domain::Bar;
use serde::{Deserialize, Serialize};

/// Trait for streaming indicators.
///
/// # Look-ahead contamination guard
/// `update` sees only the bar being finalized; the value it returns may not
/// depend on any later bar.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "ema_50", "atr_14").
    fn name(&self) -> &str;

    /// Number of bars that pass before the first value is produced.
    ///
    /// The first value appears on the bar at zero-based position `lookback()`.
    fn lookback(&self) -> usize;

    /// Feed the next finalized bar; returns the value for that bar once ready.
    fn update(&mut self, bar: &Bar) -> Option<f64>;

    /// Latest value, if ready.
    fn value(&self) -> Option<f64>;

    /// Discard all accumulated state.
    fn reset(&mut self);
}

/// Which bar field a single-series indicator consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Close,
    Volume,
}

impl Source {
    pub fn extract(self, bar: &Bar) -> f64 {
        match self {
            Source::Close => bar.close,
            Source::Volume => bar.volume,
        }
    }

    fn tag(self) -> &'static str {
        match self {
            Source::Close => "",
            Source::Volume => "volume_",
        }
    }
}

/// Run an indicator from a cold start over `bars`.
///
/// Returns one value per bar, `f64::NAN` where the indicator was not ready.
pub fn compute_series(indicator: &mut dyn Indicator, bars: &[Bar]) -> Vec<f64> {
    indicator.reset();
    bars.iter()
        .map(|bar| indicator.update(bar).unwrap_or(f64::NAN))
        .collect()
}

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLCV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000,
/// one bar per minute from 2024-01-02 09:30.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar::new(
                i,
                start + chrono::Duration::minutes(i as i64),
                open,
                open.max(close) + 1.0,
                open.min(close) - 1.0,
                close,
                1000.0,
            )
        })
        .collect()
}

/// Create bars from explicit (open, high, low, close) tuples for testing.
#[cfg(test)]
pub fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| {
            Bar::new(
                i,
                start + chrono::Duration::minutes(i as i64),
                open,
                high,
                low,
                close,
                1000.0,
            )
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
