//! ADX: Average Directional Index (Wilder).
//!
//! Steps:
//! 1. Compute +DM and -DM from consecutive bars
//! 2. Smooth +DM, -DM, and TR using Wilder smoothing (alpha = 1/period)
//! 3. +DI = 100 * smoothed(+DM) / smoothed(TR)
//! 4. -DI = 100 * smoothed(-DM) / smoothed(TR)
//! 5. DX = 100 * |+DI - -DI| / (+DI + -DI)
//! 6. ADX = Wilder-smoothed DX
//!
//! Lookback: 2 * period - 1 (period bars of DM/TR smoothing after the priming
//! bar, then period DX values for the ADX seed).

use super::atr::{true_range, WilderSmoother};
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
    name: String,
    prev: Option<(f64, f64, f64)>,
    plus_dm: WilderSmoother,
    minus_dm: WilderSmoother,
    tr: WilderSmoother,
    adx: WilderSmoother,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ADX period must be >= 1");
        Self {
            period,
            name: format!("adx_{period}"),
            prev: None,
            plus_dm: WilderSmoother::new(period),
            minus_dm: WilderSmoother::new(period),
            tr: WilderSmoother::new(period),
            adx: WilderSmoother::new(period),
        }
    }
}

/// Directional index from smoothed components. Zero when undefined.
fn directional_index(plus_dm: f64, minus_dm: f64, tr: f64) -> f64 {
    if tr <= 0.0 {
        return 0.0;
    }
    let plus_di = 100.0 * plus_dm / tr;
    let minus_di = 100.0 * minus_dm / tr;
    let sum = plus_di + minus_di;
    if sum <= 0.0 {
        0.0
    } else {
        100.0 * (plus_di - minus_di).abs() / sum
    }
}

impl Indicator for Adx {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        2 * self.period - 1
    }

    fn update(&mut self, bar: &Bar) -> Option<f64> {
        let Some((prev_high, prev_low, prev_close)) = self.prev.replace((bar.high, bar.low, bar.close))
        else {
            return None;
        };

        let up_move = bar.high - prev_high;
        let down_move = prev_low - bar.low;
        let plus = if up_move > down_move && up_move > 0.0 {
            up_move
        } else {
            0.0
        };
        let minus = if down_move > up_move && down_move > 0.0 {
            down_move
        } else {
            0.0
        };

        let smoothed = (
            self.plus_dm.push(plus),
            self.minus_dm.push(minus),
            self.tr.push(true_range(bar, prev_close)),
        );
        match smoothed {
            (Some(p), Some(m), Some(tr)) => self.adx.push(directional_index(p, m, tr)),
            _ => None,
        }
    }

    fn value(&self) -> Option<f64> {
        self.adx.value()
    }

    fn reset(&mut self) {
        self.prev = None;
        self.plus_dm.reset();
        self.minus_dm.reset();
        self.tr.reset();
        self.adx.reset();
    }
}
