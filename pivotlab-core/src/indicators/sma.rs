//! Simple Moving Average (SMA).
//!
//! Rolling mean over the last `period` values.
//! Lookback: period - 1.

use std::collections::VecDeque;

use super::{Indicator, Source};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    source: Source,
    name: String,
    window: VecDeque<f64>,
    sum: f64,
    value: Option<f64>,
}

impl Sma {
    pub fn new(period: usize, source: Source) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            source,
            name: format!("sma_{}{period}", source.tag()),
            window: VecDeque::with_capacity(period),
            sum: 0.0,
            value: None,
        }
    }

    /// Feed a raw value. Also used to average derived series such as ATR.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        self.window.push_back(value);
        self.sum += value;
        if self.window.len() > self.period {
            if let Some(old) = self.window.pop_front() {
                self.sum -= old;
            }
        }
        self.value = if self.window.len() == self.period {
            Some(self.sum / self.period as f64)
        } else {
            None
        };
        self.value
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn update(&mut self, bar: &Bar) -> Option<f64> {
        self.push(self.source.extract(bar))
    }

    fn value(&self) -> Option<f64> {
        self.value
    }

    fn reset(&mut self) {
        self.window.clear();
        self.sum = 0.0;
        self.value = None;
    }
}
