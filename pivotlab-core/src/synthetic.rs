//! Seeded random-walk bar generator.
//!
//! Produces regular-session 5-minute bars (09:30 to 15:55, weekdays only)
//! with prices on a tick grid. The same seed always yields the same bars.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::Bar;

const BAR_MINUTES: i64 = 5;
const BARS_PER_SESSION: usize = 78;

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticMarket {
    pub seed: u64,
    pub start_date: NaiveDate,
    pub start_price: f64,
    pub tick_size: f64,
    /// Typical absolute close-to-close move, in price units.
    pub volatility: f64,
    /// Bars per drift regime; each regime draws a new drift.
    pub regime_bars: usize,
}

impl SyntheticMarket {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap_or_default(),
            start_price: 4800.0,
            tick_size: 0.25,
            volatility: 2.0,
            regime_bars: 40,
        }
    }

    pub fn generate(&self, count: usize) -> Vec<Bar> {
        assert!(self.tick_size > 0.0, "tick_size must be > 0");
        let mut rng = StdRng::seed_from_u64(self.seed);
        let session_open = NaiveTime::from_hms_opt(9, 30, 0).unwrap_or_default();
        let mut day = next_weekday(self.start_date);
        let mut slot = 0;
        let mut close = self.round(self.start_price);
        let mut drift = 0.0;
        let mut bars = Vec::with_capacity(count);

        for index in 0..count {
            if slot == BARS_PER_SESSION {
                slot = 0;
                day = next_weekday(day + Duration::days(1));
            }
            if index % self.regime_bars.max(1) == 0 {
                drift = rng.gen_range(-0.3..0.3) * self.volatility;
            }
            let time = NaiveDateTime::new(day, session_open)
                + Duration::minutes(BAR_MINUTES * slot as i64);

            // Overnight gap on the first bar of each session.
            let gap = if slot == 0 && index > 0 {
                rng.gen_range(-2.0..2.0) * self.volatility
            } else {
                0.0
            };
            let open = self.round(close + gap);
            let step = drift + rng.gen_range(-1.0..1.0) * self.volatility;
            let next_close = self.round((open + step).max(self.tick_size));
            let high = self.round(open.max(next_close) + rng.gen::<f64>() * self.volatility * 0.75);
            let low = self.round(
                (open.min(next_close) - rng.gen::<f64>() * self.volatility * 0.75)
                    .max(self.tick_size),
            );
            let volume = f64::from(rng.gen_range(500u32..3000));

            bars.push(Bar::new(
                index,
                time,
                open,
                high.max(open).max(next_close),
                low.min(open).min(next_close),
                next_close,
                volume,
            ));
            close = next_close;
            slot += 1;
        }
        bars
    }

    fn round(&self, price: f64) -> f64 {
        (price / self.tick_size).round() * self.tick_size
    }
}

fn next_weekday(mut day: NaiveDate) -> NaiveDate {
    while matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
        day += Duration::days(1);
    }
    day
}
