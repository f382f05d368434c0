//! Risk counters: consecutive-loss cooldown and the daily trade cap.
//!
//! All clocks are bar timestamps. The trading day rolls over when a bar's
//! date differs from the stored day.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::RiskConfig;
use crate::domain::TradeOutcome;
use crate::signal::GateVerdict;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskState {
    pub consecutive_losses: u32,
    pub daily_trade_count: u32,
    pub current_trade_day: Option<NaiveDate>,
    pub cooldown_until: Option<NaiveDateTime>,
}

impl RiskState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the daily count when `time` falls on a new date.
    pub fn roll_day(&mut self, time: NaiveDateTime) {
        let day = time.date();
        if self.current_trade_day != Some(day) {
            if self.current_trade_day.is_some() {
                debug!(%day, trades = self.daily_trade_count, "new trading day");
            }
            self.current_trade_day = Some(day);
            self.daily_trade_count = 0;
        }
    }

    /// Cooldown first, then the daily cap. Does not mutate.
    pub fn check(&self, time: NaiveDateTime, config: &RiskConfig) -> GateVerdict {
        if let Some(until) = self.cooldown_until.filter(|until| time < *until) {
            return GateVerdict::CoolingDown { until };
        }
        if let Some(cap) = config.max_daily_trades {
            let same_day = self.current_trade_day == Some(time.date());
            if same_day && self.daily_trade_count >= cap {
                return GateVerdict::DailyCapReached {
                    trades: self.daily_trade_count,
                };
            }
        }
        GateVerdict::Passed
    }

    pub fn record_entry(&mut self, time: NaiveDateTime) {
        self.roll_day(time);
        self.daily_trade_count += 1;
    }

    /// A win clears the loss streak. A loss that reaches the configured
    /// streak starts (or extends) the cooldown from `time`.
    pub fn record_outcome(&mut self, outcome: TradeOutcome, time: NaiveDateTime, config: &RiskConfig) {
        match outcome {
            TradeOutcome::Win => self.consecutive_losses = 0,
            TradeOutcome::Loss => {
                self.consecutive_losses += 1;
                if let Some(cooldown) = &config.cooldown {
                    if self.consecutive_losses >= cooldown.after_losses {
                        let until = Duration::try_minutes(cooldown.minutes)
                            .and_then(|span| time.checked_add_signed(span))
                            .unwrap_or(NaiveDateTime::MAX);
                        self.cooldown_until = Some(until);
                        info!(
                            losses = self.consecutive_losses,
                            %until,
                            "cooling down after consecutive losses"
                        );
                    }
                }
            }
        }
    }
}
