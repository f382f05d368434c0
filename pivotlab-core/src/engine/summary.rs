//! Run summary: pure functions over the closed trades, in points.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::TradeRecord;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub bars: usize,
    pub trade_count: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    pub total_points: f64,
    pub profit_factor: f64,
    /// Deepest peak-to-trough fall of cumulative realized points (<= 0).
    pub max_drawdown_points: f64,
    pub max_consecutive_losses: usize,
    pub trades_by_setup: BTreeMap<String, usize>,
    /// Count of bars each gate rejected an entry on.
    pub rejections: BTreeMap<String, usize>,
}

impl RunSummary {
    pub fn from_trades(
        bars: usize,
        trades: &[TradeRecord],
        rejections: BTreeMap<String, usize>,
    ) -> Self {
        let wins = trades.iter().filter(|t| t.is_winner()).count();
        let mut trades_by_setup = BTreeMap::new();
        for trade in trades {
            *trades_by_setup
                .entry(trade.setup.name().to_string())
                .or_insert(0) += 1;
        }
        Self {
            bars,
            trade_count: trades.len(),
            wins,
            losses: trades.len() - wins,
            win_rate: win_rate(trades),
            total_points: trades.iter().map(|t| t.realized_points).sum(),
            profit_factor: profit_factor(trades),
            max_drawdown_points: max_drawdown_points(trades),
            max_consecutive_losses: max_consecutive_losses(trades),
            trades_by_setup,
            rejections,
        }
    }
}

pub fn win_rate(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Gross winning points over gross losing points, capped at 100.0.
pub fn profit_factor(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = trades
        .iter()
        .filter(|t| t.realized_points > 0.0)
        .map(|t| t.realized_points)
        .sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.realized_points < 0.0)
        .map(|t| t.realized_points.abs())
        .sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

pub fn max_drawdown_points(trades: &[TradeRecord]) -> f64 {
    let mut cumulative = 0.0_f64;
    let mut peak = 0.0_f64;
    let mut max_dd = 0.0_f64;
    for trade in trades {
        cumulative += trade.realized_points;
        peak = peak.max(cumulative);
        max_dd = max_dd.min(cumulative - peak);
    }
    max_dd
}

pub fn max_consecutive_losses(trades: &[TradeRecord]) -> usize {
    let mut max = 0;
    let mut current = 0;
    for trade in trades {
        if trade.is_winner() {
            current = 0;
        } else {
            current += 1;
            max = max.max(current);
        }
    }
    max
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntrySetup, ExitReason, PositionSide, TradeOutcome};

    fn trade(points: f64) -> TradeRecord {
        TradeRecord {
            side: PositionSide::Long,
            setup: EntrySetup::SweepBosOrderBlock,
            entry_bar: 0,
            entry_price: 100.0,
            exit_bar: 1,
            exit_price: 100.0 + points,
            quantity: 1,
            realized_points: points,
            bars_held: 1,
            exit_reason: if points > 0.0 {
                ExitReason::TakeProfit2
            } else {
                ExitReason::StopLoss
            },
            outcome: if points > 0.0 {
                TradeOutcome::Win
            } else {
                TradeOutcome::Loss
            },
        }
    }

    #[test]
    fn empty_run() {
        let s = RunSummary::from_trades(100, &[], BTreeMap::new());
        assert_eq!(s.trade_count, 0);
        assert_eq!(s.win_rate, 0.0);
        assert_eq!(s.profit_factor, 0.0);
        assert_eq!(s.max_drawdown_points, 0.0);
    }

    #[test]
    fn drawdown_on_cumulative_points() {
        let trades = [trade(10.0), trade(-4.0), trade(-8.0), trade(5.0)];
        assert_eq!(max_drawdown_points(&trades), -12.0);
        assert_eq!(max_consecutive_losses(&trades), 2);
    }

    #[test]
    fn summary_counts() {
        let trades = [trade(10.0), trade(-5.0), trade(20.0)];
        let s = RunSummary::from_trades(50, &trades, BTreeMap::new());
        assert_eq!(s.wins, 2);
        assert_eq!(s.losses, 1);
        assert!((s.win_rate - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(s.total_points, 25.0);
        assert_eq!(s.profit_factor, 6.0);
        assert_eq!(s.trades_by_setup.get("sweep_bos_order_block"), Some(&3));
    }

    #[test]
    fn profit_factor_all_winners_capped() {
        assert_eq!(profit_factor(&[trade(3.0)]), 100.0);
    }
}
