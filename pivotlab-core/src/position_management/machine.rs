//! Position state machine: `Flat → Entered → Flat`.
//!
//! At most one position is open. Take-profit tiers reduce the quantity and
//! move the stop in place without leaving `Entered`. Every stop change goes
//! through the ratchet.
//!
//! Management order on each bar:
//! 1. stop hit → full exit (loss)
//! 2. TP1 after the grace period → half off, stop to breakeven (once)
//! 3. TP2 after the grace period → remainder off (win)
//! 4. trailing stop
//! 5. time stop → full exit

use tracing::{debug, info, warn};

use super::ratchet::RatchetState;
use super::sizer::{build_sizer, volatility_adjusted, Sizer, SizingContext};
use crate::config::{EntryConfig, ManagementConfig, SizingConfig};
use crate::detectors::BarHistory;
use crate::domain::{
    Bar, Direction, EntrySetup, ExitFill, ExitReason, Position, PositionSide, TradeOutcome,
    TradeRecord,
};
use crate::host::{Host, OrderAction, OrderRequest};

/// Everything `enter` needs about the signal bar.
#[derive(Debug, Clone, Copy)]
pub struct EntryContext<'a> {
    pub bar: &'a Bar,
    pub direction: Direction,
    pub setup: EntrySetup,
    /// Most recently swept level on the entry side (low for longs).
    pub swept_level: Option<f64>,
    pub atr: Option<f64>,
    pub atr_average: Option<f64>,
    pub equity: Option<f64>,
}

/// Stop and targets derived for a new position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryLevels {
    pub stop_loss: f64,
    pub take_profit_1: f64,
    pub take_profit_2: f64,
}

/// Result of managing the open position for one bar.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManageOutcome {
    pub fills: Vec<ExitFill>,
    pub closed: Option<TradeRecord>,
}

pub struct PositionStateMachine {
    entry: EntryConfig,
    management: ManagementConfig,
    high_volatility_ratio: Option<f64>,
    sizer: Box<dyn Sizer>,
    position: Option<Position>,
    ratchet: Option<RatchetState>,
    realized_points: f64,
}

impl PositionStateMachine {
    pub fn new(entry: EntryConfig, management: ManagementConfig, sizing: &SizingConfig) -> Self {
        Self {
            entry,
            management,
            high_volatility_ratio: sizing.high_volatility_ratio,
            sizer: build_sizer(sizing),
            position: None,
            ratchet: None,
            realized_points: 0.0,
        }
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn is_flat(&self) -> bool {
        self.position.is_none()
    }

    /// Signed open quantity: positive long, negative short, 0 flat.
    pub fn signed_quantity(&self) -> f64 {
        self.position
            .as_ref()
            .map_or(0.0, |p| p.side.sign() * f64::from(p.quantity))
    }

    /// Stop and targets for an entry at the bar's close.
    ///
    /// The stop is the tighter of the structural stop (swept level, or the
    /// bar's extreme, pushed out by `ATR * stop_atr_multiple`) and the fixed
    /// tick stop. Without ATR, or when the structural stop lands on the
    /// wrong side of the close, the fixed stop is used alone.
    pub fn entry_levels(&self, ctx: &EntryContext<'_>) -> EntryLevels {
        let side = PositionSide::from_direction(ctx.direction);
        let close = ctx.bar.close;
        let fixed_distance = self.entry.max_stop_ticks * self.entry.tick_size;

        let (reference, fixed_stop) = match side {
            PositionSide::Long => (ctx.swept_level.unwrap_or(ctx.bar.low), close - fixed_distance),
            PositionSide::Short => (ctx.swept_level.unwrap_or(ctx.bar.high), close + fixed_distance),
        };

        let structural = ctx.atr.map(|atr| reference - side.sign() * atr * self.entry.stop_atr_multiple);
        let stop_loss = match structural {
            Some(stop) if (close - stop) * side.sign() > 0.0 => match side {
                PositionSide::Long => stop.max(fixed_stop),
                PositionSide::Short => stop.min(fixed_stop),
            },
            Some(stop) => {
                debug!(stop, close, "structural stop on wrong side of close; using fixed stop");
                fixed_stop
            }
            None => {
                warn!(bar = ctx.bar.index, "ATR not ready; using fixed stop");
                fixed_stop
            }
        };

        let (tp1, tp2) = self.target_multiples(ctx.atr, ctx.atr_average);
        let risk = (close - stop_loss).abs();
        EntryLevels {
            stop_loss,
            take_profit_1: close + side.sign() * risk * tp1,
            take_profit_2: close + side.sign() * risk * tp2,
        }
    }

    fn target_multiples(&self, atr: Option<f64>, atr_average: Option<f64>) -> (f64, f64) {
        let base = (self.entry.tp1_multiple, self.entry.tp2_multiple);
        match (&self.entry.adaptive_targets, atr, atr_average) {
            (Some(adaptive), Some(atr), Some(avg)) if atr <= avg * adaptive.volatility_ratio => {
                (adaptive.tp1_multiple, adaptive.tp2_multiple)
            }
            _ => base,
        }
    }

    /// Open a position at the bar's close. Returns `None` (and does nothing)
    /// when a position is already open.
    pub fn enter(&mut self, ctx: &EntryContext<'_>, host: &mut dyn Host) -> Option<&Position> {
        if self.position.is_some() {
            debug!(bar = ctx.bar.index, "entry ignored: position already open");
            return None;
        }
        let side = PositionSide::from_direction(ctx.direction);
        let levels = self.entry_levels(ctx);
        let base_quantity = self.sizer.size(&SizingContext {
            stop_distance: (ctx.bar.close - levels.stop_loss).abs(),
            equity: ctx.equity,
        });
        let quantity = volatility_adjusted(
            base_quantity,
            self.high_volatility_ratio,
            ctx.atr,
            ctx.atr_average,
        );

        host.submit(OrderRequest {
            bar_index: ctx.bar.index,
            action: OrderAction::entry(side),
            quantity,
            price: ctx.bar.close,
            reason: ctx.setup.name().to_string(),
        });
        info!(
            bar = ctx.bar.index,
            side = ?side,
            setup = %ctx.setup,
            price = ctx.bar.close,
            quantity,
            sizer = self.sizer.name(),
            stop = levels.stop_loss,
            tp1 = levels.take_profit_1,
            tp2 = levels.take_profit_2,
            "entry"
        );

        self.ratchet = Some(RatchetState::with_initial_level(side, levels.stop_loss));
        self.realized_points = 0.0;
        self.position = Some(Position {
            side,
            setup: ctx.setup,
            entry_bar: ctx.bar.index,
            entry_time: ctx.bar.time,
            entry_price: ctx.bar.close,
            initial_quantity: quantity,
            quantity,
            stop_loss: levels.stop_loss,
            take_profit_1: levels.take_profit_1,
            take_profit_2: levels.take_profit_2,
            bars_since_entry: 0,
            tp1_taken: false,
        });
        self.position.as_ref()
    }

    /// Advance the open position by one bar. `history.current()` must be
    /// the bar being managed.
    pub fn manage(
        &mut self,
        history: &BarHistory,
        atr: Option<f64>,
        host: &mut dyn Host,
    ) -> ManageOutcome {
        let mut outcome = ManageOutcome::default();
        let (Some(bar), Some(pos)) = (history.current(), self.position.as_mut()) else {
            return outcome;
        };
        pos.bars_since_entry += 1;
        let side = pos.side;
        let (favorable, adverse) = match side {
            PositionSide::Long => (bar.high, bar.low),
            PositionSide::Short => (bar.low, bar.high),
        };

        // 1. Stop.
        if side.reached(pos.stop_loss, adverse) {
            let price = gap_fill(side, bar.open, pos.stop_loss, false);
            return self.close(bar, price, ExitReason::StopLoss, TradeOutcome::Loss, host, outcome);
        }

        let past_grace = pos.bars_since_entry > self.management.tp_grace_bars;

        // 2. TP1: half off, stop to breakeven.
        if past_grace && !pos.tp1_taken && side.reached(favorable, pos.take_profit_1) {
            let half = pos.quantity / 2;
            let price = gap_fill(side, bar.open, pos.take_profit_1, true);
            if half >= 1 {
                pos.quantity -= half;
                self.realized_points += (price - pos.entry_price) * side.sign() * f64::from(half);
                let fill = ExitFill {
                    bar_index: bar.index,
                    reason: ExitReason::TakeProfit1,
                    quantity: half,
                    price,
                };
                host.submit(OrderRequest {
                    bar_index: bar.index,
                    action: OrderAction::ExitPartial,
                    quantity: half,
                    price,
                    reason: ExitReason::TakeProfit1.name().to_string(),
                });
                outcome.fills.push(fill);
            } else {
                debug!(bar = bar.index, "single unit at TP1; holding for TP2");
            }
            if let Some(ratchet) = self.ratchet.as_mut() {
                pos.stop_loss = ratchet.apply(pos.entry_price);
            }
            pos.tp1_taken = true;
            info!(bar = bar.index, stop = pos.stop_loss, remaining = pos.quantity, "take profit 1");
        }

        // 3. TP2: remainder off.
        if past_grace && side.reached(favorable, pos.take_profit_2) {
            let price = gap_fill(side, bar.open, pos.take_profit_2, true);
            return self.close(bar, price, ExitReason::TakeProfit2, TradeOutcome::Win, host, outcome);
        }

        // 4. Trailing stop.
        let max_trail = self.management.max_trail_ticks * self.entry.tick_size;
        if let Some(trail) = self.management.trailing.propose(pos, history, atr, max_trail) {
            if let Some(ratchet) = self.ratchet.as_mut() {
                let before = pos.stop_loss;
                pos.stop_loss = ratchet.apply(trail);
                if pos.stop_loss != before {
                    debug!(bar = bar.index, from = before, to = pos.stop_loss, "trailing stop");
                }
            }
        }

        // 5. Time stop.
        if let Some(limit) = self.management.time_stop_bars {
            if pos.bars_since_entry >= limit {
                let result = if pos.open_points(bar.close) > 0.0 {
                    TradeOutcome::Win
                } else {
                    TradeOutcome::Loss
                };
                let close = bar.close;
                return self.close(bar, close, ExitReason::TimeStop, result, host, outcome);
            }
        }

        outcome
    }

    fn close(
        &mut self,
        bar: &Bar,
        price: f64,
        reason: ExitReason,
        result: TradeOutcome,
        host: &mut dyn Host,
        mut outcome: ManageOutcome,
    ) -> ManageOutcome {
        let Some(pos) = self.position.take() else {
            return outcome;
        };
        self.ratchet = None;
        let points = (price - pos.entry_price) * pos.side.sign() * f64::from(pos.quantity);
        let realized = std::mem::take(&mut self.realized_points) + points;

        host.submit(OrderRequest {
            bar_index: bar.index,
            action: OrderAction::ExitFull,
            quantity: pos.quantity,
            price,
            reason: reason.name().to_string(),
        });
        outcome.fills.push(ExitFill {
            bar_index: bar.index,
            reason,
            quantity: pos.quantity,
            price,
        });
        info!(
            bar = bar.index,
            reason = %reason,
            price,
            realized,
            outcome = ?result,
            "exit"
        );
        outcome.closed = Some(TradeRecord {
            side: pos.side,
            setup: pos.setup,
            entry_bar: pos.entry_bar,
            entry_price: pos.entry_price,
            exit_bar: bar.index,
            exit_price: price,
            quantity: pos.initial_quantity,
            realized_points: realized,
            bars_held: pos.bars_since_entry,
            exit_reason: reason,
            outcome: result,
        });
        outcome
    }
}

/// Fill price for a level touched on a bar that may have opened through it.
///
/// A target the bar opened beyond fills at the open (better than the level);
/// so does a stop the bar gapped through (worse than the level).
fn gap_fill(side: PositionSide, open: f64, level: f64, target: bool) -> f64 {
    let open_past_level = if target {
        side.reached(open, level)
    } else {
        !side.reached(open, level)
    };
    if open_past_level {
        open
    } else {
        level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AdaptiveTargets, SizingMethod};
    use crate::host::RecordingHost;
    use crate::indicators::make_ohlc_bars;
    use crate::position_management::TrailingMode;

    // ─── Helpers ─────────────────────────────────────────────────────

    fn machine(quantity: u32, management: ManagementConfig) -> PositionStateMachine {
        let entry = EntryConfig {
            max_stop_ticks: 80.0,
            ..EntryConfig::default()
        };
        let sizing = SizingConfig {
            high_volatility_ratio: None,
            method: SizingMethod::Fixed { quantity },
        };
        PositionStateMachine::new(entry, management, &sizing)
    }

    fn no_trailing() -> ManagementConfig {
        ManagementConfig {
            trailing: TrailingMode::Off,
            ..ManagementConfig::default()
        }
    }

    fn long_ctx(bar: &Bar) -> EntryContext<'_> {
        EntryContext {
            bar,
            direction: Direction::Bullish,
            setup: EntrySetup::SweepBosOrderBlock,
            swept_level: Some(990.0),
            atr: Some(20.0),
            atr_average: Some(20.0),
            equity: None,
        }
    }

    /// Enter long on the first bar (close 1000, stop 980, TP1 1030, TP2 1050),
    /// then manage the rest. Returns one outcome per managed bar.
    fn run_long(
        sm: &mut PositionStateMachine,
        host: &mut RecordingHost,
        data: &[(f64, f64, f64, f64)],
    ) -> Vec<ManageOutcome> {
        let bars = make_ohlc_bars(data);
        let mut history = BarHistory::new(16);
        history.push(bars[0].clone());
        sm.enter(&long_ctx(&bars[0]), host).expect("entry");
        bars[1..]
            .iter()
            .map(|bar| {
                history.push(bar.clone());
                sm.manage(&history, Some(20.0), host)
            })
            .collect()
    }

    const ENTRY_BAR: (f64, f64, f64, f64) = (995.0, 1002.0, 990.0, 1000.0);

    // ─── Entry ───────────────────────────────────────────────────────

    #[test]
    fn long_levels_from_swept_low() {
        let sm = machine(4, no_trailing());
        let bars = make_ohlc_bars(&[ENTRY_BAR]);
        let levels = sm.entry_levels(&long_ctx(&bars[0]));
        assert_eq!(levels.stop_loss, 980.0);
        assert_eq!(levels.take_profit_1, 1030.0);
        assert_eq!(levels.take_profit_2, 1050.0);
    }

    #[test]
    fn short_uses_tighter_fixed_stop() {
        let sm = PositionStateMachine::new(
            EntryConfig::default(),
            no_trailing(),
            &SizingConfig::default(),
        );
        let bars = make_ohlc_bars(&[(1005.0, 1012.0, 998.0, 1000.0)]);
        let ctx = EntryContext {
            direction: Direction::Bearish,
            swept_level: Some(1010.0),
            ..long_ctx(&bars[0])
        };
        let levels = sm.entry_levels(&ctx);
        // Structural 1020 vs fixed 1000 + 50 * 0.25.
        assert_eq!(levels.stop_loss, 1012.5);
        assert_eq!(levels.take_profit_1, 1000.0 - 12.5 * 1.5);
    }

    #[test]
    fn missing_atr_falls_back_to_fixed_stop() {
        let sm = machine(1, no_trailing());
        let bars = make_ohlc_bars(&[ENTRY_BAR]);
        let ctx = EntryContext {
            atr: None,
            ..long_ctx(&bars[0])
        };
        assert_eq!(sm.entry_levels(&ctx).stop_loss, 1000.0 - 80.0 * 0.25);
    }

    #[test]
    fn no_sweep_uses_bar_low() {
        let sm = PositionStateMachine::new(
            EntryConfig {
                max_stop_ticks: 200.0,
                ..EntryConfig::default()
            },
            no_trailing(),
            &SizingConfig::default(),
        );
        let bars = make_ohlc_bars(&[ENTRY_BAR]);
        let ctx = EntryContext {
            swept_level: None,
            ..long_ctx(&bars[0])
        };
        assert_eq!(sm.entry_levels(&ctx).stop_loss, 990.0 - 10.0);
    }

    #[test]
    fn calm_market_uses_adaptive_targets() {
        let mut sm = machine(1, no_trailing());
        sm.entry.adaptive_targets = Some(AdaptiveTargets::default());
        let bars = make_ohlc_bars(&[ENTRY_BAR]);
        let levels = sm.entry_levels(&long_ctx(&bars[0]));
        assert_eq!(levels.take_profit_1, 1020.0);
        assert_eq!(levels.take_profit_2, 1030.0);

        let volatile = EntryContext {
            atr_average: Some(10.0),
            ..long_ctx(&bars[0])
        };
        assert_eq!(sm.entry_levels(&volatile).take_profit_1, 1030.0);
    }

    #[test]
    fn high_volatility_halves_quantity() {
        let mut sm = machine(4, no_trailing());
        sm.high_volatility_ratio = Some(1.5);
        let bars = make_ohlc_bars(&[ENTRY_BAR]);
        let ctx = EntryContext {
            atr_average: Some(10.0),
            ..long_ctx(&bars[0])
        };
        let mut host = RecordingHost::new();
        let pos = sm.enter(&ctx, &mut host).unwrap();
        assert_eq!(pos.quantity, 2);
        assert_eq!(host.orders[0].quantity, 2);
        assert_eq!(host.orders[0].action, OrderAction::EnterLong);
        assert_eq!(host.orders[0].reason, "sweep_bos_order_block");
    }

    #[test]
    fn second_entry_ignored_while_open() {
        let mut sm = machine(1, no_trailing());
        let bars = make_ohlc_bars(&[ENTRY_BAR]);
        let mut host = RecordingHost::new();
        assert!(sm.enter(&long_ctx(&bars[0]), &mut host).is_some());
        assert!(sm.enter(&long_ctx(&bars[0]), &mut host).is_none());
        assert_eq!(host.orders.len(), 1);
        assert_eq!(sm.signed_quantity(), 1.0);
    }

    // ─── Management ──────────────────────────────────────────────────

    #[test]
    fn tp1_partial_then_breakeven_stop() {
        let mut sm = machine(4, no_trailing());
        let mut host = RecordingHost::new();
        let outcomes = run_long(
            &mut sm,
            &mut host,
            &[
                ENTRY_BAR,
                (1000.0, 1010.0, 995.0, 1008.0),
                (1008.0, 1035.0, 1005.0, 1032.0),
                (1032.0, 1040.0, 1001.0, 1020.0),
            ],
        );
        assert_eq!(outcomes[1].fills.len(), 1);
        assert_eq!(outcomes[1].fills[0].reason, ExitReason::TakeProfit1);
        assert_eq!(outcomes[1].fills[0].quantity, 2);
        let pos = sm.position().unwrap();
        assert_eq!(pos.stop_loss, 1000.0);
        assert_eq!(pos.quantity, 2);
        assert!(pos.tp1_taken);
        assert_eq!(host.orders[1].action, OrderAction::ExitPartial);
    }

    #[test]
    fn tp1_ignored_during_grace() {
        let mut sm = machine(4, no_trailing());
        let mut host = RecordingHost::new();
        let outcomes = run_long(
            &mut sm,
            &mut host,
            &[ENTRY_BAR, (1000.0, 1035.0, 995.0, 1020.0)],
        );
        assert!(outcomes[0].fills.is_empty());
        assert_eq!(sm.position().unwrap().quantity, 4);
    }

    #[test]
    fn breakeven_stop_exit_records_loss() {
        let mut sm = machine(4, no_trailing());
        let mut host = RecordingHost::new();
        let outcomes = run_long(
            &mut sm,
            &mut host,
            &[
                ENTRY_BAR,
                (1000.0, 1010.0, 995.0, 1008.0),
                (1008.0, 1035.0, 1005.0, 1032.0),
                (1020.0, 1025.0, 999.0, 1000.5),
            ],
        );
        let trade = outcomes[2].closed.as_ref().expect("closed at breakeven");
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
        assert_eq!(trade.outcome, TradeOutcome::Loss);
        assert_eq!(trade.exit_price, 1000.0);
        assert_eq!(trade.quantity, 4);
        assert_eq!(trade.realized_points, 60.0);
        assert!(sm.is_flat());
    }

    #[test]
    fn tp1_and_tp2_on_same_bar() {
        let mut sm = machine(4, no_trailing());
        let mut host = RecordingHost::new();
        let outcomes = run_long(
            &mut sm,
            &mut host,
            &[
                ENTRY_BAR,
                (1000.0, 1010.0, 995.0, 1008.0),
                (1008.0, 1055.0, 1005.0, 1052.0),
            ],
        );
        let out = &outcomes[1];
        assert_eq!(out.fills.len(), 2);
        let trade = out.closed.as_ref().unwrap();
        assert_eq!(trade.exit_reason, ExitReason::TakeProfit2);
        assert!(trade.is_winner());
        assert_eq!(trade.realized_points, 2.0 * 30.0 + 2.0 * 50.0);
    }

    #[test]
    fn single_unit_skips_partial_but_moves_stop() {
        let mut sm = machine(1, no_trailing());
        let mut host = RecordingHost::new();
        let outcomes = run_long(
            &mut sm,
            &mut host,
            &[
                ENTRY_BAR,
                (1000.0, 1010.0, 995.0, 1008.0),
                (1008.0, 1035.0, 1005.0, 1032.0),
            ],
        );
        assert!(outcomes[1].fills.is_empty());
        let pos = sm.position().unwrap();
        assert_eq!(pos.quantity, 1);
        assert_eq!(pos.stop_loss, 1000.0);
        assert!(pos.tp1_taken);
    }

    #[test]
    fn stop_checked_before_targets() {
        let mut sm = machine(2, no_trailing());
        let mut host = RecordingHost::new();
        let outcomes = run_long(
            &mut sm,
            &mut host,
            &[
                ENTRY_BAR,
                (1000.0, 1010.0, 995.0, 1008.0),
                (1000.0, 1060.0, 975.0, 1040.0),
            ],
        );
        let trade = outcomes[1].closed.as_ref().unwrap();
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
        assert_eq!(trade.exit_price, 980.0);
    }

    #[test]
    fn stop_gap_fills_at_open() {
        let mut sm = machine(2, no_trailing());
        let mut host = RecordingHost::new();
        let outcomes = run_long(&mut sm, &mut host, &[ENTRY_BAR, (970.0, 975.0, 960.0, 965.0)]);
        let trade = outcomes[0].closed.as_ref().unwrap();
        assert_eq!(trade.exit_price, 970.0);
        assert_eq!(trade.realized_points, -60.0);
    }

    #[test]
    fn time_stop_classifies_by_close() {
        let management = ManagementConfig {
            time_stop_bars: Some(2),
            ..no_trailing()
        };
        let mut sm = machine(1, management);
        let mut host = RecordingHost::new();
        let outcomes = run_long(
            &mut sm,
            &mut host,
            &[
                ENTRY_BAR,
                (1000.0, 1006.0, 996.0, 1004.0),
                (1004.0, 1008.0, 1001.0, 1005.0),
            ],
        );
        let trade = outcomes[1].closed.as_ref().unwrap();
        assert_eq!(trade.exit_reason, ExitReason::TimeStop);
        assert_eq!(trade.outcome, TradeOutcome::Win);
        assert_eq!(trade.exit_price, 1005.0);
        assert_eq!(trade.bars_held, 2);
    }

    #[test]
    fn trailing_stop_ratchets_up() {
        let management = ManagementConfig {
            trailing: TrailingMode::Structure {
                lookback: 2,
                start_after: 1,
            },
            ..ManagementConfig::default()
        };
        let mut sm = machine(1, management);
        let mut host = RecordingHost::new();
        run_long(
            &mut sm,
            &mut host,
            &[
                ENTRY_BAR,
                (1000.0, 1008.0, 998.0, 1006.0),
                (1006.0, 1014.0, 1004.0, 1012.0),
                (1012.0, 1020.0, 1010.0, 1018.0),
            ],
        );
        // Bar 3: lows of bars 2 and 1 → 998.0.
        // Clamp: 1018 - 998 = 20 > min(18, 12.5) → 1018 - 12.5.
        assert_eq!(sm.position().unwrap().stop_loss, 1005.5);
    }
}
