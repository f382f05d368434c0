//! The per-bar pipeline.
//!
//! Stage order on every bar is fixed:
//!
//! 1. validate the bar, push it into the shared history
//! 2. indicators (ATR and its average, ADX, trend EMA, volume EMA)
//! 3. swing → sweep → structure → order blocks → fair value gaps
//! 4. event windows and market context
//! 5. manage the open position, feed a closed trade into the risk counters
//! 6. if flat: gates → setup match → entry
//! 7. series and annotations
//!
//! No stage reads the output of a later one, and every piece of state has a
//! single owner inside `StrategyEngine`.

use std::collections::BTreeMap;

use tracing::{debug, info};

use super::report::BarReport;
use super::warmup::WarmupState;
use super::EngineError;
use crate::config::{ConfigError, StrategyConfig};
use crate::detectors::{
    BarHistory, FairValueGapTracker, LiquiditySweepDetector, MarketContext, OrderBlockEngine,
    RecentEvents, StructureBreakDetector, SwingDetector, ZoneOutcome,
};
use crate::domain::{Bar, Direction, PositionSide, SwingKind};
use crate::host::{Annotation, Host, Marker, SeriesTag};
use crate::indicators::{Adx, Atr, Ema, Indicator, Sma, Source};
use crate::position_management::{EntryContext, PositionStateMachine};
use crate::risk::RiskState;
use crate::signal::{Decision, FilterChain, GateVerdict, SignalAggregator, SignalContext};

/// Indicator values for the current bar; `None` until each is ready.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IndicatorSnapshot {
    pub atr: Option<f64>,
    pub atr_average: Option<f64>,
    pub adx: Option<f64>,
    pub trend_ema: Option<f64>,
    pub volume_ema: Option<f64>,
}

pub struct StrategyEngine {
    config: StrategyConfig,
    history: BarHistory,
    warmup: WarmupState,
    last_index: Option<usize>,

    // ── Indicators ──
    atr: Atr,
    atr_average: Sma,
    adx: Adx,
    trend_ema: Ema,
    volume_ema: Ema,

    // ── Detectors ──
    swings: SwingDetector,
    sweeps: LiquiditySweepDetector,
    structure: StructureBreakDetector,
    order_blocks: OrderBlockEngine,
    gaps: FairValueGapTracker,
    events: RecentEvents,

    // ── Decisions ──
    filters: FilterChain,
    aggregator: SignalAggregator,
    machine: PositionStateMachine,
    risk: RiskState,
    rejections: BTreeMap<&'static str, usize>,
}

impl StrategyEngine {
    /// Validate `config` and build a cold engine.
    pub fn new(config: StrategyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let c = &config;
        Ok(Self {
            history: BarHistory::new(c.history_capacity()),
            warmup: WarmupState::new(c.entry.min_bars_before_trading),
            last_index: None,
            atr: Atr::new(c.indicators.atr_period),
            atr_average: Sma::new(c.indicators.atr_average_period, Source::Close),
            adx: Adx::new(c.indicators.adx_period),
            trend_ema: Ema::new(c.indicators.trend_ema_period, Source::Close),
            volume_ema: Ema::new(c.indicators.volume_ema_period, Source::Volume),
            swings: SwingDetector::new(c.swing.window, c.swing.threshold, c.swing.keep),
            sweeps: LiquiditySweepDetector::new(
                c.sweep.horizon,
                c.sweep.max_candidates,
                c.sweep.max_active,
            ),
            structure: StructureBreakDetector::new(c.structure.policy, c.structure.min_bars),
            order_blocks: OrderBlockEngine::new(
                c.order_block.scan_limit,
                c.order_block.atr_multiplier,
                c.order_block.max_blocks,
            ),
            gaps: FairValueGapTracker::new(c.gap.lookback_bars),
            events: RecentEvents::new(c.context.event_window_bars),
            filters: FilterChain::from_config(&c.filters),
            aggregator: SignalAggregator::new(
                c.setups.clone(),
                c.trading_mode,
                c.quality.clone(),
            ),
            machine: PositionStateMachine::new(
                c.entry.clone(),
                c.management.clone(),
                &c.sizing,
            ),
            risk: RiskState::new(),
            rejections: BTreeMap::new(),
            config,
        })
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn machine(&self) -> &PositionStateMachine {
        &self.machine
    }

    pub fn risk(&self) -> &RiskState {
        &self.risk
    }

    pub fn order_blocks(&self) -> &OrderBlockEngine {
        &self.order_blocks
    }

    pub fn sweeps(&self) -> &LiquiditySweepDetector {
        &self.sweeps
    }

    pub fn structure(&self) -> &StructureBreakDetector {
        &self.structure
    }

    pub fn gaps(&self) -> &FairValueGapTracker {
        &self.gaps
    }

    pub fn bars_processed(&self) -> usize {
        self.warmup.bars_processed()
    }

    /// Bars each gate has rejected an entry on so far.
    pub fn rejections(&self) -> BTreeMap<String, usize> {
        self.rejections
            .iter()
            .map(|(name, count)| (name.to_string(), *count))
            .collect()
    }

    fn validate(&self, bar: &Bar) -> Result<(), EngineError> {
        if let Some(previous) = self.last_index {
            if bar.index <= previous {
                return Err(EngineError::OutOfOrder {
                    previous,
                    got: bar.index,
                });
            }
        }
        if !bar.is_sane() {
            return Err(EngineError::InvalidBar { index: bar.index });
        }
        Ok(())
    }

    /// Process one finalized bar. A rejected bar leaves every piece of state
    /// untouched.
    pub fn on_bar(&mut self, bar: &Bar, host: &mut dyn Host) -> Result<BarReport, EngineError> {
        self.validate(bar)?;
        self.last_index = Some(bar.index);
        self.history.push(bar.clone());

        // ─── Indicators ──────────────────────────────────────────────
        let atr = self.atr.update(bar);
        let ind = IndicatorSnapshot {
            atr,
            atr_average: atr.and_then(|a| self.atr_average.push(a)),
            adx: self.adx.update(bar),
            trend_ema: self.trend_ema.update(bar),
            volume_ema: self.volume_ema.update(bar),
        };

        // ─── Detectors ───────────────────────────────────────────────
        let swing = self.swings.update(&self.history);
        for point in swing.high.iter().chain(swing.low.iter()) {
            self.sweeps.track(point.clone());
        }
        let sweep_update = self.sweeps.update(bar);
        let structure_break = self.structure.update(&self.history, &self.swings);
        let invalidated_blocks = self.order_blocks.update(bar);
        let order_block = structure_break.as_ref().and_then(|brk| {
            match self.order_blocks.on_structure_break(brk, &self.history, ind.atr) {
                ZoneOutcome::Accepted(ob) => Some(ob),
                _ => None,
            }
        });
        let gap_update = self.gaps.update(&self.history);

        for sweep in sweep_update.events() {
            self.events.sweeps.open(sweep.direction, bar.index);
        }
        if let Some(brk) = &structure_break {
            self.events.breaks.open(brk.direction, bar.index);
        }
        let market = MarketContext::evaluate(&self.history, self.config.context.equilibrium_lookback);

        // ─── Position management ─────────────────────────────────────
        let managed = self.machine.manage(&self.history, ind.atr, host);
        if let Some(trade) = &managed.closed {
            self.risk
                .record_outcome(trade.outcome, bar.time, &self.config.risk);
        }
        self.risk.roll_day(bar.time);

        // ─── Entry ───────────────────────────────────────────────────
        let mut gate = None;
        let mut signal = None;
        let mut entered = None;
        let mut quality = 0.0;
        if self.machine.is_flat() {
            let decision = {
                let ctx = SignalContext {
                    bar,
                    market,
                    events: &self.events,
                    sweeps: &sweep_update,
                    structure_break: structure_break.as_ref(),
                    order_blocks: &self.order_blocks,
                    gaps: &self.gaps,
                    gap_update: &gap_update,
                    trend_ema: ind.trend_ema,
                    adx: ind.adx,
                    volume_ema: ind.volume_ema,
                };
                let verdict = self.admit(&ctx);
                if verdict.is_passed() {
                    self.aggregator.evaluate(&ctx)
                } else {
                    Decision::Rejected(verdict)
                }
            };

            match decision {
                Decision::Enter(sig) => {
                    quality = f64::from(sig.score.total());
                    let side = PositionSide::from_direction(sig.direction);
                    let swept_level = match side {
                        PositionSide::Long => self.sweeps.last_swept_low(),
                        PositionSide::Short => self.sweeps.last_swept_high(),
                    };
                    let ctx = EntryContext {
                        bar,
                        direction: sig.direction,
                        setup: sig.setup,
                        swept_level,
                        atr: ind.atr,
                        atr_average: ind.atr_average,
                        equity: host.equity(),
                    };
                    entered = self.machine.enter(&ctx, host).cloned();
                    if entered.is_some() {
                        if let Some(start) = sig.order_block {
                            self.order_blocks.consume(start);
                        }
                        self.risk.record_entry(bar.time);
                    }
                    gate = Some(GateVerdict::Passed);
                    signal = Some(sig);
                }
                Decision::Rejected(verdict) => {
                    if let GateVerdict::BelowQuality { score, .. } = verdict {
                        quality = f64::from(score);
                    }
                    if !matches!(verdict, GateVerdict::Warmup) {
                        debug!(bar = bar.index, gate = verdict.name(), "entry gated");
                    }
                    *self.rejections.entry(verdict.name()).or_insert(0) += 1;
                    gate = Some(verdict);
                }
                Decision::NoSetup => gate = Some(GateVerdict::Passed),
            }
        }

        // ─── Output ──────────────────────────────────────────────────
        let report = BarReport {
            bar_index: bar.index,
            swing_high: swing.high.clone(),
            swing_low: swing.low.clone(),
            sweeps: sweep_update.events().cloned().collect(),
            structure_break,
            order_block,
            invalidated_blocks,
            gap: gap_update.detected.clone(),
            filled_gaps: gap_update.filled.clone(),
            market,
            exits: managed.fills,
            closed_trade: managed.closed,
            gate,
            signal,
            entered,
        };
        self.write_series(&report, swing.series_value(), sweep_update.series_value(), quality, host);
        annotate(&report, host);

        self.warmup.process_bar();
        Ok(report)
    }

    /// Warmup, session window, risk counters, then the market filters.
    fn admit(&self, ctx: &SignalContext<'_>) -> GateVerdict {
        if !self.warmup.is_warm() {
            return GateVerdict::Warmup;
        }
        let session = self.filters.check_session(ctx);
        if !session.is_passed() {
            return session;
        }
        let risk = self.risk.check(ctx.bar.time, &self.config.risk);
        if !risk.is_passed() {
            return risk;
        }
        self.filters.check_market(ctx)
    }

    fn write_series(
        &self,
        report: &BarReport,
        swing: f64,
        sweep: f64,
        quality: f64,
        host: &mut dyn Host,
    ) {
        let sign = |d: Option<Direction>| d.map_or(0.0, Direction::sign);
        let values = [
            (SeriesTag::Swing, swing),
            (SeriesTag::Sweep, sweep),
            (
                SeriesTag::StructureBreak,
                sign(report.structure_break.as_ref().map(|b| b.direction)),
            ),
            (SeriesTag::OrderBlocks, self.order_blocks.net_count()),
            (
                SeriesTag::FairValueGap,
                sign(report.gap.as_ref().map(|g| g.kind)),
            ),
            (SeriesTag::Position, self.machine.signed_quantity()),
            (SeriesTag::Quality, quality),
        ];
        for (tag, value) in values {
            host.write_series(report.bar_index, tag, value);
        }
    }
}

fn annotate(report: &BarReport, host: &mut dyn Host) {
    let index = report.bar_index;
    for point in report.swing_high.iter().chain(report.swing_low.iter()) {
        let (marker, label) = match point.kind {
            SwingKind::High => (Marker::SwingHigh, "SH"),
            SwingKind::Low => (Marker::SwingLow, "SL"),
        };
        host.annotate(Annotation {
            bar_index: point.bar_index,
            price: point.price,
            marker,
            label: label.to_string(),
        });
    }
    for sweep in &report.sweeps {
        host.annotate(Annotation {
            bar_index: index,
            price: sweep.level(),
            marker: Marker::Sweep,
            label: format!("{:?} sweep", sweep.direction).to_lowercase(),
        });
    }
    if let Some(brk) = &report.structure_break {
        host.annotate(Annotation {
            bar_index: index,
            price: brk.level,
            marker: Marker::StructureBreak,
            label: format!("{:?} BOS", brk.direction).to_lowercase(),
        });
    }
    if let Some(ob) = &report.order_block {
        host.annotate(Annotation {
            bar_index: ob.start_bar_index,
            price: ob.top,
            marker: Marker::OrderBlock,
            label: format!("OB {:.2}-{:.2}", ob.bottom, ob.top),
        });
    }
    if let Some(gap) = &report.gap {
        host.annotate(Annotation {
            bar_index: gap.bar_index,
            price: gap.upper,
            marker: Marker::FairValueGap,
            label: format!("FVG {:.2}-{:.2}", gap.lower, gap.upper),
        });
    }
    if let Some(pos) = &report.entered {
        info!(bar = index, side = ?pos.side, setup = %pos.setup, "position opened");
        host.annotate(Annotation {
            bar_index: index,
            price: pos.entry_price,
            marker: Marker::Entry,
            label: pos.setup.name().to_string(),
        });
    }
    for fill in &report.exits {
        host.annotate(Annotation {
            bar_index: index,
            price: fill.price,
            marker: Marker::Exit,
            label: fill.reason.name().to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{NullHost, RecordingHost};
    use crate::indicators::{make_bars, make_ohlc_bars};

    fn engine() -> StrategyEngine {
        StrategyEngine::new(StrategyConfig::default()).unwrap()
    }

    #[test]
    fn rejects_invalid_config() {
        let mut config = StrategyConfig::default();
        config.swing.window = 0;
        assert!(StrategyEngine::new(config).is_err());
    }

    #[test]
    fn out_of_order_bar_is_rejected_without_mutation() {
        let mut engine = engine();
        let bars = make_bars(&[100.0, 101.0, 102.0]);
        engine.on_bar(&bars[0], &mut NullHost).unwrap();
        engine.on_bar(&bars[1], &mut NullHost).unwrap();
        let err = engine.on_bar(&bars[0], &mut NullHost).unwrap_err();
        assert_eq!(err, EngineError::OutOfOrder { previous: 1, got: 0 });
        assert_eq!(engine.bars_processed(), 2);
        engine.on_bar(&bars[2], &mut NullHost).unwrap();
        assert_eq!(engine.bars_processed(), 3);
    }

    #[test]
    fn insane_bar_is_rejected() {
        let mut engine = engine();
        let bars = make_ohlc_bars(&[(100.0, 99.0, 98.0, 100.5)]);
        assert_eq!(
            engine.on_bar(&bars[0], &mut NullHost),
            Err(EngineError::InvalidBar { index: 0 })
        );
        assert_eq!(engine.bars_processed(), 0);
    }

    #[test]
    fn every_series_written_every_bar() {
        let mut engine = engine();
        let mut host = RecordingHost::new();
        let bars = make_bars(&[100.0, 101.0, 99.0, 102.0, 98.0]);
        for bar in &bars {
            engine.on_bar(bar, &mut host).unwrap();
        }
        for tag in SeriesTag::ALL {
            assert_eq!(host.series_of(tag).len(), bars.len(), "{}", tag.name());
        }
    }

    #[test]
    fn warmup_gates_early_bars() {
        let mut engine = engine();
        let bars = make_bars(&[100.0; 25]);
        let reports: Vec<_> = bars
            .iter()
            .map(|b| engine.on_bar(b, &mut NullHost).unwrap())
            .collect();
        assert_eq!(reports[19].gate, Some(GateVerdict::Warmup));
        assert_ne!(reports[20].gate, Some(GateVerdict::Warmup));
        assert_eq!(engine.rejections().get("warmup"), Some(&20));
    }
}
