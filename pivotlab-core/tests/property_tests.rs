//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Ratchet monotonicity: stops may only tighten, never loosen
//! 2. Order-block capacity is never exceeded
//! 3. A pivot is swept at most once
//! 4. Position invariants hold across whole synthetic runs

use std::collections::HashSet;

use proptest::prelude::*;
use pivotlab_core::config::{StrategyConfig, StrategyPreset};
use pivotlab_core::domain::PositionSide;
use pivotlab_core::engine::StrategyEngine;
use pivotlab_core::host::{NullHost, RecordingHost};
use pivotlab_core::position_management::RatchetState;
use pivotlab_core::synthetic::SyntheticMarket;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_stop_price() -> impl Strategy<Value = f64> {
    (50.0..200.0_f64).prop_map(|p| (p * 4.0).round() / 4.0)
}

fn arb_side() -> impl Strategy<Value = PositionSide> {
    prop_oneof![Just(PositionSide::Long), Just(PositionSide::Short)]
}

fn arb_preset() -> impl Strategy<Value = StrategyPreset> {
    prop_oneof![
        Just(StrategyPreset::Baseline),
        Just(StrategyPreset::SweepBosOrderBlock),
        Just(StrategyPreset::Optimized),
    ]
}

// ── 1. Ratchet Monotonicity ──────────────────────────────────────────

proptest! {
    #[test]
    fn ratchet_never_loosens(
        side in arb_side(),
        initial_stop in arb_stop_price(),
        deltas in prop::collection::vec(-10.0..10.0_f64, 1..40),
    ) {
        let mut ratchet = RatchetState::with_initial_level(side, initial_stop);
        let mut current = initial_stop;
        for delta in deltas {
            let next = ratchet.apply(current + delta);
            match side {
                PositionSide::Long => prop_assert!(next >= current, "long stop fell: {next} < {current}"),
                PositionSide::Short => prop_assert!(next <= current, "short stop rose: {next} > {current}"),
            }
            current = next;
        }
    }
}

// ── 2-4. Engine invariants over synthetic markets ────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn order_blocks_stay_within_capacity(seed in 0u64..10_000, max_blocks in 1usize..6) {
        let mut config = StrategyConfig::default();
        config.order_block.max_blocks = max_blocks;
        let mut engine = StrategyEngine::new(config).unwrap();
        for bar in SyntheticMarket::new(seed).generate(600) {
            engine.on_bar(&bar, &mut NullHost).unwrap();
            prop_assert!(engine.order_blocks().blocks().len() <= max_blocks);
            prop_assert!(engine.order_blocks().blocks().iter().all(|ob| !ob.invalidated));
        }
    }

    #[test]
    fn each_pivot_is_swept_once(seed in 0u64..10_000) {
        let mut engine = StrategyEngine::new(StrategyConfig::default()).unwrap();
        let mut seen = HashSet::new();
        for bar in SyntheticMarket::new(seed).generate(600) {
            let report = engine.on_bar(&bar, &mut NullHost).unwrap();
            for sweep in &report.sweeps {
                prop_assert!(sweep.pivot.swept);
                prop_assert!(sweep.pivot.bar_index < sweep.bar_index);
                let key = (sweep.pivot.kind, sweep.pivot.bar_index);
                prop_assert!(seen.insert(key), "pivot swept twice: {key:?}");
            }
        }
    }

    #[test]
    fn position_invariants_hold(seed in 0u64..10_000, preset in arb_preset()) {
        let config = preset.config();
        let min_bars = config.entry.min_bars_before_trading;
        let mut engine = StrategyEngine::new(config).unwrap();
        let mut host = RecordingHost::new();
        let mut last_stop: Option<(usize, f64)> = None;

        for bar in SyntheticMarket::new(seed).generate(800) {
            let was_flat = engine.machine().is_flat();
            let report = engine.on_bar(&bar, &mut host).unwrap();

            if let Some(pos) = &report.entered {
                prop_assert!(bar.index >= min_bars);
                prop_assert!(was_flat || report.closed_trade.is_some());
                prop_assert_eq!(pos.entry_bar, bar.index);
            }
            if let Some(pos) = engine.machine().position() {
                prop_assert!(pos.quantity >= 1);
                prop_assert!(pos.quantity <= pos.initial_quantity);
                if let Some((entry_bar, stop)) = last_stop {
                    if entry_bar == pos.entry_bar {
                        match pos.side {
                            PositionSide::Long => prop_assert!(pos.stop_loss >= stop),
                            PositionSide::Short => prop_assert!(pos.stop_loss <= stop),
                        }
                    }
                }
                last_stop = Some((pos.entry_bar, pos.stop_loss));
            } else {
                last_stop = None;
            }
        }

        let entries = host.entries().count();
        let full_exits = host
            .exits()
            .filter(|o| o.action == pivotlab_core::host::OrderAction::ExitFull)
            .count();
        let open = usize::from(!engine.machine().is_flat());
        prop_assert_eq!(entries, full_exits + open);
    }
}
