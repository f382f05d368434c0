//! Detector behaviour on hand-built bar sequences.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use pivotlab_core::detectors::{
    BarHistory, BosPolicy, CandidateState, FairValueGapTracker, LiquiditySweepDetector,
    OrderBlockEngine, StructureBreakDetector, SwingDetector, ValidityHorizon,
};
use pivotlab_core::config::StrategyConfig;
use pivotlab_core::domain::{Bar, Direction, StructureBreak, SwingKind, SwingPoint};
use pivotlab_core::engine::StrategyEngine;
use pivotlab_core::host::NullHost;

// ── Helpers ──────────────────────────────────────────────────────────

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
}

fn bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    data.iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| {
            Bar::new(i, start() + Duration::minutes(5 * i as i64), o, h, l, c, 1000.0)
        })
        .collect()
}

// ── Break of structure ───────────────────────────────────────────────

#[test]
fn alternating_break_confirms_and_clears_candidate() {
    let data = bars(&[
        (10.0, 10.5, 7.5, 8.0),
        (8.0, 11.5, 7.8, 11.0),
        (6.0, 6.5, 4.5, 5.0),
    ]);
    let swings = SwingDetector::new(2, 0.0, 10);
    let mut detector = StructureBreakDetector::new(BosPolicy::Alternating, 2);
    let mut history = BarHistory::new(8);

    history.push(data[0].clone());
    assert_eq!(detector.update(&history, &swings), None);
    assert_eq!(detector.state(), CandidateState::NoCandidate);

    history.push(data[1].clone());
    assert_eq!(detector.update(&history, &swings), None);
    match detector.state() {
        CandidateState::Formed(candidate) => {
            assert_eq!(candidate.level, 7.5);
            assert_eq!(candidate.formation_bar, 1);
        }
        other => panic!("expected a candidate, got {other:?}"),
    }

    history.push(data[2].clone());
    let event = detector.update(&history, &swings).expect("break confirmed");
    assert_eq!(event.direction, Direction::Bearish);
    assert_eq!(event.level, 7.5);
    assert_eq!(event.bar_index, 2);
    assert_eq!(detector.state(), CandidateState::NoCandidate);
}

#[test]
fn candidate_cancelled_when_price_holds_the_other_side() {
    let data = bars(&[
        (10.0, 10.5, 7.5, 8.0),
        (8.0, 11.5, 7.8, 11.0),
        (11.0, 12.5, 10.5, 12.0),
    ]);
    let swings = SwingDetector::new(2, 0.0, 10);
    let mut detector = StructureBreakDetector::new(BosPolicy::Alternating, 2);
    let mut history = BarHistory::new(8);
    for bar in &data {
        history.push(bar.clone());
        assert_eq!(detector.update(&history, &swings), None);
    }
    assert_eq!(detector.state(), CandidateState::NoCandidate);
}

// ── Liquidity sweep ──────────────────────────────────────────────────

#[test]
fn low_taken_and_reclaimed_is_swept_once() {
    let mut detector = LiquiditySweepDetector::new(ValidityHorizon::Bars(100), 3, 50);
    detector.track(SwingPoint::new(2, start(), 100.0, SwingKind::Low));
    let data = bars(&[
        (101.0, 101.5, 100.5, 101.0),
        (101.0, 101.5, 100.5, 101.0),
        (101.0, 101.5, 100.5, 101.0),
        (101.0, 101.5, 100.5, 101.0),
        (101.0, 101.5, 100.5, 101.0),
        (100.5, 101.5, 99.0, 101.0),
        (100.5, 101.5, 99.0, 101.0),
    ]);

    let update = detector.update(&data[5]);
    let sweep = update.bullish.expect("bullish sweep");
    assert_eq!(sweep.level(), 100.0);
    assert!(sweep.pivot.swept);
    assert!(update.bearish.is_none());
    assert_eq!(detector.active_lows().count(), 0);
    assert_eq!(detector.last_swept_low(), Some(100.0));

    // The same level cannot be swept again.
    assert_eq!(detector.update(&data[6]).bullish, None);
}

#[test]
fn close_through_the_level_is_not_a_sweep() {
    let mut detector = LiquiditySweepDetector::new(ValidityHorizon::Bars(100), 3, 50);
    detector.track(SwingPoint::new(0, start(), 100.0, SwingKind::Low));
    let data = bars(&[(100.5, 101.0, 98.5, 99.0), (100.5, 101.0, 98.5, 99.0)]);
    assert_eq!(detector.update(&data[1]).bullish, None);
    assert_eq!(detector.active_lows().count(), 1);
}

#[test]
fn stale_pivot_expires_by_bar_horizon() {
    let mut detector = LiquiditySweepDetector::new(ValidityHorizon::Bars(3), 3, 50);
    detector.track(SwingPoint::new(0, start(), 100.0, SwingKind::Low));
    let data = bars(&[
        (101.0, 101.5, 100.5, 101.0),
        (101.0, 101.5, 100.5, 101.0),
        (101.0, 101.5, 100.5, 101.0),
        (101.0, 101.5, 100.5, 101.0),
        (101.0, 101.5, 100.5, 101.0),
        (100.5, 101.5, 99.0, 101.0),
    ]);
    assert!(detector.update(&data[5]).bullish.is_none());
    assert_eq!(detector.active_lows().count(), 0);
}

// ── Order blocks ─────────────────────────────────────────────────────

fn bullish_break_history() -> BarHistory {
    let mut history = BarHistory::new(16);
    for bar in bars(&[
        (100.0, 101.0, 99.0, 100.5),
        (100.5, 101.0, 98.0, 98.5),
        (98.5, 100.0, 98.2, 99.8),
        (99.8, 104.0, 99.5, 103.5),
    ]) {
        history.push(bar);
    }
    history
}

fn bullish_break() -> StructureBreak {
    StructureBreak {
        direction: Direction::Bullish,
        level: 99.0,
        formation_bar: 2,
        bar_index: 3,
    }
}

#[test]
fn engine_confirms_break_and_reports_its_order_block() {
    let mut config = StrategyConfig::default();
    config.indicators.atr_period = 2;
    let mut engine = StrategyEngine::new(config).unwrap();
    let data = bars(&[
        (100.0, 101.0, 99.0, 100.5),
        // Bullish then bearish: candidate above at 101.
        (100.5, 101.0, 99.5, 100.0),
        // Body straddles the level; still pending.
        (100.4, 101.6, 100.2, 101.3),
        // Body fully above: bullish break.
        (101.5, 102.5, 101.2, 102.2),
        // Low under the zone bottom.
        (101.0, 101.2, 99.0, 99.2),
    ]);

    let reports: Vec<_> = data
        .iter()
        .map(|bar| engine.on_bar(bar, &mut NullHost).unwrap())
        .collect();
    assert!(reports[..3].iter().all(|r| r.structure_break.is_none()));

    let brk = reports[3].structure_break.as_ref().expect("break on bar 3");
    assert_eq!(brk.direction, Direction::Bullish);
    assert_eq!(brk.level, 101.0);
    assert_eq!(brk.formation_bar, 1);

    // Origin is the bearish bar 1; the zone covers bars 1..=2.
    let ob = reports[3].order_block.as_ref().expect("zone accepted");
    assert_eq!(ob.kind, Direction::Bullish);
    assert_eq!(ob.start_bar_index, 1);
    assert_eq!(ob.created_bar, 3);
    assert_eq!(ob.top, 101.6);
    assert_eq!(ob.bottom, 99.5);
    assert_eq!(ob.volume, 2000.0);
    assert!(reports[3].has_structure_event());
    assert_eq!(engine.order_blocks().blocks().len(), 1);

    assert_eq!(reports[4].invalidated_blocks.len(), 1);
    assert_eq!(reports[4].invalidated_blocks[0].start_bar_index, 1);
    assert!(engine.order_blocks().blocks().is_empty());
}

#[test]
fn breached_zone_is_invalidated_for_good() {
    let mut engine = OrderBlockEngine::new(10, 3.5, 30);
    engine.on_structure_break(&bullish_break(), &bullish_break_history(), Some(2.0));
    let later = Bar::new(5, start(), 99.0, 99.5, 97.5, 98.0, 1000.0);
    let invalidated = engine.update(&later);
    assert_eq!(invalidated.len(), 1);
    assert!(invalidated[0].invalidated);
    assert!(engine.blocks().is_empty());

    let recovery = Bar::new(6, start(), 99.0, 100.5, 99.0, 100.0, 1000.0);
    assert!(engine.update(&recovery).is_empty());
    assert!(engine.retraced_zone(Direction::Bullish, &recovery).is_none());
}

// ── Fair value gaps ──────────────────────────────────────────────────

#[test]
fn gap_detected_then_filled() {
    let mut tracker = FairValueGapTracker::new(50);
    let mut history = BarHistory::new(8);
    let data = bars(&[
        (100.0, 101.0, 99.5, 100.8),
        (102.0, 104.0, 101.5, 103.8),
        (104.0, 105.0, 103.5, 104.5),
        (104.0, 104.5, 101.2, 102.0),
    ]);
    let updates: Vec<_> = data
        .into_iter()
        .map(|bar| {
            history.push(bar);
            tracker.update(&history)
        })
        .collect();

    let gap = updates[2].detected.clone().expect("bullish gap");
    assert_eq!(gap.kind, Direction::Bullish);
    assert_eq!((gap.lower, gap.upper), (101.0, 101.5));

    assert_eq!(updates[3].filled.len(), 1);
    assert!(tracker.latest_open(Direction::Bullish).is_none());
}
