//! Replaying the same bars through a fresh engine yields identical output.

use pivotlab_core::config::{StrategyConfig, StrategyPreset};
use pivotlab_core::engine::{BarReport, StrategyEngine};
use pivotlab_core::fingerprint::RunFingerprint;
use pivotlab_core::host::RecordingHost;
use pivotlab_core::synthetic::SyntheticMarket;

fn replay(config: &StrategyConfig, seed: u64) -> (Vec<BarReport>, RecordingHost) {
    let bars = SyntheticMarket::new(seed).generate(1200);
    let mut engine = StrategyEngine::new(config.clone()).unwrap();
    let mut host = RecordingHost::with_equity(100_000.0);
    let reports = bars
        .iter()
        .map(|bar| engine.on_bar(bar, &mut host).unwrap())
        .collect();
    (reports, host)
}

#[test]
fn same_bars_same_reports_and_host_calls() {
    for preset in StrategyPreset::all() {
        let config = preset.config();
        let (reports_a, host_a) = replay(&config, 17);
        let (reports_b, host_b) = replay(&config, 17);

        assert_eq!(reports_a, reports_b, "{preset} reports diverged");
        assert_eq!(host_a.orders, host_b.orders);
        assert_eq!(host_a.series, host_b.series);
        assert_eq!(host_a.annotations, host_b.annotations);
    }
}

#[test]
fn run_matches_bar_by_bar_processing() {
    let config = StrategyPreset::Baseline.config();
    let bars = SyntheticMarket::new(5).generate(1200);

    let (reports, stepped_host) = replay(&config, 5);
    let stepped_trades: Vec<_> = reports.into_iter().filter_map(|r| r.closed_trade).collect();

    let mut engine = StrategyEngine::new(config).unwrap();
    let mut host = RecordingHost::with_equity(100_000.0);
    let result = engine.run(&bars, &mut host).unwrap();

    assert_eq!(result.trades, stepped_trades);
    assert_eq!(result.summary.trade_count, stepped_trades.len());
    assert_eq!(result.summary.bars, bars.len());
    assert_eq!(host.orders, stepped_host.orders);
}

#[test]
fn fingerprint_is_stable_across_runs() {
    let config = StrategyPreset::Optimized.config();
    let bars = SyntheticMarket::new(9).generate(300);
    let a = RunFingerprint::new(&config, &bars, Some("optimized".into()), Some(9)).unwrap();
    let b = RunFingerprint::new(&config, &bars, Some("optimized".into()), Some(9)).unwrap();
    assert_eq!(a, b);

    let other_bars = SyntheticMarket::new(10).generate(300);
    let c = RunFingerprint::new(&config, &other_bars, Some("optimized".into()), Some(10)).unwrap();
    assert_ne!(a.run_id, c.run_id);
    assert_eq!(a.config_hash, c.config_hash);
    assert_ne!(a.dataset_hash, c.dataset_hash);
}
