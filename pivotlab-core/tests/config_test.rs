//! Loading configuration from disk, presets, and config fingerprints.

use std::io::Write;

use pivotlab_core::config::{ConfigError, StrategyConfig, StrategyPreset, TradingMode};
use pivotlab_core::detectors::{BosPolicy, ValidityHorizon};
use pivotlab_core::engine::StrategyEngine;

fn write_temp(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn loads_partial_file_over_defaults() {
    let file = write_temp(
        r#"
        trading_mode = "short_only"

        [structure]
        policy = "swing_pivot"

        [risk]
        max_daily_trades = 5
        "#,
    );
    let config = StrategyConfig::from_file(file.path()).unwrap();
    assert_eq!(config.trading_mode, TradingMode::ShortOnly);
    assert_eq!(config.structure.policy, BosPolicy::SwingPivot);
    assert_eq!(config.risk.max_daily_trades, Some(5));
    assert_eq!(config.swing, StrategyConfig::default().swing);
}

#[test]
fn invalid_values_are_rejected_at_load() {
    let file = write_temp("[swing]\nwindow = 0\n");
    let err = StrategyConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::TooSmall { field: "swing.window", .. }), "{err}");
}

#[test]
fn out_of_range_spans_are_rejected_at_load() {
    let file = write_temp("[sweep.horizon]\nkind = \"minutes\"\nvalue = 1000000000000\n");
    let err = StrategyConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::OutOfRange { field: "sweep.horizon", .. }), "{err}");

    let file = write_temp("[risk.cooldown]\nafter_losses = 2\nminutes = 9223372036854775807\n");
    let err = StrategyConfig::from_file(file.path()).unwrap_err();
    assert!(
        matches!(err, ConfigError::OutOfRange { field: "risk.cooldown.minutes", .. }),
        "{err}"
    );

    let file = write_temp("[context]\nevent_window_bars = 100001\n");
    let err = StrategyConfig::from_file(file.path()).unwrap_err();
    assert!(
        matches!(err, ConfigError::TooLarge { field: "context.event_window_bars", .. }),
        "{err}"
    );
}

#[test]
fn engine_refuses_spans_that_cannot_be_represented() {
    let mut config = StrategyConfig::default();
    config.sweep.horizon = ValidityHorizon::Minutes(1_000_000_000_000);
    assert!(StrategyEngine::new(config).is_err());

    let mut config = StrategyConfig::default();
    config.context.event_window_bars = usize::MAX;
    assert!(StrategyEngine::new(config).is_err());
}

#[test]
fn presets_survive_a_trip_through_disk() {
    for preset in StrategyPreset::all() {
        let config = preset.config();
        let file = write_temp(&config.to_toml_string().unwrap());
        let loaded = StrategyConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, config, "{preset}");
        assert_eq!(loaded.fingerprint().unwrap(), config.fingerprint().unwrap());
    }
}

#[test]
fn any_parameter_change_moves_the_fingerprint() {
    let base = StrategyConfig::default();
    let mut tweaked = base.clone();
    tweaked.entry.tp2_multiple += 0.25;
    assert_ne!(base.fingerprint().unwrap(), tweaked.fingerprint().unwrap());

    let hashes: std::collections::HashSet<_> = StrategyPreset::all()
        .iter()
        .map(|p| p.config().fingerprint().unwrap())
        .collect();
    assert_eq!(hashes.len(), 3);
}

#[test]
fn preset_names_parse() {
    assert_eq!("optimized".parse::<StrategyPreset>().unwrap(), StrategyPreset::Optimized);
    assert_eq!(
        "Sweep-Bos-Order-Block".parse::<StrategyPreset>().unwrap(),
        StrategyPreset::SweepBosOrderBlock
    );
    assert!(matches!(
        "aggressive".parse::<StrategyPreset>(),
        Err(ConfigError::UnknownPreset(_))
    ));
}
