//! Run artifacts: summary JSON, trade tape CSV, per-bar series CSV.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pivotlab_core::domain::{Bar, TradeRecord};
use pivotlab_core::engine::{RunResult, RunSummary};
use pivotlab_core::fingerprint::RunFingerprint;
use pivotlab_core::host::{RecordingHost, SeriesTag};
use serde::{Deserialize, Serialize};

/// Contents of `summary.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub fingerprint: RunFingerprint,
    pub summary: RunSummary,
    pub order_requests: usize,
    pub open_position_at_end: bool,
}

// ─── CSV export ─────────────────────────────────────────────────────

pub fn trades_csv(trades: &[TradeRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "side",
        "setup",
        "entry_bar",
        "entry_price",
        "exit_bar",
        "exit_price",
        "quantity",
        "realized_points",
        "bars_held",
        "exit_reason",
        "outcome",
    ])?;
    for t in trades {
        wtr.write_record([
            format!("{:?}", t.side),
            t.setup.name().to_string(),
            t.entry_bar.to_string(),
            format!("{:.2}", t.entry_price),
            t.exit_bar.to_string(),
            format!("{:.2}", t.exit_price),
            t.quantity.to_string(),
            format!("{:.2}", t.realized_points),
            t.bars_held.to_string(),
            t.exit_reason.name().to_string(),
            format!("{:?}", t.outcome),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// One row per bar: time, close and every series value.
pub fn series_csv(bars: &[Bar], host: &RecordingHost) -> Result<String> {
    let mut rows: BTreeMap<usize, [f64; SeriesTag::ALL.len()]> = BTreeMap::new();
    for point in &host.series {
        let column = SeriesTag::ALL
            .iter()
            .position(|tag| *tag == point.tag)
            .unwrap_or_default();
        rows.entry(point.bar_index).or_default()[column] = point.value;
    }

    let mut wtr = csv::Writer::from_writer(vec![]);
    let mut header = vec!["bar_index", "time", "close"];
    header.extend(SeriesTag::ALL.iter().map(|tag| tag.name()));
    wtr.write_record(&header)?;

    for bar in bars {
        let values = rows.get(&bar.index).copied().unwrap_or_default();
        let mut record = vec![
            bar.index.to_string(),
            bar.time.to_string(),
            format!("{:.2}", bar.close),
        ];
        record.extend(values.iter().map(|v| v.to_string()));
        wtr.write_record(&record)?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write `summary.json`, `trades.csv` and `series.csv` under
/// `output_dir/<short run id>/` and return that directory.
pub fn save_artifacts(
    output_dir: &Path,
    manifest: &RunManifest,
    result: &RunResult,
    bars: &[Bar],
    host: &RecordingHost,
) -> Result<PathBuf> {
    let run_id = &manifest.fingerprint.run_id;
    let run_dir = output_dir.join(&run_id[..run_id.len().min(12)]);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let json = serde_json::to_string_pretty(manifest).context("failed to serialize summary")?;
    std::fs::write(run_dir.join("summary.json"), json)?;
    std::fs::write(run_dir.join("trades.csv"), trades_csv(&result.trades)?)?;
    std::fs::write(run_dir.join("series.csv"), series_csv(bars, host)?)?;

    Ok(run_dir)
}

pub fn print_summary(manifest: &RunManifest) {
    let s = &manifest.summary;
    let fp = &manifest.fingerprint;
    println!();
    println!("=== PivotLab Run ===");
    println!("Run:            {}", &fp.run_id[..fp.run_id.len().min(12)]);
    if let Some(preset) = &fp.preset {
        println!("Preset:         {preset}");
    }
    println!("Config:         {}", fp.config_hash.short());
    println!("Bars:           {}", s.bars);
    println!("Orders:         {}", manifest.order_requests);
    println!("Trades:         {} ({} won, {} lost)", s.trade_count, s.wins, s.losses);
    println!();
    println!("--- Performance (points) ---");
    println!("Total:          {:.2}", s.total_points);
    println!("Win Rate:       {:.1}%", s.win_rate * 100.0);
    println!("Profit Factor:  {:.2}", s.profit_factor);
    println!("Max Drawdown:   {:.2}", s.max_drawdown_points);
    println!("Max Consec Loss:{}", s.max_consecutive_losses);
    if !s.trades_by_setup.is_empty() {
        println!();
        println!("--- Setups ---");
        for (setup, n) in &s.trades_by_setup {
            println!("{setup:<24}{n:>6}");
        }
    }
    if !s.rejections.is_empty() {
        println!();
        println!("--- Rejected entries by gate ---");
        for (gate, n) in &s.rejections {
            println!("{gate:<24}{n:>6}");
        }
    }
    if manifest.open_position_at_end {
        println!();
        println!("NOTE: a position was still open after the last bar");
    }
    println!();
}
