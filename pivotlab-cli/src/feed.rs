//! CSV bar feed.
//!
//! Expected header: `time,open,high,low,close,volume`. `time` is a naive
//! local timestamp, either `2024-01-02 09:30:00` or `2024-01-02T09:30:00`
//! (seconds optional). Bar indices are assigned by row order.

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use pivotlab_core::domain::Bar;
use serde::Deserialize;

const TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

#[derive(Debug, Deserialize)]
struct CsvBar {
    time: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

fn parse_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Read every bar from a CSV file.
pub fn read_bars(path: &Path) -> Result<Vec<Bar>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open bar file {}", path.display()))?;

    let mut bars = Vec::new();
    for (index, row) in reader.deserialize::<CsvBar>().enumerate() {
        let row = row.with_context(|| format!("{}: bad row {}", path.display(), index + 1))?;
        let Some(time) = parse_time(&row.time) else {
            bail!("{}: row {}: unrecognised time {:?}", path.display(), index + 1, row.time);
        };
        if let Some(prev) = bars.last().map(|b: &Bar| b.time) {
            if time <= prev {
                bail!(
                    "{}: row {}: time {time} does not follow {prev}",
                    path.display(),
                    index + 1
                );
            }
        }
        bars.push(Bar::new(index, time, row.open, row.high, row.low, row.close, row.volume));
    }

    if bars.is_empty() {
        bail!("{}: no bars", path.display());
    }
    tracing::info!(path = %path.display(), bars = bars.len(), "loaded bars");
    Ok(bars)
}
