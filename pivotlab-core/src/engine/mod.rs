//! Strategy engine: one synchronous `on_bar` call per finalized bar.
//!
//! - `pipeline`: `StrategyEngine` and the fixed per-bar stage order.
//! - `report`: the per-bar `BarReport`.
//! - `summary`: run statistics over the closed trades.
//! - `warmup`: bars required before the first entry.

pub mod pipeline;
pub mod report;
pub mod summary;
pub mod warmup;

pub use pipeline::{IndicatorSnapshot, StrategyEngine};
pub use report::BarReport;
pub use summary::RunSummary;
pub use warmup::WarmupState;

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, TradeRecord};
use crate::host::Host;

/// Bars the engine refuses to process.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("bar index {got} does not follow {previous}")]
    OutOfOrder { previous: usize, got: usize },

    #[error("bar {index} has inconsistent OHLCV values")]
    InvalidBar { index: usize },
}

/// Closed trades and summary of a complete run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub trades: Vec<TradeRecord>,
    pub summary: RunSummary,
}

impl StrategyEngine {
    /// Feed every bar in order and collect the closed trades.
    pub fn run(&mut self, bars: &[Bar], host: &mut dyn Host) -> Result<RunResult, EngineError> {
        let mut trades = Vec::new();
        for bar in bars {
            let report = self.on_bar(bar, host)?;
            trades.extend(report.closed_trade);
        }
        let summary = RunSummary::from_trades(bars.len(), &trades, self.rejections());
        Ok(RunResult { trades, summary })
    }
}
