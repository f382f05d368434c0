/// Bars that must pass before the engine may enter a trade.
///
/// The bar being evaluated is not counted: with `warmup_bars = 20` the first
/// bar that can trade is the one at zero-based position 20.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarmupState {
    warmup_bars: usize,
    bars_processed: usize,
}

impl WarmupState {
    pub fn new(warmup_bars: usize) -> Self {
        Self {
            warmup_bars,
            bars_processed: 0,
        }
    }

    /// Count a bar once the engine is done with it.
    pub fn process_bar(&mut self) {
        self.bars_processed += 1;
    }

    pub fn is_warm(&self) -> bool {
        self.bars_processed >= self.warmup_bars
    }

    pub fn bars_until_warm(&self) -> usize {
        self.warmup_bars.saturating_sub(self.bars_processed)
    }

    pub fn bars_processed(&self) -> usize {
        self.bars_processed
    }
}
