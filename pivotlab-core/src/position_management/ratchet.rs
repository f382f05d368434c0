/// Stop ratchet.
///
/// **Core rule:** a stop may tighten, never loosen. Breakeven moves and the
/// trailing stop both go through `apply`, so neither can hand back ground
/// already locked in.
use serde::{Deserialize, Serialize};

use crate::domain::PositionSide;

/// Ratchet state for one position's stop-loss.
///
/// - Long: the stop only rises (high-water mark).
/// - Short: the stop only falls (low-water mark).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatchetState {
    level: f64,
    side: PositionSide,
}

impl RatchetState {
    pub fn with_initial_level(side: PositionSide, initial_level: f64) -> Self {
        Self {
            level: initial_level,
            side,
        }
    }

    /// Apply the ratchet to a proposed level and return the resulting stop.
    ///
    /// # Example
    /// ```
    /// use pivotlab_core::domain::PositionSide;
    /// use pivotlab_core::position_management::RatchetState;
    ///
    /// let mut ratchet = RatchetState::with_initial_level(PositionSide::Long, 980.0);
    /// assert_eq!(ratchet.apply(1000.0), 1000.0); // breakeven
    /// assert_eq!(ratchet.apply(990.0), 1000.0);  // loosening blocked
    /// ```
    pub fn apply(&mut self, proposed: f64) -> f64 {
        self.level = match self.side {
            PositionSide::Long => self.level.max(proposed),
            PositionSide::Short => self.level.min(proposed),
        };
        self.level
    }
}
