//! Incremental market-structure detectors.
//!
//! Each detector owns its own bounded state and is updated once per bar in
//! the fixed pipeline order: swing → sweep → structure → order block → gap.
//! A detector reads the shared `BarHistory` and the current-bar output of
//! the stages before it, never a later stage.

pub mod context;
pub mod fvg;
pub mod history;
pub mod order_block;
pub mod structure;
pub mod sweep;
pub mod swing;
pub mod window;

pub use context::{MarketContext, Trend};
pub use fvg::{FairValueGapTracker, GapUpdate};
pub use history::BarHistory;
pub use order_block::{OrderBlockEngine, ZoneOutcome};
pub use structure::{BosCandidate, BosPolicy, CandidateKind, CandidateState, StructureBreakDetector};
pub use sweep::{LiquiditySweepDetector, SweepUpdate, ValidityHorizon};
pub use swing::{SwingDetector, SwingUpdate};
pub use window::{DirectionalWindow, EventWindow, RecentEvents};
