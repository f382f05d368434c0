//! Domain types for PivotLab

pub mod bar;
pub mod position;
pub mod structure;
pub mod trade;
pub mod zone;

pub use bar::Bar;
pub use position::{Position, PositionSide};
pub use structure::{Direction, StructureBreak, SweepEvent, SwingKind, SwingPoint};
pub use trade::{EntrySetup, ExitFill, ExitReason, TradeOutcome, TradeRecord};
pub use zone::{FairValueGap, OrderBlock};
