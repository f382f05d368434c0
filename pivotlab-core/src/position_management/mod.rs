//! Position management.
//!
//! - `machine`: the `Flat → Entered → Flat` state machine (entry levels,
//!   sizing, partial and full exits).
//! - `ratchet`: stop levels that only move in the trade's favor.
//! - `trailing`: trailing-stop proposals fed through the ratchet.
//! - `sizer`: fixed and risk-percent position sizing.
//!
//! The machine never fills orders itself; it submits requests to the host and
//! assumes they fill at the stated price.

pub mod machine;
pub mod ratchet;
pub mod sizer;
pub mod trailing;

pub use machine::{EntryContext, EntryLevels, ManageOutcome, PositionStateMachine};
pub use ratchet::RatchetState;
pub use sizer::{build_sizer, FixedSizer, RiskPercentSizer, Sizer, SizingContext};
pub use trailing::TrailingMode;
