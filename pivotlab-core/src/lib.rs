//! PivotLab Core: market-structure detection and a single-position state
//! machine, driven one finalized bar at a time.
//!
//! - Domain types (bars, swing points, sweeps, breaks, zones, positions, trades)
//! - Streaming indicators (ATR, ADX, EMA, SMA)
//! - Incremental detectors: swings, liquidity sweeps, breaks of structure,
//!   order blocks, fair value gaps, market context
//! - Signal aggregation: admission filters, quality score, entry setups
//! - Risk counters and the position state machine
//! - `StrategyEngine`: the fixed per-bar pipeline over all of the above
//! - Validated TOML configuration with named presets and BLAKE3 fingerprints

pub mod config;
pub mod detectors;
pub mod domain;
pub mod engine;
pub mod fingerprint;
pub mod host;
pub mod indicators;
pub mod position_management;
pub mod risk;
pub mod signal;
pub mod synthetic;
