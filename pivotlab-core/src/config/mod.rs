//! Strategy configuration.
//!
//! One `StrategyConfig` drives the whole pipeline. Every section carries
//! `#[serde(default)]` so a TOML file only needs the keys it overrides.
//! Optional stages (admission filters, cooldown, daily cap, adaptive targets,
//! time stop) are `Option`s: `None` switches the stage off.
//!
//! Configuration is validated once, at the boundary, by [`StrategyConfig::validate`].
//! Components constructed from a validated config may `assert!` their
//! preconditions.

mod preset;
mod validate;

pub use preset::StrategyPreset;
pub use validate::{MAX_EVENT_WINDOW_BARS, MAX_MINUTES};

use std::path::{Path, PathBuf};

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::detectors::{BosPolicy, ValidityHorizon};
use crate::domain::PositionSide;
use crate::position_management::TrailingMode;

// ─── Error type ──────────────────────────────────────────────────────

/// Rejections raised at the configuration boundary.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be at least {min} (got {value})")]
    TooSmall {
        field: &'static str,
        min: usize,
        value: usize,
    },

    #[error("{field} must be a positive finite number (got {value})")]
    NotPositive { field: &'static str, value: f64 },

    #[error("{field} must be at most {max} (got {value})")]
    TooLarge {
        field: &'static str,
        max: usize,
        value: usize,
    },

    #[error("{field} must be within [{min}, {max}] (got {value})")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },

    #[error("{field}: take-profit multiples must satisfy 0 < tp1 < tp2 (got {tp1}, {tp2})")]
    TargetOrder {
        field: &'static str,
        tp1: f64,
        tp2: f64,
    },

    #[error("{field}: session window {start} - {end} is empty")]
    EmptySession {
        field: &'static str,
        start: NaiveTime,
        end: NaiveTime,
    },

    #[error("{field} must list at least one session window")]
    NoSessions { field: &'static str },

    #[error("at least one entry setup must be enabled")]
    NoSetupEnabled,

    #[error("unknown preset: {0}")]
    UnknownPreset(String),

    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to write TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to encode config for hashing: {0}")]
    Encode(#[from] serde_json::Error),
}

// ─── Shared value types ──────────────────────────────────────────────

/// Which directions may be traded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradingMode {
    LongOnly,
    ShortOnly,
    LongShort,
}

impl TradingMode {
    pub fn allows(self, side: PositionSide) -> bool {
        match self {
            TradingMode::LongOnly => side == PositionSide::Long,
            TradingMode::ShortOnly => side == PositionSide::Short,
            TradingMode::LongShort => true,
        }
    }
}

/// Inclusive time-of-day window on bar timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl SessionWindow {
    /// Panics on invalid clock values; only used with literal times.
    pub fn hm(start: (u32, u32), end: (u32, u32)) -> Self {
        let t = |(h, m): (u32, u32)| {
            NaiveTime::from_hms_opt(h, m, 0).expect("literal session time must be valid")
        };
        Self {
            start: t(start),
            end: t(end),
        }
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        time >= self.start && time <= self.end
    }
}

// ─── Sections ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwingConfig {
    /// Bars on each side of the pivot.
    pub window: usize,
    /// Minimum margin over the strictest neighbor, in price units. 0 disables.
    pub threshold: f64,
    /// Recent pivots kept per kind.
    pub keep: usize,
}

impl Default for SwingConfig {
    fn default() -> Self {
        Self {
            window: 2,
            threshold: 0.0,
            keep: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Most recent pivots per side examined each bar.
    pub max_candidates: usize,
    /// Cap on unswept pivots per side; oldest evicted.
    pub max_active: usize,
    pub horizon: ValidityHorizon,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            horizon: ValidityHorizon::Minutes(1440),
            max_candidates: 3,
            max_active: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    pub policy: BosPolicy,
    /// Bars that must have been seen before a candidate may form.
    pub min_bars: usize,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            policy: BosPolicy::Alternating,
            min_bars: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderBlockConfig {
    pub scan_limit: usize,
    /// Zone height bound as a multiple of ATR.
    pub atr_multiplier: f64,
    pub max_blocks: usize,
}

impl Default for OrderBlockConfig {
    fn default() -> Self {
        Self {
            scan_limit: 10,
            atr_multiplier: 3.5,
            max_blocks: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GapConfig {
    pub lookback_bars: usize,
}

impl Default for GapConfig {
    fn default() -> Self {
        Self { lookback_bars: 50 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub equilibrium_lookback: usize,
    /// Bars a sweep or break stays "recent" after the bar it happened on.
    pub event_window_bars: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            equilibrium_lookback: 10,
            event_window_bars: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub atr_period: usize,
    /// SMA period over ATR, the volatility baseline.
    pub atr_average_period: usize,
    pub adx_period: usize,
    pub trend_ema_period: usize,
    pub volume_ema_period: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            atr_period: 14,
            atr_average_period: 20,
            adx_period: 14,
            trend_ema_period: 50,
            volume_ema_period: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetupConfig {
    pub sweep_bos_order_block: bool,
    pub sweep_bos: bool,
    pub sweep_bos_gap: bool,
    pub equilibrium_confluence: bool,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            sweep_bos_order_block: true,
            sweep_bos: false,
            sweep_bos_gap: false,
            equilibrium_confluence: false,
        }
    }
}

impl SetupConfig {
    pub fn any_enabled(&self) -> bool {
        self.sweep_bos_order_block || self.sweep_bos || self.sweep_bos_gap || self.equilibrium_confluence
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeFilterConfig {
    /// Minimum bar volume over its EMA.
    pub min_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendFilterConfig {
    pub min_adx: f64,
}

/// Admission filters; `None` disables a filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions: Option<Vec<SessionWindow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<VolumeFilterConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<TrendFilterConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Reject entries scoring below `threshold`.
    pub enabled: bool,
    pub threshold: u8,
    pub prime_session: SessionWindow,
    pub late_session: SessionWindow,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 70,
            prime_session: SessionWindow::hm((9, 30), (10, 30)),
            late_session: SessionWindow::hm((15, 0), (15, 30)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CooldownConfig {
    /// Consecutive losses that start a cooldown.
    pub after_losses: u32,
    pub minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_daily_trades: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown: Option<CooldownConfig>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_daily_trades: Some(3),
            cooldown: Some(CooldownConfig {
                after_losses: 2,
                minutes: 60,
            }),
        }
    }
}

/// Calmer targets used while ATR sits at or below its average times `volatility_ratio`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveTargets {
    pub volatility_ratio: f64,
    pub tp1_multiple: f64,
    pub tp2_multiple: f64,
}

impl Default for AdaptiveTargets {
    fn default() -> Self {
        Self {
            volatility_ratio: 1.2,
            tp1_multiple: 1.0,
            tp2_multiple: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryConfig {
    /// No entries before this many bars have been processed.
    pub min_bars_before_trading: usize,
    pub stop_atr_multiple: f64,
    pub max_stop_ticks: f64,
    pub tick_size: f64,
    pub tp1_multiple: f64,
    pub tp2_multiple: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adaptive_targets: Option<AdaptiveTargets>,
}

impl Default for EntryConfig {
    fn default() -> Self {
        Self {
            min_bars_before_trading: 20,
            stop_atr_multiple: 0.5,
            max_stop_ticks: 50.0,
            tick_size: 0.25,
            tp1_multiple: 1.5,
            tp2_multiple: 2.5,
            adaptive_targets: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SizingMethod {
    Fixed { quantity: u32 },
    /// Risk `percent` of equity per trade; `point_value` is currency per
    /// point per unit.
    RiskPercent { percent: f64, point_value: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    /// Halve the size while ATR exceeds its average times this ratio.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high_volatility_ratio: Option<f64>,
    pub method: SizingMethod,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            method: SizingMethod::Fixed { quantity: 1 },
            high_volatility_ratio: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagementConfig {
    /// Take-profit tiers are ignored until `bars_since_entry` exceeds this.
    pub tp_grace_bars: usize,
    pub max_trail_ticks: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_stop_bars: Option<usize>,
    pub trailing: TrailingMode,
}

impl Default for ManagementConfig {
    fn default() -> Self {
        Self {
            tp_grace_bars: 1,
            trailing: TrailingMode::default(),
            max_trail_ticks: 50.0,
            time_stop_bars: None,
        }
    }
}

// ─── StrategyConfig ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub trading_mode: TradingMode,
    pub swing: SwingConfig,
    pub sweep: SweepConfig,
    pub structure: StructureConfig,
    pub order_block: OrderBlockConfig,
    pub gap: GapConfig,
    pub context: ContextConfig,
    pub indicators: IndicatorConfig,
    pub setups: SetupConfig,
    pub filters: FilterConfig,
    pub quality: QualityConfig,
    pub risk: RiskConfig,
    pub entry: EntryConfig,
    pub sizing: SizingConfig,
    pub management: ManagementConfig,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            trading_mode: TradingMode::LongShort,
            swing: SwingConfig::default(),
            sweep: SweepConfig::default(),
            structure: StructureConfig::default(),
            order_block: OrderBlockConfig::default(),
            gap: GapConfig::default(),
            context: ContextConfig::default(),
            indicators: IndicatorConfig::default(),
            setups: SetupConfig::default(),
            filters: FilterConfig::default(),
            quality: QualityConfig::default(),
            risk: RiskConfig::default(),
            entry: EntryConfig::default(),
            sizing: SizingConfig::default(),
            management: ManagementConfig::default(),
        }
    }
}

impl StrategyConfig {
    /// Parse and validate.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: StrategyConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Bars the shared history must retain for every lookback read.
    pub fn history_capacity(&self) -> usize {
        let trail = match self.management.trailing {
            TrailingMode::Off => 0,
            TrailingMode::Structure { lookback, .. } => lookback,
            TrailingMode::WeightedAtr { lookback, .. } => lookback,
        };
        [
            2 * self.swing.window + 1,
            self.order_block.scan_limit + 1,
            self.context.equilibrium_lookback + 1,
            trail + 1,
            3,
        ]
        .into_iter()
        .max()
        .unwrap_or(3)
    }
}
