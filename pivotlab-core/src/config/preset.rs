//! Named configurations for the common strategy variants.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{
    AdaptiveTargets, ConfigError, FilterConfig, QualityConfig, SessionWindow, SetupConfig,
    StrategyConfig, StructureConfig, TrendFilterConfig, VolumeFilterConfig,
};
use crate::detectors::BosPolicy;
use crate::position_management::TrailingMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyPreset {
    /// Every setup on, no admission filters, pivot-based structure breaks.
    Baseline,
    /// Canonical sweep + BOS + order-block setup only.
    SweepBosOrderBlock,
    /// Canonical setup behind every filter, quality scoring, weighted trailing
    /// and volatility-aware targets and sizing.
    Optimized,
}

impl StrategyPreset {
    pub fn all() -> [StrategyPreset; 3] {
        [
            StrategyPreset::Baseline,
            StrategyPreset::SweepBosOrderBlock,
            StrategyPreset::Optimized,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            StrategyPreset::Baseline => "baseline",
            StrategyPreset::SweepBosOrderBlock => "sweep_bos_order_block",
            StrategyPreset::Optimized => "optimized",
        }
    }

    pub fn config(self) -> StrategyConfig {
        let base = StrategyConfig::default();
        match self {
            StrategyPreset::Baseline => StrategyConfig {
                structure: StructureConfig {
                    policy: BosPolicy::SwingPivot,
                    ..base.structure
                },
                setups: SetupConfig {
                    sweep_bos_order_block: true,
                    sweep_bos: true,
                    sweep_bos_gap: true,
                    equilibrium_confluence: true,
                },
                ..base
            },
            StrategyPreset::SweepBosOrderBlock => base,
            StrategyPreset::Optimized => {
                let mut config = StrategyConfig {
                    structure: StructureConfig {
                        policy: BosPolicy::SwingPivot,
                        ..base.structure.clone()
                    },
                    filters: FilterConfig {
                        sessions: Some(vec![
                            SessionWindow::hm((9, 30), (11, 30)),
                            SessionWindow::hm((13, 30), (15, 30)),
                        ]),
                        volume: Some(VolumeFilterConfig { min_ratio: 1.1 }),
                        trend: Some(TrendFilterConfig { min_adx: 20.0 }),
                    },
                    quality: QualityConfig {
                        enabled: true,
                        threshold: 70,
                        ..base.quality.clone()
                    },
                    ..base
                };
                config.entry.adaptive_targets = Some(AdaptiveTargets::default());
                config.sizing.high_volatility_ratio = Some(1.5);
                config.management.trailing = TrailingMode::weighted_atr();
                config
            }
        }
    }
}

impl fmt::Display for StrategyPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyPreset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('-', "_");
        StrategyPreset::all()
            .into_iter()
            .find(|p| p.name() == key)
            .ok_or_else(|| ConfigError::UnknownPreset(s.to_string()))
    }
}
