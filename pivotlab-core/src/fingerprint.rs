//! Run fingerprinting: deterministic identification of a configuration, a
//! bar dataset, and the run that combined them.
//!
//! - `ConfigHash`: BLAKE3 over the canonical JSON of a `StrategyConfig`.
//! - `DatasetHash`: BLAKE3 over every bar's index, time and OHLCV bits.
//! - `RunFingerprint`: both hashes plus the run's identity, written next to
//!   the CLI's reports.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, StrategyConfig};
use crate::domain::Bar;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigHash(pub String);

impl ConfigHash {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }

    /// First 12 hex digits, for display.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for ConfigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetHash(pub String);

impl DatasetHash {
    pub fn of_bars(bars: &[Bar]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for bar in bars {
            hasher.update(&(bar.index as u64).to_le_bytes());
            hasher.update(&bar.time.and_utc().timestamp().to_le_bytes());
            for value in [bar.open, bar.high, bar.low, bar.close, bar.volume] {
                hasher.update(&value.to_bits().to_le_bytes());
            }
        }
        Self(hasher.finalize().to_hex().to_string())
    }
}

impl fmt::Display for DatasetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StrategyConfig {
    /// Exact identity of every parameter value.
    ///
    /// Struct fields serialize in declaration order, so the JSON is canonical.
    pub fn fingerprint(&self) -> Result<ConfigHash, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(ConfigHash::from_bytes(json.as_bytes()))
    }
}

/// Identity of a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFingerprint {
    pub run_id: String,
    pub preset: Option<String>,
    pub seed: Option<u64>,
    pub bars: usize,
    pub config_hash: ConfigHash,
    pub dataset_hash: DatasetHash,
}

impl RunFingerprint {
    pub fn new(
        config: &StrategyConfig,
        bars: &[Bar],
        preset: Option<String>,
        seed: Option<u64>,
    ) -> Result<Self, ConfigError> {
        let config_hash = config.fingerprint()?;
        let dataset_hash = DatasetHash::of_bars(bars);
        let mut hasher = blake3::Hasher::new();
        hasher.update(config_hash.0.as_bytes());
        hasher.update(dataset_hash.0.as_bytes());
        hasher.update(&seed.unwrap_or_default().to_le_bytes());
        Ok(Self {
            run_id: hasher.finalize().to_hex().to_string(),
            preset,
            seed,
            bars: bars.len(),
            config_hash,
            dataset_hash,
        })
    }
}
