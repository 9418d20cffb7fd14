// Data-driven controller configuration.
//
// Every tunable of the colony decision engine lives in `HiveConfig`, loaded
// from JSON. The engine never hard-codes a threshold; it reads from the config.
// Missing fields fall back to the defaults below (`#[serde(default)]`), so a
// config file only needs to list what it overrides.
//
// See also: `colony.rs`, the only consumer of these values.

use crate::types::BodyPart;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse hive config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read hive config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HiveConfig {
    /// Recompute the cached maturity level on ticks divisible by this.
    pub level_interval_ticks: u64,
    /// Rate limit for the "source has no output" diagnostic.
    pub no_output_log_interval_ticks: u64,
    /// Upper bound on miners per source (further bounded by open tiles).
    pub max_miners_per_source: usize,
    /// Workers requested once containers exist.
    pub worker_target: usize,
    /// Radius around a source searched for an output container or its site.
    pub output_container_radius: u32,
    /// Towers and workers repair structures below this fraction of max hits.
    pub repair_threshold: f64,
    /// Containers must hold more than this fraction of a unit's free capacity
    /// to be preferred for withdrawal.
    pub withdraw_fill_ratio: f64,
    /// Controller level below which workers always upgrade.
    pub urgent_controller_level: u8,
    /// Downgrade countdown below which workers always upgrade.
    pub downgrade_threshold_ticks: u32,
    /// Controller level at which the colony reaches its top tier.
    pub max_controller_level: u8,
    pub miner_body: Vec<BodyPart>,
    pub hauler_body: Vec<BodyPart>,
    pub worker_body: Vec<BodyPart>,
}

impl Default for HiveConfig {
    fn default() -> Self {
        Self {
            level_interval_ticks: 10,
            no_output_log_interval_ticks: 100,
            max_miners_per_source: 3,
            worker_target: 4,
            output_container_radius: 2,
            repair_threshold: 0.9,
            withdraw_fill_ratio: 0.5,
            urgent_controller_level: 2,
            downgrade_threshold_ticks: 1000,
            max_controller_level: 8,
            miner_body: vec![BodyPart::Work, BodyPart::Work, BodyPart::Carry, BodyPart::Move],
            hauler_body: vec![
                BodyPart::Carry,
                BodyPart::Carry,
                BodyPart::Carry,
                BodyPart::Carry,
                BodyPart::Move,
                BodyPart::Move,
            ],
            worker_body: vec![BodyPart::Work, BodyPart::Carry, BodyPart::Move],
        }
    }
}

impl HiveConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = HiveConfig::from_json(r#"{"worker_target": 6}"#).unwrap();
        assert_eq!(config.worker_target, 6);
        assert_eq!(config.level_interval_ticks, 10);
        assert_eq!(config.miner_body, HiveConfig::default().miner_body);
    }

    #[test]
    fn default_roundtrips_through_json() {
        let config = HiveConfig::default();
        let back = HiveConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = HiveConfig::from_file(Path::new("/nonexistent/hive.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn bad_json_is_parse_error() {
        let err = HiveConfig::from_json("[1, 2").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
