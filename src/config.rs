//! Engine configuration
//!
//! Loaded from TOML. Lookup order: an explicit path, then
//! `<config home>/basketperf/config.toml` when it exists, then defaults.
//! Every field is optional in the file.

use anyhow::Context;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{EngineError, Result};
use crate::reports::contribution::DEFAULT_EPSILON;
use crate::reports::Period;

/// Optional input file locations for the command-line front end
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    pub baskets: Option<PathBuf>,
    pub benchmarks: Option<PathBuf>,
    pub mapping: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Starting value for rebased curves
    pub base_value: Decimal,
    /// Periods reported in summaries and contribution tables
    pub periods: Vec<Period>,
    /// Near-zero guard for contribution normalization
    pub epsilon: Decimal,
    /// Decimal places used when rendering; calculations are never rounded
    pub display_decimals: u32,
    /// Fixed as-of date; defaults to the latest date across all baskets
    pub as_of: Option<NaiveDate>,
    pub data: DataPaths,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_value: Decimal::ONE_HUNDRED,
            periods: Period::ALL.to_vec(),
            epsilon: DEFAULT_EPSILON,
            display_decimals: 4,
            as_of: None,
            data: DataPaths::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).context("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        info!("Loading configuration from {:?}", path);
        let text = std::fs::read_to_string(path)
            .map_err(EngineError::from)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        Self::from_toml_str(&text).with_context(|| format!("Invalid config file {:?}", path))
    }

    /// Load from `path`, or from the default location, or fall back to defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(p) = path {
            return Self::from_file(p);
        }
        match default_config_path() {
            Some(p) if p.exists() => Self::from_file(&p),
            _ => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_value <= Decimal::ZERO {
            return Err(EngineError::InvalidConfig(format!(
                "base_value must be positive, got {}",
                self.base_value
            ))
            .into());
        }
        if self.epsilon < Decimal::ZERO {
            return Err(EngineError::InvalidConfig(format!(
                "epsilon must not be negative, got {}",
                self.epsilon
            ))
            .into());
        }
        if self.periods.is_empty() {
            return Err(EngineError::InvalidConfig("at least one period is required".to_string()).into());
        }
        Ok(())
    }
}

/// `<config home>/basketperf/config.toml`, if a config home can be determined
pub fn default_config_path() -> Option<PathBuf> {
    dir_spec::config_home().map(|dir| dir.join("basketperf").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.base_value, dec!(100));
        assert_eq!(config.periods, Period::ALL.to_vec());
        assert_eq!(config.epsilon, dec!(0.0000000001));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            base_value = 1000
            periods = ["YTD", "3m"]
            as_of = "2024-06-28"

            [data]
            baskets = "baskets.csv"
            "#,
        )
        .unwrap();
        assert_eq!(config.base_value, dec!(1000));
        assert_eq!(config.periods, vec![Period::Ytd, Period::ThreeMonths]);
        assert_eq!(config.as_of, NaiveDate::from_ymd_opt(2024, 6, 28));
        assert_eq!(config.display_decimals, 4);
        assert_eq!(config.data.baskets, Some(PathBuf::from("baskets.csv")));
        assert_eq!(config.data.mapping, None);
    }

    #[test]
    fn test_unknown_period_label_is_fatal() {
        let err = EngineConfig::from_toml_str(r#"periods = ["YTD", "2w"]"#).unwrap_err();
        assert!(format!("{:#}", err).contains("2w"));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(EngineConfig::from_toml_str("base_value = 0").is_err());
        assert!(EngineConfig::from_toml_str(r#"epsilon = "-0.1""#).is_err());
        assert!(EngineConfig::from_toml_str("periods = []").is_err());
    }

    #[test]
    fn test_load_from_explicit_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "display_decimals = 2").unwrap();
        let config = EngineConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.display_decimals, 2);

        assert!(EngineConfig::load(Some(Path::new("/nonexistent/basketperf.toml"))).is_err());
    }
}
