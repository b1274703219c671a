//! Run-level configuration
//!
//! A handful of switches that change how every cohort in a run behaves. They are read
//! from TOML; missing keys fall back to their defaults and unknown keys are reported
//! with a warning rather than rejected.

use crate::errors::{check_range, RSFCResult};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Number of vertical sublayers each cohort canopy is divided into
    /// default: 5
    pub sublayer_count: usize,

    /// Apply the full H1-H4 water response during spin-up.
    /// When false only the dry side (H3/H4) limits photosynthesis before the
    /// simulation proper starts.
    /// default: false
    pub spinup_water_stress: bool,

    /// Whether cohorts may die in the annual step
    /// default: true
    pub allow_mortality: bool,

    /// Treat every cohort as filling its canopy layer, regardless of its leaf area
    /// default: false
    pub cohort_stacking: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            sublayer_count: 5,
            spinup_water_stress: false,
            allow_mortality: true,
            cohort_stacking: false,
        }
    }
}

impl ModelConfig {
    const KEYS: [&'static str; 4] = [
        "sublayer_count",
        "spinup_water_stress",
        "allow_mortality",
        "cohort_stacking",
    ];

    /// Parse and validate a configuration from a TOML document.
    pub fn from_toml_str(source: &str) -> RSFCResult<Self> {
        let table: toml::Table = toml::from_str(source)?;
        for key in table.keys() {
            if !Self::KEYS.contains(&key.as_str()) {
                warn!(key = %key, "Ignoring unknown configuration key");
            }
        }

        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RSFCResult<()> {
        check_range("sublayer_count", self.sublayer_count as f64, 1.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ModelConfig::default();
        assert_eq!(config.sublayer_count, 5);
        assert!(config.allow_mortality);
        assert!(!config.spinup_water_stress);
        assert!(!config.cohort_stacking);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = ModelConfig::from_toml_str("sublayer_count = 3\ncohort_stacking = true\n")
            .unwrap();
        assert_eq!(config.sublayer_count, 3);
        assert!(config.cohort_stacking);
        assert!(config.allow_mortality);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let config = ModelConfig::from_toml_str("frost_depth = 12.0\n").unwrap();
        assert_eq!(config, ModelConfig::default());
    }

    #[test]
    fn test_zero_sublayers_rejected() {
        let result = ModelConfig::from_toml_str("sublayer_count = 0\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let result = ModelConfig::from_toml_str("sublayer_count = \"five\"\n");
        assert!(result.is_err());
    }
}
