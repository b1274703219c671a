//! Ecoregion Parameters
//!
//! Soil and site properties shared by every site in an ecoregion. Values are
//! validated against the bounds the parameter files allow.

use crate::errors::{check_range, RSFCError, RSFCResult};
use crate::types::FloatValue;
use serde::{Deserialize, Serialize};

/// Soil and site parameters of one ecoregion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcoregionParameters {
    pub name: String,

    /// Soil texture class, used to look up the water retention curve
    /// default: "SILO" (silt loam)
    pub soil_type: String,

    /// Volumetric water content at field capacity
    /// unit: m3/m3
    /// default: 0.32
    pub field_cap: FloatValue,

    /// Volumetric water content at the wilting point
    /// unit: m3/m3
    /// default: 0.12
    pub wilt_pnt: FloatValue,

    /// Volumetric water content at saturation
    /// unit: m3/m3
    /// default: 0.45
    pub porosity: FloatValue,

    /// Depth of the rooted soil profile
    /// unit: mm
    /// default: 1000.0
    pub rooting_depth: FloatValue,

    /// Fraction of water above field capacity that drains each precipitation event
    /// unit: dimensionless
    /// default: 1.0
    pub leakage_frac: FloatValue,

    /// Depth of runoff that can be held in surface storage
    /// unit: mm
    /// default: 0.0
    pub runoff_capture: FloatValue,

    /// Fraction of precipitation intercepted by the canopy
    /// unit: dimensionless
    /// default: 0.1
    pub prec_int_const: FloatValue,

    /// Fraction of precipitation lost before reaching the canopy
    /// unit: dimensionless
    /// default: 0.0
    pub prec_loss_frac: FloatValue,

    /// Fraction of the snowpack lost to sublimation
    /// unit: dimensionless
    /// default: 0.15
    pub snow_sublim_frac: FloatValue,

    /// unit: degrees north
    /// default: 45.0
    pub latitude: FloatValue,

    /// Number of precipitation events per month
    /// default: 11
    pub precip_events: u32,

    /// Frost depth below which leakage is blocked
    /// unit: mm
    /// default: 5000.0
    pub leakage_frost_depth: FloatValue,

    /// Standard deviation of winter temperature, used for the cold-kill threshold
    /// unit: degC
    /// default: 0.0
    pub winter_std: FloatValue,

    /// unit: mm
    /// default: 0.0
    pub moss_depth: FloatValue,

    /// Depth of the evaporating surface layer
    /// unit: mm
    /// default: 150.0
    pub evap_depth: FloatValue,

    /// Scaling of frost penetration into the soil
    /// default: 10.0
    pub frost_factor: FloatValue,
}

impl Default for EcoregionParameters {
    fn default() -> Self {
        Self {
            name: "eco1".to_string(),
            soil_type: "SILO".to_string(),
            field_cap: 0.32,
            wilt_pnt: 0.12,
            porosity: 0.45,
            rooting_depth: 1000.0,
            leakage_frac: 1.0,
            runoff_capture: 0.0,
            prec_int_const: 0.1,
            prec_loss_frac: 0.0,
            snow_sublim_frac: 0.15,
            latitude: 45.0,
            precip_events: 11,
            leakage_frost_depth: 5000.0,
            winter_std: 0.0,
            moss_depth: 0.0,
            evap_depth: 150.0,
            frost_factor: 10.0,
        }
    }
}

impl EcoregionParameters {
    pub fn from_toml_str(source: &str) -> RSFCResult<Self> {
        let parameters: Self = toml::from_str(source)?;
        parameters.validate()?;
        Ok(parameters)
    }

    /// Check every parameter against its allowed range.
    pub fn validate(&self) -> RSFCResult<()> {
        check_range("RootingDepth", self.rooting_depth, 0.0, 1000.0)?;
        check_range("PrecIntConst", self.prec_int_const, 0.0, 1.0)?;
        check_range("PrecLossFrac", self.prec_loss_frac, 0.0, 1.0)?;
        check_range("SnowSublimFrac", self.snow_sublim_frac, 0.0, 1.0)?;
        check_range("Latitude", self.latitude, 0.0, 90.0)?;
        check_range("LeakageFrostDepth", self.leakage_frost_depth, 0.0, 999999.0)?;
        check_range("PrecipEvents", self.precip_events as f64, 1.0, 100.0)?;
        check_range("WinterSTD", self.winter_std, 0.0, 100.0)?;
        check_range("MossDepth", self.moss_depth, 0.0, 1000.0)?;
        check_range("EvapDepth", self.evap_depth, 0.0, 9999999.0)?;
        check_range("LeakageFrac", self.leakage_frac, 0.0, 1.0)?;
        check_range("RunoffCapture", self.runoff_capture, 0.0, 999999.0)?;
        check_range("FrostFactor", self.frost_factor, 0.0, 999999.0)?;
        check_range("Porosity", self.porosity, 0.0, 1.0)?;
        check_range("FieldCap", self.field_cap, 0.0, self.porosity)?;
        check_range("WiltPnt", self.wilt_pnt, 0.0, self.field_cap)?;
        if self.soil_type.is_empty() {
            return Err(RSFCError::Error(format!(
                "Ecoregion '{}' has no soil type",
                self.name
            )));
        }
        Ok(())
    }

    /// Water content between the wilting point and field capacity
    /// unit: mm
    pub fn available_water_capacity(&self) -> FloatValue {
        (self.field_cap - self.wilt_pnt) * self.rooting_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parameters() {
        let params = EcoregionParameters::default();
        assert!(params.validate().is_ok());
        assert!(params.wilt_pnt < params.field_cap);
        assert!(params.field_cap < params.porosity);
    }

    #[test]
    fn test_available_water_capacity() {
        let params = EcoregionParameters::default();
        assert!((params.available_water_capacity() - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_rooting_depth_bounds() {
        let params = EcoregionParameters {
            rooting_depth: 1500.0,
            ..Default::default()
        };
        match params.validate() {
            Err(RSFCError::ParameterOutOfRange { name, .. }) => assert_eq!(name, "RootingDepth"),
            other => panic!("Expected a range error, got {:?}", other),
        }
    }

    #[test]
    fn test_field_capacity_above_porosity_rejected() {
        let params = EcoregionParameters {
            field_cap: 0.5,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_from_toml() {
        let params = EcoregionParameters::from_toml_str(
            r#"
            name = "sandy"
            soil_type = "SAND"
            field_cap = 0.12
            wilt_pnt = 0.05
            porosity = 0.40
            rooting_depth = 600.0
            precip_events = 4
            "#,
        )
        .unwrap();
        assert_eq!(params.soil_type, "SAND");
        assert_eq!(params.precip_events, 4);
        assert!((params.runoff_capture - 0.0).abs() < 1e-12);
    }
}
