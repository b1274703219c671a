//! Physical constants and unit conversions used by the cohort engines

use crate::types::FloatValue;

/// Molecular weight of carbon (g/mol)
pub const MC: FloatValue = 12.0;

pub const BILLION: FloatValue = 1.0e9;
pub const MILLION: FloatValue = 1.0e6;

pub const SECONDS_PER_HOUR: FloatValue = 3600.0;
pub const SECONDS_PER_DAY: FloatValue = 24.0 * SECONDS_PER_HOUR;

/// Upper bound on the leaf area index of a single cohort (m2/m2)
pub const MAX_COHORT_LAI: FloatValue = 25.0;

/// NSC fraction of active biomass carbon at or below which a cohort is dead
pub const ALIVE_NSC_FRACTION: FloatValue = 0.01;

/// Foliage additions (gDW/m2) at or below this are not applied
pub const MIN_FOLIAGE_ALLOCATION: FloatValue = 0.01;

/// kPa per metre of water column
pub const KPA_PER_METER_H2O: FloatValue = 9.804139432;

/// Reference atmospheric CO2 for the assimilation delta (ppm)
pub const CO2_REFERENCE: FloatValue = 350.0;

/// CO2 compensation point (ppm)
pub const CO2_COMPENSATION_POINT: FloatValue = 40.0;

/// Converts gross photosynthesis over water-use efficiency into mm of transpiration
pub const TRANSPIRATION_CONVERSION: FloatValue = 0.0015;

/// Converts the CO2 flux term into mol/m2/s
pub const JCO2_UNIT_CONVERSION: FloatValue = 1.0e-6;

/// Universal gas constant (J/kmol/K)
pub const GAS_CONSTANT: FloatValue = 8314.47;

/// Standard atmospheric pressure (kPa)
pub const ATMOSPHERIC_PRESSURE: FloatValue = 101.3;

pub const KELVIN_OFFSET: FloatValue = 273.0;

/// Floor applied to the stomatal Ci modifier
pub const MIN_CI_MODIFIER: FloatValue = 1.0e-5;

/// Length of the seasonal light-response history
pub const MONTHS_PER_YEAR: usize = 12;

/// Molecular weight of CO2 (g/mol)
pub const CO2_MOLAR_MASS: FloatValue = 44.0;

/// Molecular weight of water (g/mol)
pub const H2O_MOLAR_MASS: FloatValue = 18.0;
