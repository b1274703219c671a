//! Stress response functions
//!
//! Dimensionless reduction factors applied to potential photosynthesis. All functions
//! are pure.
//!
//! - [`compute_frad`]: light response of a canopy sublayer
//! - [`compute_fwater`]: water response against four pressure-head thresholds
//! - [`compute_ozone_effect`]: cumulative stomatal damage from ozone uptake
//! - [`stomatal_modifier`]: reduction of internal CO2 under cumulative ozone
//! - [`age_factor`]: decline of photosynthetic capacity with age

use crate::parameters::OzoneSensitivity;
use rsfc_core::constants::{CO2_COMPENSATION_POINT, CO2_REFERENCE, MIN_CI_MODIFIER};
use rsfc_core::errors::{RSFCError, RSFCResult};
use rsfc_core::types::FloatValue;

/// Sentinel for `h1` and `h2` of [`compute_fwater`] that removes the low pressure-head
/// (H1/H2) ramp, leaving full response down to zero head
pub const NO_THRESHOLD: FloatValue = -1.0;

/// Light response factor.
///
/// $$f_{rad} = 1 - e^{-R \ln 2 / R_{1/2}}$$
///
/// # Arguments
///
/// * `radiation` - PAR reaching the sublayer (umol/m2/s)
/// * `half_sat` - Light level giving half of the maximum response (umol/m2/s)
pub fn compute_frad(radiation: FloatValue, half_sat: FloatValue) -> RSFCResult<FloatValue> {
    if half_sat <= 0.0 {
        return Err(RSFCError::InvalidHalfSat(half_sat));
    }
    Ok(1.0 - (-radiation * std::f64::consts::LN_2 / half_sat).exp())
}

/// Water response factor.
///
/// Piecewise linear in the soil pressure head (m):
///
/// ```text
///  1 |        ________
///    |       /        \
///    |      /          \
///  0 |_____/            \_____
///        H1  H2      H3  H4
/// ```
///
/// Pressure heads at or below `h1` are too wet, and at or above `h4` too dry, for any
/// uptake. Passing [`NO_THRESHOLD`] for `h1` and `h2` removes the H1/H2 ramp, so any
/// non-negative head up to `h3` gives 1 and only the H3/H4 decline remains. If
/// `h2 <= h1` the low-head cut-off is `h2`.
pub fn compute_fwater(
    h1: FloatValue,
    h2: FloatValue,
    h3: FloatValue,
    h4: FloatValue,
    pressure_head: FloatValue,
) -> FloatValue {
    let min_threshold = if h2 <= h1 { h2 } else { h1 };

    if pressure_head <= h1 || pressure_head < min_threshold || pressure_head >= h4 {
        return 0.0;
    }
    if pressure_head > h3 {
        return 1.0 - (pressure_head - h3) / (h4 - h3);
    }
    if pressure_head < h2 {
        return (pressure_head - h1) / (h2 - h1);
    }
    1.0
}

/// Cumulative ozone effect on net photosynthesis.
///
/// Damage builds on the previous value with an increment proportional to stomatal
/// conductance and ozone dose, attenuated with relative depth in the canopy. The
/// result never decreases below `last_effect` and never exceeds 1.
///
/// # Arguments
///
/// * `o3` - Ozone dose of the month (ppm h)
/// * `last_effect` - Effect carried from the previous sublayer or month
/// * `conductance` - Stomatal conductance to water vapour (mm/s)
/// * `fol_mass` - Foliage mass of the cohort (g/m2)
/// * `layer` - 1-based sublayer position within the site canopy
/// * `n_layers` - Number of sublayers in the site canopy
/// * `species_coeff` - Species scaling of the increment
pub fn compute_ozone_effect(
    o3: FloatValue,
    last_effect: FloatValue,
    conductance: FloatValue,
    fol_mass: FloatValue,
    layer: usize,
    n_layers: usize,
    species_coeff: FloatValue,
) -> FloatValue {
    let k_o3_eff = 0.0026 * species_coeff;
    let o3_profile = 0.6163 + 0.00105 * fol_mass;
    let relative_layer = if n_layers > 0 {
        layer as FloatValue / n_layers as FloatValue
    } else {
        0.0
    };
    let relative_o3 = (1.0 - (relative_layer * o3_profile).powi(3)).min(1.0);

    let increment = (k_o3_eff * conductance * o3 * relative_o3).max(0.0);
    (last_effect + increment).min(1.0)
}

/// Modifier on internal CO2 from cumulative ozone exposure.
///
/// Linear regressions on the ozone-only water response and the cumulative dose
/// (ppm h), one per stomatal class. Equal to 1 without ozone.
pub fn stomatal_modifier(
    sensitivity: Option<OzoneSensitivity>,
    species: &str,
    fwater_ozone: FloatValue,
    o3_cum: FloatValue,
) -> RSFCResult<FloatValue> {
    if o3_cum <= 0.0 {
        return Ok(1.0);
    }

    let (slope, intercept) = match sensitivity {
        Some(OzoneSensitivity::Tolerant) => (-0.021, 0.0087),
        Some(OzoneSensitivity::Intermediate) => (-0.0148, 0.0062),
        Some(OzoneSensitivity::Sensitive) => (-0.0176, 0.0118),
        None => {
            return Err(RSFCError::UnknownOzoneSensitivity {
                species: species.to_string(),
            })
        }
    };

    let modifier = (fwater_ozone + (slope * fwater_ozone + intercept) * o3_cum).min(1.0);
    if modifier <= 0.0 {
        return Ok(MIN_CI_MODIFIER);
    }
    Ok(modifier)
}

/// Relative change of assimilation with elevated internal CO2.
///
/// Compensation-point model with the reference taken at 350 ppm; never negative.
pub fn co2_assimilation_delta(ci_elev: FloatValue) -> FloatValue {
    let gamma = CO2_COMPENSATION_POINT;
    let ca0 = CO2_REFERENCE;
    let delta = (ci_elev - gamma) / (ci_elev + 2.0 * gamma) * (ca0 + 2.0 * gamma) / (ca0 - gamma);
    delta.max(0.0)
}

/// Half saturation light level adjusted for atmospheric CO2.
pub fn adjusted_half_sat(
    half_sat: FloatValue,
    co2_half_sat_eff: FloatValue,
    co2: FloatValue,
) -> FloatValue {
    co2_half_sat_eff * co2 + (half_sat - CO2_REFERENCE * co2_half_sat_eff)
}

/// Decline of photosynthesis with age.
///
/// $$f_{age} = \max(0, 1 - (a/L)^p)$$
pub fn age_factor(age: FloatValue, longevity: FloatValue, exponent: FloatValue) -> FloatValue {
    (1.0 - (age / longevity).powf(exponent)).max(0.0)
}
