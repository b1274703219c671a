//! Pure physiological response functions
//!
//! - `stress`: light, water, ozone, CO2 and age responses
//! - `leaf_area`: leaf area index of canopy sublayers

pub mod leaf_area;
pub mod stress;

pub use leaf_area::{calculate_lai, canopy_lai, sublayer_lai};
pub use stress::{
    adjusted_half_sat, age_factor, co2_assimilation_delta, compute_frad, compute_fwater,
    compute_ozone_effect, stomatal_modifier, NO_THRESHOLD,
};
