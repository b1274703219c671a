//! Leaf area of canopy sublayers
//!
//! Foliage of a cohort is split evenly over its sublayers. Specific leaf weight falls
//! with the amount of foliage above, so lower sublayers carry more leaf area per gram.
//! The whole cohort is capped at [`MAX_COHORT_LAI`].

use crate::parameters::SpeciesParameters;
use rsfc_core::constants::MAX_COHORT_LAI;
use rsfc_core::types::FloatValue;
use tracing::warn;

/// Leaf area index of one sublayer.
///
/// $$LAI_i = \frac{F/N}{SLW_{max} - SLW_{del} \cdot i/N \cdot F}$$
///
/// limited so that the running cohort total stays at or below 25. If the specific
/// leaf weight term is not positive while there is foliage, the remaining leaf area
/// allowance is shared evenly among this and the deeper sublayers, so the cap still
/// holds.
///
/// # Arguments
///
/// * `species` - Species parameters (specific leaf weight and its decline)
/// * `fol` - Foliage mass of the cohort (g/m2)
/// * `index` - 0-based sublayer index
/// * `sublayers` - Number of sublayers
/// * `cumulative_above` - Leaf area of the sublayers above this one (m2/m2)
pub fn calculate_lai(
    species: &SpeciesParameters,
    fol: FloatValue,
    index: usize,
    sublayers: usize,
    cumulative_above: FloatValue,
) -> FloatValue {
    let n = sublayers as FloatValue;
    let depth = index as FloatValue / n;
    let ceiling = (MAX_COHORT_LAI - cumulative_above).max(0.0);

    let lai = (fol / n) / (species.slw_max - species.slw_del * depth * fol);

    if fol > 0.0 && !(lai > 0.0 && lai.is_finite()) {
        warn!(
            species = %species.name,
            foliage = fol,
            sublayer = index,
            "Non-positive leaf area with positive foliage; check SLWmax and SLWDel"
        );
        return ceiling / sublayers.saturating_sub(index).max(1) as FloatValue;
    }

    lai.max(0.0).min(ceiling)
}

/// Leaf area of every sublayer of a cohort, top to bottom.
pub fn sublayer_lai(
    species: &SpeciesParameters,
    fol: FloatValue,
    sublayers: usize,
) -> Vec<FloatValue> {
    let mut cumulative = 0.0;
    (0..sublayers)
        .map(|index| {
            let lai = calculate_lai(species, fol, index, sublayers, cumulative);
            cumulative += lai;
            lai
        })
        .collect()
}

/// Total leaf area index of a cohort.
pub fn canopy_lai(species: &SpeciesParameters, fol: FloatValue, sublayers: usize) -> FloatValue {
    sublayer_lai(species, fol, sublayers).iter().sum()
}
