//! Host-driven changes to a cohort
//!
//! Ageing, biomass changes, merging, disturbance and defoliation. These are called by
//! the host between monthly steps. Pools are clamped at zero and the maximum biomass
//! never decreases.

use super::Cohort;
use crate::events::{DeathCause, DeathEvent, PartialDeathEvent};
use crate::parameters::Lifeform;
use crate::site::{DeadPoolAllocation, DefoliationModel, DisturbanceType, SiteCollaborator};
use rsfc_core::types::FloatValue;
use tracing::debug;

impl Cohort {
    /// Age the cohort by one year.
    ///
    /// The annual step already does this in the final month; do not call both.
    pub fn increment_age(&mut self) {
        self.data.age = self.data.age.saturating_add(1);
    }

    /// Add `delta` (gDW/m2) to structural biomass.
    pub fn change_biomass(&mut self, delta: FloatValue) {
        self.data.total_biomass = (self.data.total_biomass + delta).max(0.0);
        self.update_ag_biomass();
        self.ratchet_biomass_max();
    }

    pub fn change_anpp(&mut self, delta: FloatValue) {
        self.data.anpp += delta;
    }

    /// Merge another cohort of the same species into this one.
    ///
    /// Biomass, foliage and production are summed. The maximum biomass is the larger of
    /// this cohort's maximum and the merged total, not the sum of maxima.
    pub fn accumulate(&mut self, other: &Cohort) {
        self.data.total_biomass += other.data.total_biomass;
        self.ratchet_biomass_max();
        self.data.fol += other.data.fol;
        self.data.max_fol_year = self.data.max_fol_year.max(self.data.fol);
        self.update_ag_biomass();
        self.data.anpp += other.data.anpp;
    }

    /// Remove `fraction` of the cohort for a disturbance.
    ///
    /// The first time a disturbance type reduces this site in a timestep, the dead
    /// pools are reduced by `allocator`. The killed biomass is then routed by
    /// `allocator` before live pools shrink. A fraction of 1 or more kills the cohort.
    pub fn reduce_biomass(
        &mut self,
        site: &mut dyn SiteCollaborator,
        allocator: &mut dyn DeadPoolAllocation,
        fraction: FloatValue,
        disturbance: &DisturbanceType,
    ) {
        let fraction = fraction.clamp(0.0, 1.0);
        if site.mark_dead_pools_reduced(disturbance) {
            allocator.reduce_dead_pools(site, disturbance);
        }
        allocator.allocate(site, self, disturbance, fraction);

        let removed = (self.data.total_biomass + self.data.fol) * fraction;
        let ag_before = self.data.ag_biomass;

        self.data.total_biomass *= 1.0 - fraction;
        self.data.fol *= 1.0 - fraction;
        self.update_ag_biomass();
        self.ratchet_biomass_max();
        self.data.max_fol_year = self.data.max_fol_year.max(self.data.fol);

        debug!(
            species = %self.species.name,
            age = self.data.age,
            disturbance = %disturbance,
            fraction,
            "Biomass reduced"
        );

        if fraction >= 1.0 {
            site.cohort_died(&DeathEvent {
                species: self.species.name.clone(),
                age: self.data.age,
                cause: DeathCause::Disturbance,
                disturbance: Some(disturbance.clone()),
                ag_biomass: ag_before,
            });
        } else if fraction > 0.0 {
            site.cohort_partially_died(&PartialDeathEvent {
                species: self.species.name.clone(),
                age: self.data.age,
                disturbance: disturbance.clone(),
                fraction,
                biomass_removed: removed,
            });
        }
    }

    pub fn reduce_foliage(&mut self, fraction: FloatValue) {
        self.data.fol *= 1.0 - fraction.clamp(0.0, 1.0);
        self.data.max_fol_year = self.data.max_fol_year.max(self.data.fol);
    }

    /// Start a new year of foliage maxima.
    pub fn reset_foliage_max(&mut self) {
        self.data.max_fol_year = 0.0;
    }

    /// Look up this year's defoliation proportion, clamped to [0, 1].
    ///
    /// The model sees the site's summed aboveground biomass.
    pub fn calculate_defoliation(&mut self, model: &dyn DefoliationModel, site: &dyn SiteCollaborator) {
        let proportion = model.defoliation(self, site.aboveground_biomass());
        self.data.defol_prop = if proportion.is_nan() {
            0.0
        } else {
            proportion.clamp(0.0, 1.0)
        };
    }

    pub fn accumulate_woody_senescence(&mut self, senescence: FloatValue) {
        self.data.last_woody_senescence += senescence;
    }

    pub fn accumulate_foliage_senescence(&mut self, senescence: FloatValue) {
        self.data.last_foliage_senescence += senescence;
    }

    /// Canopy albedo without snow, from growth form and leaf area.
    pub fn albedo(&self) -> FloatValue {
        let lai = self.sum_lai();
        let albedo = match self.species.lifeform {
            Some(Lifeform::Ground | Lifeform::Open) => 0.20,
            Some(_) if lai == 0.0 => 0.20,
            Some(Lifeform::DarkConifer) => -0.067 * lai.max(0.7).ln() + 0.2095,
            Some(Lifeform::LightConifer) => -0.054 * lai.max(0.7).ln() + 0.2082,
            Some(Lifeform::Deciduous) => -0.0073 * lai + 0.231,
            Some(Lifeform::Other) | None => 0.0,
        };
        albedo.max(0.0)
    }

    /// Foliage biomass (gDW/m2)
    pub fn non_woody_biomass(&self) -> FloatValue {
        self.data.fol
    }

    /// Foliage share of aboveground wood plus foliage, zero without biomass.
    pub fn non_woody_percentage(&self) -> FloatValue {
        let total = self.wood() + self.data.fol;
        if total <= 0.0 {
            return 0.0;
        }
        self.data.fol / total
    }
}
