//! Site collaborators of a cohort
//!
//! A cohort does not own the dead organic matter of its site. Senescence and
//! disturbance hand dead biomass to a [`SiteCollaborator`], and disturbance-driven
//! mortality is split between dead pools and removal by a [`DeadPoolAllocation`].
//!
//! [`SitePools`] and [`DisturbanceAllocation`] are the implementations used by the
//! standalone engine and its tests; a host framework implements the traits on its own
//! site types.

use crate::cohort::Cohort;
use crate::events::{DeathEvent, PartialDeathEvent};
use crate::parameters::SpeciesParameters;
use rsfc_core::errors::{check_range, RSFCResult};
use rsfc_core::types::FloatValue;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Name of a disturbance agent (fire, wind, harvest, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisturbanceType(String);

impl DisturbanceType {
    pub fn new(name: &str) -> Self {
        Self(name.to_string())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DisturbanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Callbacks a cohort makes into its site.
pub trait SiteCollaborator {
    /// Receive foliage litter (g/m2) from a species.
    fn add_litter(&mut self, mass: FloatValue, species: &SpeciesParameters);

    /// Receive woody debris (g/m2) decomposing at `decay_rate` (1/yr).
    fn add_woody_debris(&mut self, mass: FloatValue, decay_rate: FloatValue);

    /// Remove a fraction of the litter pool.
    fn reduce_litter(&mut self, fraction: FloatValue);

    /// Remove a fraction of the woody debris pool.
    fn reduce_woody_debris(&mut self, fraction: FloatValue);

    /// Record that dead pools have been reduced for `disturbance` in this timestep.
    ///
    /// Returns `true` the first time a disturbance type is recorded.
    fn mark_dead_pools_reduced(&mut self, disturbance: &DisturbanceType) -> bool;

    /// Aboveground biomass of all cohorts on the site (g/m2)
    fn aboveground_biomass(&self) -> FloatValue;

    fn cohort_died(&mut self, _event: &DeathEvent) {}

    fn cohort_partially_died(&mut self, _event: &PartialDeathEvent) {}
}

/// Redistribution of biomass killed by a disturbance.
pub trait DeadPoolAllocation {
    /// Consume existing dead pools, once per disturbance type and timestep.
    fn reduce_dead_pools(&mut self, site: &mut dyn SiteCollaborator, disturbance: &DisturbanceType);

    /// Route the biomass `fraction` of `cohort` killed by `disturbance`.
    ///
    /// Called before the cohort's live pools are reduced.
    fn allocate(
        &mut self,
        site: &mut dyn SiteCollaborator,
        cohort: &Cohort,
        disturbance: &DisturbanceType,
        fraction: FloatValue,
    );
}

/// Proportion of foliage removed by defoliating agents.
pub trait DefoliationModel {
    /// Defoliation proportion of `cohort` in [0, 1].
    fn defoliation(&self, cohort: &Cohort, site_aboveground_biomass: FloatValue) -> FloatValue;
}

/// The same defoliation proportion for every cohort.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstantDefoliation(pub FloatValue);

impl DefoliationModel for ConstantDefoliation {
    fn defoliation(&self, _cohort: &Cohort, _site_aboveground_biomass: FloatValue) -> FloatValue {
        self.0
    }
}

/// A dead organic matter pool with a mass-weighted property.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DeadPool {
    /// unit: g/m2
    pub mass: FloatValue,
    /// Mass-weighted decay rate (woody debris) or lignin fraction (litter)
    pub quality: FloatValue,
}

impl DeadPool {
    pub fn add(&mut self, mass: FloatValue, quality: FloatValue) {
        if mass <= 0.0 {
            return;
        }
        let total = self.mass + mass;
        self.quality = (self.quality * self.mass + quality * mass) / total;
        self.mass = total;
    }

    pub fn reduce(&mut self, fraction: FloatValue) {
        self.mass *= 1.0 - fraction.clamp(0.0, 1.0);
    }
}

/// Dead pools and event log of one site.
#[derive(Debug, Clone, Default)]
pub struct SitePools {
    pub litter: DeadPool,
    pub woody_debris: DeadPool,
    pub aboveground_biomass: FloatValue,
    pub deaths: Vec<DeathEvent>,
    pub partial_deaths: Vec<PartialDeathEvent>,
    reduced: HashSet<DisturbanceType>,
}

impl SitePools {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget which disturbances have reduced dead pools, at the end of a timestep.
    pub fn clear_disturbance_reductions(&mut self) {
        self.reduced.clear();
    }
}

impl SiteCollaborator for SitePools {
    fn add_litter(&mut self, mass: FloatValue, species: &SpeciesParameters) {
        self.litter.add(mass, species.fol_lignin);
    }

    fn add_woody_debris(&mut self, mass: FloatValue, decay_rate: FloatValue) {
        self.woody_debris.add(mass, decay_rate);
    }

    fn reduce_litter(&mut self, fraction: FloatValue) {
        self.litter.reduce(fraction);
    }

    fn reduce_woody_debris(&mut self, fraction: FloatValue) {
        self.woody_debris.reduce(fraction);
    }

    fn mark_dead_pools_reduced(&mut self, disturbance: &DisturbanceType) -> bool {
        self.reduced.insert(disturbance.clone())
    }

    fn aboveground_biomass(&self) -> FloatValue {
        self.aboveground_biomass
    }

    fn cohort_died(&mut self, event: &DeathEvent) {
        self.deaths.push(event.clone());
    }

    fn cohort_partially_died(&mut self, event: &PartialDeathEvent) {
        self.partial_deaths.push(event.clone());
    }
}

/// How one disturbance type treats dead pools and killed biomass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolFractions {
    /// Fraction of existing litter consumed
    /// default: 0.0
    pub litter_reduction: FloatValue,

    /// Fraction of existing woody debris consumed
    /// default: 0.0
    pub woody_debris_reduction: FloatValue,

    /// Fraction of killed foliage left on site as litter
    /// default: 1.0
    pub foliage_to_litter: FloatValue,

    /// Fraction of killed wood and roots left on site as woody debris
    /// default: 1.0
    pub wood_to_debris: FloatValue,
}

impl Default for PoolFractions {
    fn default() -> Self {
        Self {
            litter_reduction: 0.0,
            woody_debris_reduction: 0.0,
            foliage_to_litter: 1.0,
            wood_to_debris: 1.0,
        }
    }
}

impl PoolFractions {
    pub fn validate(&self) -> RSFCResult<()> {
        check_range("litter_reduction", self.litter_reduction, 0.0, 1.0)?;
        check_range("woody_debris_reduction", self.woody_debris_reduction, 0.0, 1.0)?;
        check_range("foliage_to_litter", self.foliage_to_litter, 0.0, 1.0)?;
        check_range("wood_to_debris", self.wood_to_debris, 0.0, 1.0)
    }
}

/// Per-disturbance pool fractions, falling back to [`PoolFractions::default`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisturbanceAllocation {
    fractions: HashMap<DisturbanceType, PoolFractions>,
}

impl DisturbanceAllocation {
    pub fn with_fractions(
        mut self,
        disturbance: DisturbanceType,
        fractions: PoolFractions,
    ) -> RSFCResult<Self> {
        fractions.validate()?;
        self.fractions.insert(disturbance, fractions);
        Ok(self)
    }

    pub fn fractions(&self, disturbance: &DisturbanceType) -> PoolFractions {
        self.fractions.get(disturbance).copied().unwrap_or_default()
    }
}

impl DeadPoolAllocation for DisturbanceAllocation {
    fn reduce_dead_pools(&mut self, site: &mut dyn SiteCollaborator, disturbance: &DisturbanceType) {
        let fractions = self.fractions(disturbance);
        site.reduce_litter(fractions.litter_reduction);
        site.reduce_woody_debris(fractions.woody_debris_reduction);
    }

    fn allocate(
        &mut self,
        site: &mut dyn SiteCollaborator,
        cohort: &Cohort,
        disturbance: &DisturbanceType,
        fraction: FloatValue,
    ) {
        let fractions = self.fractions(disturbance);
        let prop = cohort.canopy_layer_prop();
        let species = cohort.species();

        site.add_litter(cohort.fol() * fraction * fractions.foliage_to_litter * prop, species);
        site.add_woody_debris(
            cohort.total_biomass() * fraction * fractions.wood_to_debris * prop,
            species.k_wd_lit,
        );
    }
}
