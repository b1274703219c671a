//! Cohort Physiology
//!
//! A cohort is the trees of one species established in the same year at one site. This
//! module tracks its carbon, foliage and water use month by month.
//!
//! # What This Component Does
//!
//! 1. Routes snowmelt and precipitation through the site's soil water ledger
//! 2. Charges maintenance respiration against non-structural carbon (NSC)
//! 3. Runs the phenology state machine once a month: leaf flush, foliage allocation,
//!    defoliation, refoliation, leaf-off and cold kill
//! 4. Computes gross and net photosynthesis and transpiration for each canopy
//!    sublayer, limited by light, water, temperature, age, CO2 and ozone
//! 5. In December, senesces wood and roots, converts surplus NSC into structural
//!    biomass, checks mortality and ages the cohort by a year
//!
//! # Inputs (per month)
//!
//! - Climate drivers and species coefficients ([`rsfc_core::climate::MonthlyClimate`])
//! - Ecoregion soil parameters ([`rsfc_core::ecoregion::EcoregionParameters`])
//! - Precipitation and snowmelt reaching the cohort's canopy layer, PAR above it,
//!   frost-free proportion and ozone dose ([`SublayerInputs`])
//!
//! # State
//!
//! - [`CohortData`]: pools, canopy placement, phenology and sublayer results
//!
//! # Outputs
//!
//! - Per-sublayer fluxes in [`SublayerBuffers`] and the monthly aggregate
//!   [`MonthlySummary`]
//! - Water removed from the shared ledger, litter and woody debris handed to the site
//!
//! # Differences from PnET-Succession
//!
//! - Structural pools are not rounded to whole grams.
//! - The leaf area cap applies to the whole cohort in every constructor, with no
//!   0.01 floor once the cap is reached.
//! - Actual transpiration never exceeds the water response times potential
//!   transpiration, even when soil water is limiting.
//! - Mortality in the annual step always senesces the remaining foliage.

mod data;
#[cfg(test)]
pub(crate) mod fixtures;
mod lifecycle;
mod output;
mod phenology;
mod photosynthesis;

pub use data::{CohortData, SublayerBuffers};
pub use output::{LimitingFactor, MonthlySummary};
pub use phenology::{AllocationWindow, PhaseTransition, PhenologyDriver, SeasonPhase};
pub use photosynthesis::SublayerInputs;

use crate::parameters::SpeciesParameters;
use crate::physiology::{age_factor, canopy_lai};
use rsfc_core::config::ModelConfig;
use rsfc_core::constants::ALIVE_NSC_FRACTION;
use rsfc_core::errors::{check_range, RSFCResult};
use rsfc_core::types::FloatValue;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Starting point of a cohort in an initial community.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitialCohort {
    /// unit: years
    pub age: u16,
    /// Aboveground wood biomass
    /// unit: gDW/m2
    pub wood_biomass: FloatValue,
    /// Largest total biomass the cohort has reached, if known
    /// unit: gDW/m2
    pub max_biomass: Option<FloatValue>,
    /// Mean light response of the previous growing season, if known
    pub last_season_frad: Option<FloatValue>,
}

/// One cohort and its physiological state.
#[derive(Debug, Clone)]
pub struct Cohort {
    species: Arc<SpeciesParameters>,
    data: CohortData,
    sublayer_count: usize,
    /// Sublayer processed by the next photosynthesis step
    index: usize,
}

impl Cohort {
    /// Establish a new cohort from the species' initial NSC.
    ///
    /// `prop_biomass` scales the initial structural biomass.
    pub fn new(
        species: Arc<SpeciesParameters>,
        config: &ModelConfig,
        prop_biomass: FloatValue,
    ) -> Self {
        let nsc = species.initial_nsc;
        let total_biomass = (nsc / (species.dnsc * species.c_frac_biomass) * prop_biomass).max(1.0);

        let mut cohort = Self {
            data: CohortData {
                age: 1,
                nsc,
                total_biomass,
                biomass_max: total_biomass,
                adj_frac_fol: species.frac_fol,
                first_year: true,
                ..Default::default()
            },
            species,
            sublayer_count: config.sublayer_count,
            index: 0,
        };

        let ideal_fol = cohort.data.adj_frac_fol * cohort.factive_biom() * total_biomass;
        cohort.place_in_canopy(ideal_fol, config);
        cohort.data.last_ag_bio = cohort.data.ag_biomass;
        cohort.data.anpp = cohort.site_biomass();
        cohort
    }

    /// Build a cohort of an initial community from its aboveground wood.
    pub fn from_initial_community(
        species: Arc<SpeciesParameters>,
        config: &ModelConfig,
        initial: InitialCohort,
    ) -> Self {
        let total_biomass = initial.wood_biomass / (1.0 - species.frac_below_g);
        let biomass_max = total_biomass.max(initial.max_biomass.unwrap_or(0.0));

        let mut cohort = Self {
            data: CohortData {
                age: initial.age,
                total_biomass,
                biomass_max,
                adj_frac_fol: species.max_frac_fol,
                sublayers: Some(SublayerBuffers::new(config.sublayer_count)),
                ..Default::default()
            },
            species,
            sublayer_count: config.sublayer_count,
            index: 0,
        };

        if let Some(frad) = initial.last_season_frad {
            cohort.set_avg_frad(frad);
            cohort.calc_adj_frac_fol();
        }

        let ideal_fol = cohort.data.adj_frac_fol * cohort.factive_biom() * total_biomass;
        cohort.place_in_canopy(ideal_fol, config);
        cohort.data.last_ag_bio = cohort.data.ag_biomass;

        let active_carbon = cohort.factive_biom()
            * (cohort.data.total_biomass + cohort.data.fol)
            * cohort.species.c_frac_biomass;
        cohort.data.nsc = cohort.species.dnsc * active_carbon;
        cohort
    }

    /// Rebuild a cohort from a stored record.
    pub fn from_data(
        species: Arc<SpeciesParameters>,
        config: &ModelConfig,
        data: CohortData,
    ) -> RSFCResult<Self> {
        check_range("nsc", data.nsc, 0.0, FloatValue::INFINITY)?;
        check_range("total_biomass", data.total_biomass, 0.0, FloatValue::INFINITY)?;
        check_range("fol", data.fol, 0.0, FloatValue::INFINITY)?;
        check_range(
            "biomass_max",
            data.biomass_max,
            data.total_biomass,
            FloatValue::INFINITY,
        )?;
        if let Some(buffers) = &data.sublayers {
            buffers.validate(config.sublayer_count)?;
        }

        Ok(Self {
            species,
            data,
            sublayer_count: config.sublayer_count,
            index: 0,
        })
    }

    /// Copy of this cohort's pools with the cold-kill marker cleared.
    pub fn duplicate(&self) -> Self {
        let data = CohortData {
            age: self.data.age,
            nsc: self.data.nsc,
            total_biomass: self.data.total_biomass,
            biomass_max: self.data.biomass_max,
            fol: self.data.fol,
            max_fol_year: self.data.max_fol_year,
            last_season_frad: self.data.last_season_frad.clone(),
            anpp: self.data.anpp,
            canopy_layer_prop: self.data.canopy_layer_prop,
            ..Default::default()
        };
        let mut cohort = Self {
            species: Arc::clone(&self.species),
            data,
            sublayer_count: self.sublayer_count,
            index: 0,
        };
        cohort.update_ag_biomass();
        cohort
    }

    fn place_in_canopy(&mut self, ideal_fol: FloatValue, config: &ModelConfig) {
        self.data.last_lai = canopy_lai(&self.species, ideal_fol, self.sublayer_count);
        self.data.canopy_layer_prop = if config.cohort_stacking {
            1.0
        } else {
            self.data.last_lai / self.species.max_lai
        };
        self.data.canopy_growing_space = 1.0;
        self.update_ag_biomass();
    }

    // ----- State access -----

    pub fn species(&self) -> &SpeciesParameters {
        &self.species
    }

    pub fn species_handle(&self) -> Arc<SpeciesParameters> {
        Arc::clone(&self.species)
    }

    pub fn data(&self) -> &CohortData {
        &self.data
    }

    pub fn into_data(self) -> CohortData {
        self.data
    }

    pub fn sublayer_count(&self) -> usize {
        self.sublayer_count
    }

    /// Sublayer the next photosynthesis step will process
    pub fn sublayer_index(&self) -> usize {
        self.index
    }

    pub fn sublayers(&self) -> Option<&SublayerBuffers> {
        self.data.sublayers.as_ref()
    }

    pub fn age(&self) -> u16 {
        self.data.age
    }

    pub fn nsc(&self) -> FloatValue {
        self.data.nsc
    }

    pub fn fol(&self) -> FloatValue {
        self.data.fol
    }

    pub fn total_biomass(&self) -> FloatValue {
        self.data.total_biomass
    }

    pub fn ag_biomass(&self) -> FloatValue {
        self.data.ag_biomass
    }

    pub fn biomass_max(&self) -> FloatValue {
        self.data.biomass_max
    }

    pub fn max_fol_year(&self) -> FloatValue {
        self.data.max_fol_year
    }

    pub fn anpp(&self) -> FloatValue {
        self.data.anpp
    }

    pub fn leaf_on(&self) -> bool {
        self.data.leaf_on
    }

    pub fn phase(&self) -> SeasonPhase {
        self.data.phase
    }

    pub fn cold_kill(&self) -> Option<i32> {
        self.data.cold_kill
    }

    pub fn layer(&self) -> u8 {
        self.data.layer
    }

    pub fn canopy_layer_prop(&self) -> FloatValue {
        self.data.canopy_layer_prop
    }

    pub fn canopy_growing_space(&self) -> FloatValue {
        self.data.canopy_growing_space
    }

    pub fn defol_prop(&self) -> FloatValue {
        self.data.defol_prop
    }

    pub fn adj_frac_fol(&self) -> FloatValue {
        self.data.adj_frac_fol
    }

    pub fn last_season_frad(&self) -> &[FloatValue] {
        &self.data.last_season_frad
    }

    pub fn set_layer(&mut self, layer: u8) {
        self.data.layer = layer;
    }

    pub fn set_canopy_layer_prop(&mut self, prop: FloatValue) {
        self.data.canopy_layer_prop = prop.max(0.0);
    }

    pub fn set_canopy_growing_space(&mut self, space: FloatValue) {
        self.data.canopy_growing_space = space.max(0.0);
    }

    pub fn set_biomass_layer_prop(&mut self, prop: FloatValue) {
        self.data.biomass_layer_prop = prop.max(0.0);
    }

    // ----- Derived quantities -----

    /// Metabolically active fraction of biomass, decaying with maximum biomass.
    pub fn factive_biom(&self) -> FloatValue {
        (-self.species.fr_act_wd * self.data.biomass_max).exp()
    }

    /// NSC relative to the carbon in active biomass.
    pub fn nsc_fraction(&self) -> FloatValue {
        let active_carbon = self.factive_biom()
            * (self.data.total_biomass + self.data.fol)
            * self.species.c_frac_biomass;
        if active_carbon <= 0.0 {
            return 0.0;
        }
        self.data.nsc / active_carbon
    }

    pub fn is_alive(&self) -> bool {
        self.nsc_fraction() > ALIVE_NSC_FRACTION
    }

    /// Age reduction of photosynthesis
    pub fn fage(&self) -> FloatValue {
        age_factor(
            self.data.age as FloatValue,
            self.species.longevity,
            self.species.psn_age_red,
        )
    }

    /// Aboveground wood (gDW/m2)
    pub fn wood(&self) -> FloatValue {
        (1.0 - self.species.frac_below_g) * self.data.total_biomass
    }

    /// Roots (gDW/m2)
    pub fn root(&self) -> FloatValue {
        self.species.frac_below_g * self.data.total_biomass
    }

    /// Leaf area index over all sublayers of the current month
    pub fn sum_lai(&self) -> FloatValue {
        self.data
            .sublayers
            .as_ref()
            .map(|b| b.lai.iter().sum())
            .unwrap_or(0.0)
    }

    /// Aboveground biomass scaled by the occupied share of the canopy layer
    pub fn site_biomass(&self) -> FloatValue {
        self.data.ag_biomass * self.data.canopy_layer_prop
    }

    pub(crate) fn update_ag_biomass(&mut self) {
        self.data.ag_biomass =
            (1.0 - self.species.frac_below_g) * self.data.total_biomass + self.data.fol;
    }

    pub(crate) fn ratchet_biomass_max(&mut self) {
        self.data.biomass_max = self.data.biomass_max.max(self.data.total_biomass);
    }
}
