//! Phenology, foliage allocation and the annual carbon budget
//!
//! The growing season is tracked by [`SeasonPhase`]. Once per month, at the first
//! canopy sublayer, the phase is advanced from the month's temperature and frost
//! conditions. The phase then decides which foliage allocation rule applies:
//!
//! | Phase | Growing month | Allocation |
//! |---|---|---|
//! | `Dormant`, `Flush` | before month 2 | close the gap to target foliage |
//! | `DefoliationWindow` | 2 | remove the defoliated proportion |
//! | `RefoliationWindow` | 3 | refoliate above the trigger, else pay a carbon cost |
//! | `LateSeason(m)` | 4 and later | none |
//!
//! In the final month of the year the annual step senesces wood and roots, turns NSC
//! above the reserve concentration into structural biomass and ages the cohort.

use super::data::mean;
use super::{Cohort, SublayerInputs};
use crate::events::{DeathCause, DeathEvent};
use crate::site::SiteCollaborator;
use rsfc_core::climate::MonthlyClimate;
use rsfc_core::constants::{MIN_FOLIAGE_ALLOCATION, MONTHS_PER_YEAR};
use rsfc_core::types::FloatValue;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Position of a cohort in its growing season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SeasonPhase {
    /// Leaf-off, or waiting for the first frost-free month
    #[default]
    Dormant,
    /// First leaf-on month
    Flush,
    /// Second leaf-on month, when defoliation is applied
    DefoliationWindow,
    /// Third leaf-on month, when defoliated cohorts may refoliate
    RefoliationWindow,
    /// Fourth and later leaf-on months
    LateSeason(u16),
}

/// What drives the phenology of a cohort in a month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhenologyDriver {
    /// Temperature fell below the cohort's cold tolerance
    ColdKill,
    /// Minimum temperature at or below the species leaf-on threshold
    BelowLeafOnTemperature,
    /// Warm enough with some frost-free soil
    FrostFree,
    /// Warm enough but the soil is frozen all month
    Frozen,
}

impl PhenologyDriver {
    pub fn from_conditions(
        cold_kill: bool,
        tmin: FloatValue,
        leaf_on_min_t: FloatValue,
        frost_free_prop: FloatValue,
    ) -> Self {
        if cold_kill {
            Self::ColdKill
        } else if tmin <= leaf_on_min_t {
            Self::BelowLeafOnTemperature
        } else if frost_free_prop > 0.0 {
            Self::FrostFree
        } else {
            Self::Frozen
        }
    }
}

/// Outcome of one phenology transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTransition {
    pub phase: SeasonPhase,
    pub leaf_on: bool,
    /// Foliage is dropped to litter this month
    pub senesce_foliage: bool,
}

/// Foliage allocation rule of a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationWindow {
    BeforeDefoliation,
    Defoliation,
    Refoliation,
    None,
}

impl SeasonPhase {
    /// Phase of a given leaf-on month, counted from 1 at flush.
    pub fn from_growing_month(month: u16) -> Self {
        match month {
            0 | 1 => Self::Flush,
            2 => Self::DefoliationWindow,
            3 => Self::RefoliationWindow,
            m => Self::LateSeason(m),
        }
    }

    /// Leaf-on month of the phase, `None` while dormant.
    pub fn growing_month(self) -> Option<u16> {
        match self {
            Self::Dormant => None,
            Self::Flush => Some(1),
            Self::DefoliationWindow => Some(2),
            Self::RefoliationWindow => Some(3),
            Self::LateSeason(m) => Some(m),
        }
    }

    /// Phase of the following leaf-on month.
    pub fn advance(self) -> Self {
        match self.growing_month() {
            None => Self::Flush,
            Some(m) => Self::from_growing_month(m.saturating_add(1)),
        }
    }

    /// Next phase and leaf state for a month with the given driver.
    pub fn transition(self, leaf_on: bool, driver: PhenologyDriver) -> PhaseTransition {
        match driver {
            PhenologyDriver::ColdKill => PhaseTransition {
                phase: self,
                leaf_on: false,
                senesce_foliage: true,
            },
            PhenologyDriver::BelowLeafOnTemperature => PhaseTransition {
                phase: Self::Dormant,
                leaf_on: false,
                senesce_foliage: leaf_on,
            },
            PhenologyDriver::FrostFree => PhaseTransition {
                phase: if leaf_on { self.advance() } else { Self::Flush },
                leaf_on: true,
                senesce_foliage: false,
            },
            PhenologyDriver::Frozen => PhaseTransition {
                phase: self,
                leaf_on,
                senesce_foliage: false,
            },
        }
    }

    pub fn window(self) -> AllocationWindow {
        match self {
            Self::Dormant | Self::Flush => AllocationWindow::BeforeDefoliation,
            Self::DefoliationWindow => AllocationWindow::Defoliation,
            Self::RefoliationWindow => AllocationWindow::Refoliation,
            Self::LateSeason(_) => AllocationWindow::None,
        }
    }
}

impl Cohort {
    /// Monthly phenology and foliage allocation, run at the first sublayer.
    pub(crate) fn phenology_step(
        &mut self,
        inputs: &SublayerInputs<'_>,
        site: &mut dyn SiteCollaborator,
    ) {
        let driver = PhenologyDriver::from_conditions(
            inputs.cold_kill,
            inputs.climate.tmin,
            self.species.leaf_on_min_t,
            inputs.frost_free_prop,
        );

        if driver == PhenologyDriver::ColdKill {
            let marker = (inputs.climate.tave - 3.0 * inputs.ecoregion.winter_std).floor() as i32;
            debug!(
                species = %self.species.name,
                age = self.data.age,
                cold_kill = marker,
                "Foliage killed by cold"
            );
            self.data.cold_kill = Some(marker);
            self.data.nsc = 0.0;
        }

        let transition = self.data.phase.transition(self.data.leaf_on, driver);
        if transition.leaf_on != self.data.leaf_on {
            debug!(
                species = %self.species.name,
                age = self.data.age,
                month = %inputs.climate.month,
                leaf_on = transition.leaf_on,
                "Leaf state changed"
            );
        }
        self.data.phase = transition.phase;
        self.data.leaf_on = transition.leaf_on;

        if transition.senesce_foliage {
            self.drop_foliage(site);
        }

        if self.data.leaf_on {
            self.allocate_foliage(inputs.main_layer_par, inputs.climate.par0);
        }
    }

    /// Allocate NSC to foliage according to the current allocation window.
    ///
    /// Cohorts below the top of the canopy (`main_layer_par < par0`) keep a reserve of
    /// NSC out of reach of allocation.
    pub fn allocate_foliage(&mut self, main_layer_par: FloatValue, par0: FloatValue) {
        let window = self.data.phase.window();
        if window == AllocationWindow::Defoliation {
            self.reduce_foliage(self.data.defol_prop);
            return;
        }

        if self.data.first_year {
            self.data.adj_frac_fol = self.species.max_frac_fol;
        }

        let species = &self.species;
        let c_frac = species.c_frac_biomass;
        let factive = self.factive_biom();
        let fol = self.data.fol;
        let ideal_fol = self.data.adj_frac_fol * factive * self.data.total_biomass;

        let mut nsc_limit = self.data.nsc;
        if main_layer_par < par0 {
            nsc_limit -=
                species.nsc_reserve * factive * (self.data.total_biomass + fol) * c_frac;
        }
        let bounded = |carbon: FloatValue| carbon.min(nsc_limit).max(0.0);

        let (cost, tentative) = match window {
            AllocationWindow::BeforeDefoliation if ideal_fol > fol => {
                let cost = bounded(c_frac * (ideal_fol - fol));
                (cost, cost / c_frac)
            }
            AllocationWindow::Refoliation if self.data.defol_prop > 0.0 => {
                if self.data.defol_prop > species.refoliation_minimum_trigger {
                    let allocation =
                        bounded(c_frac * (species.refoliation_maximum * ideal_fol - fol));
                    let cost = bounded(c_frac * (species.refoliation_cost * ideal_fol - fol));
                    (cost, allocation / c_frac)
                } else {
                    (bounded(c_frac * species.non_refoliation_cost * ideal_fol), 0.0)
                }
            }
            _ => (0.0, 0.0),
        };

        if tentative > MIN_FOLIAGE_ALLOCATION {
            self.data.fol += tentative;
            self.data.max_fol_year = self.data.max_fol_year.max(self.data.fol);
        }
        self.data.nsc = (self.data.nsc - cost).max(0.0);
    }

    /// Year-end mortality check, wood senescence and release of surplus NSC.
    ///
    /// The initiation biomass check is skipped during spin-up.
    pub(crate) fn annual_step(
        &mut self,
        allow_mortality: bool,
        spinup: bool,
        site: &mut dyn SiteCollaborator,
    ) {
        if allow_mortality {
            if let Some(cause) = self.death_cause(spinup) {
                self.data.nsc = 0.0;
                self.data.leaf_on = false;
                self.drop_foliage(site);
                debug!(
                    species = %self.species.name,
                    age = self.data.age,
                    cause = ?cause,
                    "Cohort died"
                );
                site.cohort_died(&DeathEvent {
                    species: self.species.name.clone(),
                    age: self.data.age,
                    cause,
                    disturbance: None,
                    ag_biomass: self.data.ag_biomass,
                });
            }
        }

        let senescence = self.wood_senescence();
        self.data.last_woody_senescence = senescence;
        site.add_woody_debris(
            senescence * self.data.canopy_layer_prop,
            self.species.k_wd_lit,
        );

        let c_frac = self.species.c_frac_biomass;
        let reserve = self.species.dnsc * self.factive_biom() * self.data.total_biomass * c_frac;
        let allocation = (self.data.nsc - reserve).max(0.0);
        self.data.total_biomass += allocation / c_frac;
        self.update_ag_biomass();
        self.ratchet_biomass_max();
        self.data.nsc = (self.data.nsc - allocation).max(0.0);
        self.data.age = self.data.age.saturating_add(1);

        debug!(
            species = %self.species.name,
            age = self.data.age,
            allocation,
            wood_senescence = senescence,
            "Annual allocation"
        );
    }

    fn death_cause(&self, spinup: bool) -> Option<DeathCause> {
        if !self.is_alive() {
            return Some(match self.data.cold_kill {
                Some(_) => DeathCause::ColdKill,
                None => DeathCause::CarbonStarvation,
            });
        }
        // Structural pools were whole grams where this threshold was calibrated
        if !spinup && self.data.total_biomass < self.species.initial_biomass().floor() {
            return Some(DeathCause::BelowInitiationBiomass);
        }
        None
    }

    /// Senesce foliage and hand the litter to the site.
    fn drop_foliage(&mut self, site: &mut dyn SiteCollaborator) {
        let litter = self.foliage_senescence();
        self.data.last_foliage_senescence = litter;
        site.add_litter(litter * self.data.canopy_layer_prop, &self.species);
    }

    /// Remove the yearly turnover of foliage, or all of it if the cohort is not alive.
    ///
    /// Returns the litter mass (gDW/m2).
    pub fn foliage_senescence(&mut self) -> FloatValue {
        let litter = if self.is_alive() {
            self.species.to_fol * self.data.fol
        } else {
            self.data.fol
        };
        self.data.fol = (self.data.fol - litter).max(0.0);
        litter
    }

    /// Remove the yearly turnover of wood and roots.
    ///
    /// Returns the woody debris mass (gDW/m2).
    pub fn wood_senescence(&mut self) -> FloatValue {
        let senescence =
            self.root() * self.species.to_root + self.wood() * self.species.to_wood;
        self.data.total_biomass = (self.data.total_biomass - senescence).max(0.0);
        self.update_ag_biomass();
        self.ratchet_biomass_max();
        senescence
    }

    /// Record the mean light response of a leaf-on month.
    pub fn store_frad(&mut self) {
        if !self.data.leaf_on {
            return;
        }
        let Some(buffers) = &self.data.sublayers else {
            return;
        };
        self.data.last_frad = mean(&buffers.frad);
        self.push_frad(self.data.last_frad);
    }

    /// Add a seasonal mean light response from a previous season.
    pub fn set_avg_frad(&mut self, frad: FloatValue) {
        self.push_frad(frad);
    }

    pub fn clear_frad(&mut self) {
        self.data.last_season_frad.clear();
    }

    fn push_frad(&mut self, frad: FloatValue) {
        let history = &mut self.data.last_season_frad;
        history.push(frad);
        if history.len() > MONTHS_PER_YEAR {
            history.remove(0);
        }
    }

    /// Foliage fraction from the mean light response of the last season.
    ///
    /// $$f = f_{min} + (f_{max} - f_{min}) \cdot \overline{f_{rad}}^{s}$$
    ///
    /// Without a light history the minimum fraction is used.
    pub fn calc_adj_frac_fol(&mut self) {
        let species = &self.species;
        if self.data.last_season_frad.is_empty() {
            self.data.adj_frac_fol = species.frac_fol;
            return;
        }
        let avg_frad = mean(&self.data.last_season_frad);
        self.data.adj_frac_fol = species.frac_fol
            + (species.max_frac_fol - species.frac_fol) * avg_frad.powf(species.frac_fol_shape);
        self.data.first_year = false;
    }

    /// Bookkeeping after all sublayers of a month have been processed.
    pub fn complete_month(&mut self, climate: &MonthlyClimate) {
        self.store_frad();
        if climate.month.is_final() {
            self.calc_adj_frac_fol();
            self.clear_frad();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::fixtures::{climate, cohort_with, ecoregion};
    use crate::cohort::CohortData;
    use crate::site::SitePools;
    use approx::assert_relative_eq;
    use rsfc_core::config::ModelConfig;
    use rsfc_core::types::Month;

    // ===== Phase Transition Tests =====

    #[test]
    fn test_flush_from_dormant() {
        let t = SeasonPhase::Dormant.transition(false, PhenologyDriver::FrostFree);
        assert_eq!(t.phase, SeasonPhase::Flush);
        assert!(t.leaf_on);
        assert!(!t.senesce_foliage);
    }

    #[test]
    fn test_leaf_on_months_advance() {
        let mut phase = SeasonPhase::Dormant;
        let mut leaf_on = false;
        let mut seen = Vec::new();
        for _ in 0..5 {
            let t = phase.transition(leaf_on, PhenologyDriver::FrostFree);
            phase = t.phase;
            leaf_on = t.leaf_on;
            seen.push(phase);
        }
        assert_eq!(
            seen,
            vec![
                SeasonPhase::Flush,
                SeasonPhase::DefoliationWindow,
                SeasonPhase::RefoliationWindow,
                SeasonPhase::LateSeason(4),
                SeasonPhase::LateSeason(5),
            ]
        );
    }

    #[test]
    fn test_leaf_off_senesces_only_when_leafed() {
        let t = SeasonPhase::LateSeason(6).transition(true, PhenologyDriver::BelowLeafOnTemperature);
        assert_eq!(t.phase, SeasonPhase::Dormant);
        assert!(!t.leaf_on);
        assert!(t.senesce_foliage);

        let t = SeasonPhase::Dormant.transition(false, PhenologyDriver::BelowLeafOnTemperature);
        assert!(!t.senesce_foliage);
    }

    #[test]
    fn test_frozen_month_holds_state() {
        let t = SeasonPhase::RefoliationWindow.transition(true, PhenologyDriver::Frozen);
        assert_eq!(t.phase, SeasonPhase::RefoliationWindow);
        assert!(t.leaf_on);
    }

    #[test]
    fn test_cold_kill_keeps_phase() {
        let t = SeasonPhase::DefoliationWindow.transition(true, PhenologyDriver::ColdKill);
        assert_eq!(t.phase, SeasonPhase::DefoliationWindow);
        assert!(!t.leaf_on);
        assert!(t.senesce_foliage);
    }

    #[test]
    fn test_windows() {
        assert_eq!(SeasonPhase::Flush.window(), AllocationWindow::BeforeDefoliation);
        assert_eq!(SeasonPhase::DefoliationWindow.window(), AllocationWindow::Defoliation);
        assert_eq!(SeasonPhase::RefoliationWindow.window(), AllocationWindow::Refoliation);
        assert_eq!(SeasonPhase::LateSeason(7).window(), AllocationWindow::None);
    }

    #[test]
    fn test_driver_priority() {
        assert_eq!(
            PhenologyDriver::from_conditions(true, 20.0, 2.0, 1.0),
            PhenologyDriver::ColdKill
        );
        assert_eq!(
            PhenologyDriver::from_conditions(false, 2.0, 2.0, 1.0),
            PhenologyDriver::BelowLeafOnTemperature
        );
        assert_eq!(
            PhenologyDriver::from_conditions(false, 5.0, 2.0, 0.0),
            PhenologyDriver::Frozen
        );
    }

    // ===== Allocation Tests =====

    fn leafed(phase: SeasonPhase, fol: FloatValue, nsc: FloatValue) -> Cohort {
        cohort_with(CohortData {
            age: 20,
            nsc,
            total_biomass: 10000.0,
            biomass_max: 10000.0,
            fol,
            leaf_on: true,
            phase,
            adj_frac_fol: 0.03,
            ..Default::default()
        })
    }

    #[test]
    fn test_allocation_closes_foliage_gap() {
        let mut cohort = leafed(SeasonPhase::Flush, 0.0, 1000.0);
        let ideal = 0.03 * cohort.factive_biom() * 10000.0;
        cohort.allocate_foliage(500.0, 500.0);

        assert_relative_eq!(cohort.fol(), ideal, epsilon = 1e-9);
        assert_relative_eq!(cohort.max_fol_year(), ideal, epsilon = 1e-9);
        assert_relative_eq!(cohort.nsc(), 1000.0 - 0.45 * ideal, epsilon = 1e-9);
    }

    #[test]
    fn test_allocation_limited_by_nsc() {
        let mut cohort = leafed(SeasonPhase::Flush, 0.0, 10.0);
        cohort.allocate_foliage(500.0, 500.0);
        assert_relative_eq!(cohort.nsc(), 0.0);
        assert_relative_eq!(cohort.fol(), 10.0 / 0.45, epsilon = 1e-9);
    }

    #[test]
    fn test_shaded_cohort_keeps_reserve() {
        let mut cohort = leafed(SeasonPhase::Flush, 0.0, 20.0);
        let reserve = 0.05 * cohort.factive_biom() * 10000.0 * 0.45;
        cohort.allocate_foliage(100.0, 500.0);
        assert_relative_eq!(cohort.nsc(), reserve, epsilon = 1e-9);
    }

    #[test]
    fn test_reserve_above_nsc_blocks_allocation() {
        let mut cohort = leafed(SeasonPhase::Flush, 0.0, 5.0);
        cohort.allocate_foliage(100.0, 500.0);
        assert_relative_eq!(cohort.nsc(), 5.0);
        assert_relative_eq!(cohort.fol(), 0.0);
    }

    #[test]
    fn test_defoliation_window() {
        let mut cohort = leafed(SeasonPhase::DefoliationWindow, 200.0, 100.0);
        cohort.data.defol_prop = 0.75;
        cohort.allocate_foliage(500.0, 500.0);
        assert_relative_eq!(cohort.fol(), 50.0, epsilon = 1e-9);
        assert_relative_eq!(cohort.nsc(), 100.0);
    }

    #[test]
    fn test_refoliation_above_trigger() {
        let mut cohort = leafed(SeasonPhase::RefoliationWindow, 50.0, 1000.0);
        cohort.data.defol_prop = 0.75;
        let ideal = 0.03 * cohort.factive_biom() * 10000.0;
        cohort.allocate_foliage(500.0, 500.0);

        // Refoliation to the maximum, paid at the refoliation cost
        assert_relative_eq!(cohort.fol(), ideal, epsilon = 1e-9);
        let cost = 0.45 * (0.5 * ideal - 50.0);
        assert_relative_eq!(cohort.nsc(), 1000.0 - cost, epsilon = 1e-9);
    }

    #[test]
    fn test_no_refoliation_below_trigger() {
        let mut cohort = leafed(SeasonPhase::RefoliationWindow, 150.0, 1000.0);
        cohort.data.defol_prop = 0.25;
        let ideal = 0.03 * cohort.factive_biom() * 10000.0;
        cohort.allocate_foliage(500.0, 500.0);

        assert_relative_eq!(cohort.fol(), 150.0);
        assert_relative_eq!(cohort.nsc(), 1000.0 - 0.45 * 0.1 * ideal, epsilon = 1e-9);
    }

    #[test]
    fn test_undefoliated_cohort_skips_refoliation() {
        let mut cohort = leafed(SeasonPhase::RefoliationWindow, 150.0, 1000.0);
        cohort.allocate_foliage(500.0, 500.0);
        assert_relative_eq!(cohort.fol(), 150.0);
        assert_relative_eq!(cohort.nsc(), 1000.0);
    }

    #[test]
    fn test_late_season_no_allocation() {
        let mut cohort = leafed(SeasonPhase::LateSeason(5), 10.0, 1000.0);
        cohort.allocate_foliage(500.0, 500.0);
        assert_relative_eq!(cohort.fol(), 10.0);
        assert_relative_eq!(cohort.nsc(), 1000.0);
    }

    #[test]
    fn test_first_year_uses_maximum_fraction() {
        let mut cohort = leafed(SeasonPhase::Flush, 0.0, 1000.0);
        cohort.data.first_year = true;
        cohort.allocate_foliage(500.0, 500.0);
        assert_relative_eq!(cohort.adj_frac_fol(), cohort.species().max_frac_fol);
    }

    #[test]
    fn test_tiny_allocation_not_added() {
        let mut cohort = leafed(SeasonPhase::Flush, 0.0, 0.001);
        cohort.allocate_foliage(500.0, 500.0);
        assert_eq!(cohort.fol(), 0.0);
        assert_eq!(cohort.nsc(), 0.0);
    }

    // ===== Phenology Step Tests =====

    #[test]
    fn test_cold_kill_step() {
        let config = ModelConfig::default();
        let eco = rsfc_core::ecoregion::EcoregionParameters {
            winter_std: 2.0,
            ..ecoregion()
        };
        let mut month = climate(Month::February);
        month.tave = -20.5;
        let inputs = SublayerInputs::new(&month, &eco, &config).with_cold_kill(true);

        let mut cohort = leafed(SeasonPhase::LateSeason(5), 120.0, 80.0);
        cohort.set_canopy_layer_prop(0.5);
        let mut site = SitePools::new();
        cohort.phenology_step(&inputs, &mut site);

        assert_eq!(cohort.cold_kill(), Some(-27));
        assert!(!cohort.leaf_on());
        assert_eq!(cohort.nsc(), 0.0);
        assert_eq!(cohort.fol(), 0.0);
        assert_relative_eq!(site.litter.mass, 60.0, epsilon = 1e-9);
        assert_relative_eq!(cohort.data().last_foliage_senescence, 120.0);
    }

    #[test]
    fn test_leaf_off_step() {
        let config = ModelConfig::default();
        let eco = ecoregion();
        let mut month = climate(Month::November);
        month.tmin = -5.0;
        let inputs = SublayerInputs::new(&month, &eco, &config);

        let mut cohort = leafed(SeasonPhase::LateSeason(7), 200.0, 500.0);
        let mut site = SitePools::new();
        cohort.phenology_step(&inputs, &mut site);

        assert!(!cohort.leaf_on());
        assert_eq!(cohort.phase(), SeasonPhase::Dormant);
        // Deciduous turnover drops all foliage
        assert_relative_eq!(site.litter.mass, 200.0, epsilon = 1e-9);
        assert_relative_eq!(cohort.nsc(), 500.0);
    }

    #[test]
    fn test_flush_step_allocates() {
        let config = ModelConfig::default();
        let eco = ecoregion();
        let month = climate(Month::May);
        let inputs = SublayerInputs::new(&month, &eco, &config).with_main_layer_par(month.par0);

        let mut cohort = leafed(SeasonPhase::Dormant, 0.0, 500.0);
        cohort.data.leaf_on = false;
        let mut site = SitePools::new();
        cohort.phenology_step(&inputs, &mut site);

        assert!(cohort.leaf_on());
        assert_eq!(cohort.phase(), SeasonPhase::Flush);
        assert!(cohort.fol() > 0.0);
        assert!(cohort.nsc() < 500.0);
    }

    // ===== Annual Step Tests =====

    #[test]
    fn test_annual_allocation() {
        let mut cohort = cohort_with(CohortData {
            age: 40,
            nsc: 600.0,
            total_biomass: 10000.0,
            biomass_max: 10000.0,
            ..Default::default()
        });
        let mut site = SitePools::new();
        cohort.annual_step(true, false, &mut site);

        let s = cohort.species().clone();
        let senescence = 3300.0 * s.to_root + 6700.0 * s.to_wood;
        let remaining = 10000.0 - senescence;
        let reserve = s.dnsc * (-s.fr_act_wd * 10000.0_f64).exp() * remaining * s.c_frac_biomass;
        let allocation = 600.0 - reserve;

        assert_eq!(cohort.age(), 41);
        assert_relative_eq!(site.woody_debris.mass, senescence, epsilon = 1e-9);
        assert_relative_eq!(site.woody_debris.quality, s.k_wd_lit);
        assert_relative_eq!(cohort.nsc(), reserve, epsilon = 1e-9);
        assert_relative_eq!(
            cohort.total_biomass(),
            remaining + allocation / s.c_frac_biomass,
            epsilon = 1e-9
        );
        assert!(cohort.biomass_max() >= cohort.total_biomass());
        assert!(site.deaths.is_empty());
    }

    #[test]
    fn test_december_death_senesces_all_foliage() {
        let mut cohort = cohort_with(CohortData {
            age: 15,
            nsc: 0.0,
            total_biomass: 5000.0,
            biomass_max: 5000.0,
            fol: 140.0,
            leaf_on: true,
            ..Default::default()
        });
        let mut site = SitePools::new();
        cohort.annual_step(true, false, &mut site);

        assert_eq!(cohort.nsc(), 0.0);
        assert_eq!(cohort.fol(), 0.0);
        assert!(!cohort.leaf_on());
        assert_relative_eq!(site.litter.mass, 140.0);
        assert_eq!(site.deaths.len(), 1);
        assert_eq!(site.deaths[0].cause, DeathCause::CarbonStarvation);
    }

    #[test]
    fn test_cold_killed_cohort_reports_cause() {
        let mut cohort = cohort_with(CohortData {
            age: 15,
            total_biomass: 5000.0,
            biomass_max: 5000.0,
            cold_kill: Some(-30),
            ..Default::default()
        });
        let mut site = SitePools::new();
        cohort.annual_step(true, false, &mut site);
        assert_eq!(site.deaths[0].cause, DeathCause::ColdKill);
    }

    #[test]
    fn test_below_initiation_biomass() {
        let mut cohort = cohort_with(CohortData {
            age: 3,
            nsc: 50.0,
            total_biomass: 200.0,
            biomass_max: 400.0,
            fol: 5.0,
            ..Default::default()
        });
        assert!(cohort.is_alive());
        let mut site = SitePools::new();
        cohort.annual_step(true, false, &mut site);
        assert_eq!(site.deaths.len(), 1);
        assert_eq!(site.deaths[0].cause, DeathCause::BelowInitiationBiomass);
        assert_eq!(cohort.fol(), 0.0);
    }

    #[test]
    fn test_spinup_skips_initiation_check() {
        let mut cohort = cohort_with(CohortData {
            age: 3,
            nsc: 50.0,
            total_biomass: 200.0,
            biomass_max: 400.0,
            ..Default::default()
        });
        let mut site = SitePools::new();
        cohort.annual_step(true, true, &mut site);
        assert!(site.deaths.is_empty());
    }

    #[test]
    fn test_mortality_disabled() {
        let mut cohort = cohort_with(CohortData {
            age: 15,
            total_biomass: 5000.0,
            biomass_max: 5000.0,
            fol: 100.0,
            ..Default::default()
        });
        let mut site = SitePools::new();
        cohort.annual_step(false, false, &mut site);
        assert!(site.deaths.is_empty());
        assert_relative_eq!(cohort.fol(), 100.0);
        assert_eq!(cohort.age(), 16);
    }

    // ===== Seasonal Light History Tests =====

    #[test]
    fn test_frad_history_bounded() {
        let mut cohort = leafed(SeasonPhase::Flush, 0.0, 0.0);
        for i in 0..20 {
            cohort.set_avg_frad(i as FloatValue / 20.0);
        }
        assert_eq!(cohort.last_season_frad().len(), MONTHS_PER_YEAR);
        assert_relative_eq!(cohort.last_season_frad()[0], 8.0 / 20.0);
    }

    #[test]
    fn test_store_frad_only_when_leafed() {
        let mut cohort = leafed(SeasonPhase::Flush, 0.0, 0.0);
        let mut buffers = crate::cohort::SublayerBuffers::new(2);
        buffers.frad = vec![0.8, 0.4];
        cohort.data.sublayers = Some(buffers);

        cohort.store_frad();
        assert_relative_eq!(cohort.data().last_frad, 0.6, epsilon = 1e-12);
        assert_eq!(cohort.last_season_frad().len(), 1);

        cohort.data.leaf_on = false;
        cohort.store_frad();
        assert_eq!(cohort.last_season_frad().len(), 1);
    }

    #[test]
    fn test_adjusted_foliage_fraction() {
        let mut cohort = leafed(SeasonPhase::Flush, 0.0, 0.0);
        cohort.data.first_year = true;
        cohort.calc_adj_frac_fol();
        assert_relative_eq!(cohort.adj_frac_fol(), cohort.species().frac_fol);
        assert!(cohort.data().first_year);

        cohort.set_avg_frad(0.5);
        cohort.set_avg_frad(0.7);
        cohort.calc_adj_frac_fol();
        // frac_fol_shape is 1, so the fraction is linear in mean FRad
        assert_relative_eq!(cohort.adj_frac_fol(), 0.02 + 0.02 * 0.6, epsilon = 1e-12);
        assert!(!cohort.data().first_year);
    }

    #[test]
    fn test_complete_december_clears_history() {
        let mut cohort = leafed(SeasonPhase::LateSeason(6), 0.0, 0.0);
        cohort.data.leaf_on = false;
        cohort.set_avg_frad(0.9);

        cohort.complete_month(&climate(Month::November));
        assert_eq!(cohort.last_season_frad().len(), 1);

        cohort.complete_month(&climate(Month::December));
        assert!(cohort.last_season_frad().is_empty());
        assert_relative_eq!(cohort.adj_frac_fol(), 0.02 + 0.02 * 0.9, epsilon = 1e-12);
    }
}
