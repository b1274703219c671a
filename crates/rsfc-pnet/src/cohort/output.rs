//! Monthly aggregate record of a cohort

use super::data::mean;
use super::Cohort;
use rsfc_core::climate::MonthlyClimate;
use rsfc_core::constants::{CO2_MOLAR_MASS, H2O_MOLAR_MASS, TRANSPIRATION_CONVERSION};
use rsfc_core::errors::RSFCResult;
use rsfc_core::types::{FloatValue, Month};
use serde::{Deserialize, Serialize};
use std::fmt;

fn total(values: Option<&Vec<FloatValue>>) -> FloatValue {
    values.map(|v| v.iter().sum()).unwrap_or(0.0)
}

fn average(values: Option<&Vec<FloatValue>>) -> FloatValue {
    values.map(|v| mean(v)).unwrap_or(0.0)
}

/// The response function holding photosynthesis back the most this month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LimitingFactor {
    /// Foliage was killed by cold at the recorded threshold (degC)
    ColdTolerance(i32),
    Temperature,
    Age,
    /// Water limited with pressure head above H3
    TooDry,
    /// Water limited with pressure head below H2
    TooWet,
    Water,
    Light,
    Ozone,
    /// No sublayer results this month
    NotAvailable,
}

impl fmt::Display for LimitingFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitingFactor::ColdTolerance(threshold) => write!(f, "ColdTol ({})", threshold),
            LimitingFactor::Temperature => write!(f, "fTemp"),
            LimitingFactor::Age => write!(f, "fAge"),
            LimitingFactor::TooDry => write!(f, "Too_dry"),
            LimitingFactor::TooWet => write!(f, "Too_wet"),
            LimitingFactor::Water => write!(f, "fWater"),
            LimitingFactor::Light => write!(f, "fRad"),
            LimitingFactor::Ozone => write!(f, "fOzone"),
            LimitingFactor::NotAvailable => write!(f, "NA"),
        }
    }
}

/// Sums and means of one cohort's sublayer results for a month.
///
/// Fluxes are summed over sublayers, response factors are averaged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub time: FloatValue,
    pub year: i32,
    pub month: Month,
    pub species: String,
    pub age: u16,
    pub layer: u8,
    pub canopy_layer_prop: FloatValue,
    pub canopy_growing_space: FloatValue,

    /// unit: m2/m2
    pub lai: FloatValue,
    /// Leaf area scaled by the occupied share of the layer
    /// unit: m2/m2
    pub site_lai: FloatValue,

    /// unit: gC/m2/month
    pub gross_psn: FloatValue,
    /// unit: gC/m2/month
    pub fol_resp: FloatValue,
    /// unit: gC/m2/month
    pub maintenance_respiration: FloatValue,
    /// unit: gC/m2/month
    pub net_psn: FloatValue,
    /// unit: mm/month
    pub transpiration: FloatValue,
    /// unit: mm/month
    pub potential_transpiration: FloatValue,
    /// Water use efficiency
    /// unit: g CO2/g H2O
    pub wue: FloatValue,

    /// unit: gDW/m2
    pub fol: FloatValue,
    /// unit: gDW/m2
    pub root: FloatValue,
    /// unit: gDW/m2
    pub wood: FloatValue,
    /// unit: gC/m2
    pub nsc: FloatValue,
    pub nsc_fraction: FloatValue,

    pub fwater: FloatValue,
    /// unit: m3/m3
    pub water: FloatValue,
    /// unit: m
    pub press_head: FloatValue,
    pub frad: FloatValue,
    pub fozone: FloatValue,
    pub del_amax: FloatValue,
    pub ftemp_psn: FloatValue,
    pub ftemp_resp: FloatValue,
    pub fage: FloatValue,
    pub leaf_on: bool,
    pub factive_biom: FloatValue,
    pub adj_fol_n: FloatValue,
    pub adj_frac_fol: FloatValue,
    pub ci_modifier: FloatValue,
    pub adj_half_sat: FloatValue,
    pub limiting_factor: LimitingFactor,
}

impl MonthlySummary {
    /// Summarise the month just completed by `cohort`.
    ///
    /// Fails when `climate` has no coefficients for the cohort's species.
    pub fn from_cohort(cohort: &Cohort, climate: &MonthlyClimate) -> RSFCResult<Self> {
        let vars = climate.species_variables(&cohort.species().name)?;
        let data = cohort.data();
        let prop = data.canopy_layer_prop;

        let buffers = data.sublayers.as_ref();

        let gross_psn = total(buffers.map(|b| &b.gross_psn));
        let transpiration = total(buffers.map(|b| &b.transpiration));
        let wue = if transpiration > 0.0 {
            TRANSPIRATION_CONVERSION * gross_psn * prop / transpiration * CO2_MOLAR_MASS
                / H2O_MOLAR_MASS
        } else {
            0.0
        };

        let fwater = average(buffers.map(|b| &b.fwater));
        let press_head = average(buffers.map(|b| &b.press_head));
        let frad = average(buffers.map(|b| &b.frad));
        let fozone = average(buffers.map(|b| &b.fozone));
        let fage = cohort.fage();

        let limiting_factor = if let Some(threshold) = data.cold_kill {
            LimitingFactor::ColdTolerance(threshold)
        } else if data.sublayers.is_none() {
            LimitingFactor::NotAvailable
        } else {
            let species = cohort.species();
            let water = if press_head > species.h3 {
                LimitingFactor::TooDry
            } else if press_head < species.h2 {
                LimitingFactor::TooWet
            } else {
                LimitingFactor::Water
            };
            let candidates = [
                (LimitingFactor::Temperature, vars.ftemp_psn),
                (LimitingFactor::Age, fage),
                (water, fwater),
                (LimitingFactor::Light, frad),
                (LimitingFactor::Ozone, fozone),
            ];
            let lowest = candidates
                .iter()
                .map(|(_, value)| *value)
                .fold(FloatValue::INFINITY, FloatValue::min);
            candidates
                .iter()
                .find(|(_, value)| *value == lowest)
                .map(|(factor, _)| *factor)
                .unwrap_or(LimitingFactor::NotAvailable)
        };

        let lai = cohort.sum_lai();
        Ok(Self {
            time: climate.time(),
            year: climate.year,
            month: climate.month,
            species: cohort.species().name.clone(),
            age: data.age,
            layer: data.layer,
            canopy_layer_prop: prop,
            canopy_growing_space: data.canopy_growing_space,
            lai,
            site_lai: lai * prop,
            gross_psn,
            fol_resp: total(buffers.map(|b| &b.fol_resp)),
            maintenance_respiration: total(buffers.map(|b| &b.maintenance_respiration)),
            net_psn: total(buffers.map(|b| &b.net_psn)),
            transpiration,
            potential_transpiration: total(buffers.map(|b| &b.potential_transpiration)),
            wue,
            fol: data.fol,
            root: cohort.root(),
            wood: cohort.wood(),
            nsc: data.nsc,
            nsc_fraction: cohort.nsc_fraction(),
            fwater,
            water: average(buffers.map(|b| &b.water)),
            press_head,
            frad,
            fozone,
            del_amax: average(buffers.map(|b| &b.del_amax)),
            ftemp_psn: vars.ftemp_psn,
            ftemp_resp: vars.ftemp_resp,
            fage,
            leaf_on: data.leaf_on,
            factive_biom: cohort.factive_biom(),
            adj_fol_n: average(buffers.map(|b| &b.adj_fol_n)),
            adj_frac_fol: average(buffers.map(|b| &b.adj_frac_fol)),
            ci_modifier: average(buffers.map(|b| &b.ci_modifier)),
            adj_half_sat: data.adj_half_sat,
            limiting_factor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::fixtures::{climate, cohort_with, ecoregion, hydrology};
    use crate::cohort::{CohortData, SeasonPhase, SublayerBuffers, SublayerInputs};
    use crate::site::SitePools;
    use approx::assert_relative_eq;
    use rsfc_core::config::ModelConfig;

    fn with_buffers(buffers: SublayerBuffers) -> Cohort {
        cohort_with(CohortData {
            age: 30,
            nsc: 400.0,
            total_biomass: 12000.0,
            biomass_max: 12000.0,
            fol: 300.0,
            leaf_on: true,
            sublayers: Some(buffers),
            ..Default::default()
        })
    }

    fn uniform(fwater: FloatValue, frad: FloatValue, press_head: FloatValue) -> SublayerBuffers {
        let n = ModelConfig::default().sublayer_count;
        let mut buffers = SublayerBuffers::new(n);
        buffers.fwater = vec![fwater; n];
        buffers.frad = vec![frad; n];
        buffers.fozone = vec![1.0; n];
        buffers.press_head = vec![press_head; n];
        buffers
    }

    #[test]
    fn test_summary_of_grown_month() {
        let config = ModelConfig::default();
        let eco = ecoregion();
        let month = climate(Month::July);
        let inputs = SublayerInputs::new(&month, &eco, &config).with_precipitation(8.0, 1);
        let mut cohort = cohort_with(CohortData {
            age: 30,
            nsc: 400.0,
            total_biomass: 12000.0,
            biomass_max: 12000.0,
            fol: 300.0,
            leaf_on: true,
            phase: SeasonPhase::LateSeason(4),
            adj_frac_fol: 0.03,
            ..Default::default()
        });
        let mut ledger = hydrology(0.3);
        let mut site = SitePools::new();
        let mut o3 = 0.0;
        cohort.grow_month(&inputs, &mut o3, &mut ledger, &mut site).unwrap();

        let summary = MonthlySummary::from_cohort(&cohort, &month).unwrap();
        let buffers = cohort.sublayers().unwrap();

        assert_eq!(summary.month, Month::July);
        assert_relative_eq!(summary.gross_psn, buffers.gross_psn.iter().sum::<FloatValue>());
        assert_relative_eq!(summary.net_psn, buffers.net_psn.iter().sum::<FloatValue>());
        assert_relative_eq!(summary.lai, cohort.sum_lai());
        assert!(summary.transpiration > 0.0);
        assert_relative_eq!(
            summary.wue,
            0.0015 * summary.gross_psn / summary.transpiration * 44.0 / 18.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(summary.wood + summary.root, 12000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_wue_zero_without_transpiration() {
        let cohort = with_buffers(uniform(1.0, 1.0, 50.0));
        let summary = MonthlySummary::from_cohort(&cohort, &climate(Month::July)).unwrap();
        assert_eq!(summary.wue, 0.0);
    }

    // ===== Limiting Factor Tests =====

    #[test]
    fn test_light_limited() {
        let cohort = with_buffers(uniform(1.0, 0.2, 50.0));
        let summary = MonthlySummary::from_cohort(&cohort, &climate(Month::July)).unwrap();
        assert_eq!(summary.limiting_factor, LimitingFactor::Light);
        assert_eq!(summary.limiting_factor.to_string(), "fRad");
    }

    #[test]
    fn test_water_limited_by_drought() {
        let cohort = with_buffers(uniform(0.1, 0.8, 120.0));
        let summary = MonthlySummary::from_cohort(&cohort, &climate(Month::July)).unwrap();
        assert_eq!(summary.limiting_factor, LimitingFactor::TooDry);

        let cohort = with_buffers(uniform(0.1, 0.8, 0.5));
        let summary = MonthlySummary::from_cohort(&cohort, &climate(Month::July)).unwrap();
        assert_eq!(summary.limiting_factor, LimitingFactor::TooWet);

        let cohort = with_buffers(uniform(0.1, 0.8, 50.0));
        let summary = MonthlySummary::from_cohort(&cohort, &climate(Month::July)).unwrap();
        assert_eq!(summary.limiting_factor, LimitingFactor::Water);
    }

    #[test]
    fn test_temperature_wins_ties() {
        let month = climate(Month::July);
        let ftemp = month.species_variables("acersacc").unwrap().ftemp_psn;
        let cohort = with_buffers(uniform(ftemp, ftemp, 50.0));
        let summary = MonthlySummary::from_cohort(&cohort, &month).unwrap();
        assert_eq!(summary.limiting_factor, LimitingFactor::Temperature);
    }

    #[test]
    fn test_cold_tolerance_reported() {
        let mut data = with_buffers(uniform(1.0, 1.0, 50.0)).into_data();
        data.cold_kill = Some(-27);
        let cohort = cohort_with(data);
        let summary = MonthlySummary::from_cohort(&cohort, &climate(Month::February)).unwrap();
        assert_eq!(summary.limiting_factor, LimitingFactor::ColdTolerance(-27));
        assert_eq!(summary.limiting_factor.to_string(), "ColdTol (-27)");
    }

    #[test]
    fn test_inactive_cohort_not_available() {
        let cohort = cohort_with(CohortData {
            total_biomass: 100.0,
            biomass_max: 100.0,
            ..Default::default()
        });
        let summary = MonthlySummary::from_cohort(&cohort, &climate(Month::July)).unwrap();
        assert_eq!(summary.limiting_factor, LimitingFactor::NotAvailable);
        assert_eq!(summary.gross_psn, 0.0);
    }

    #[test]
    fn test_summary_serialises() {
        let cohort = with_buffers(uniform(0.5, 0.9, 50.0));
        let summary = MonthlySummary::from_cohort(&cohort, &climate(Month::July)).unwrap();
        let json = serde_json::to_string(&summary).unwrap();
        let parsed: MonthlySummary = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.limiting_factor, LimitingFactor::Water);
        assert_eq!(parsed.month, Month::July);
        assert_relative_eq!(parsed.fwater, summary.fwater);
        assert_relative_eq!(parsed.nsc, summary.nsc);
    }
}
