//! Shared drivers for cohort unit tests

use super::{Cohort, CohortData};
use crate::parameters::SpeciesParameters;
use rsfc_core::climate::{MonthlyClimate, SpeciesClimate};
use rsfc_core::config::ModelConfig;
use rsfc_core::ecoregion::EcoregionParameters;
use rsfc_core::hydrology::{Hydrology, PressureHeadTable};
use rsfc_core::types::{FloatValue, Month};
use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::Arc;

const DAYS_IN_MONTH: [FloatValue; 12] = [
    31.0, 28.0, 31.0, 30.0, 31.0, 30.0, 31.0, 31.0, 30.0, 31.0, 30.0, 31.0,
];

pub(crate) fn species() -> Arc<SpeciesParameters> {
    Arc::new(SpeciesParameters::default())
}

pub(crate) fn ecoregion() -> EcoregionParameters {
    EcoregionParameters::default()
}

pub(crate) fn hydrology(water: FloatValue) -> Hydrology {
    Hydrology::new(water, Arc::new(PressureHeadTable::default()))
}

pub(crate) fn cohort_with(data: CohortData) -> Cohort {
    Cohort::from_data(species(), &ModelConfig::default(), data).unwrap()
}

/// A temperate seasonal cycle peaking in July.
///
/// Tmin is below freezing from November to April and above the leaf-on threshold
/// from May to September.
pub(crate) fn climate(month: Month) -> MonthlyClimate {
    let index = (month.number() - 1) as FloatValue;
    let winter = (2.0 * PI * index / 12.0).cos();
    let summer = (1.0 - winter) / 2.0;
    let tave = 5.0 - 15.0 * winter;

    let coefficients = SpeciesClimate {
        ftemp_psn: 0.9 * summer.max(0.1),
        maint_resp_ftemp_resp: 0.0005 + 0.0015 * summer,
        ftemp_resp: 1.0,
        dvpd: 0.9,
        jh2o: 1.0e-7,
        amax_b_co2: 71.9,
        base_fol_resp_frac: 0.1,
        q10_factor: 1.0,
    };

    MonthlyClimate {
        year: 2000,
        month,
        tmin: tave - 8.0,
        tmax: tave + 7.0,
        tave,
        tday: tave + 3.0,
        par0: 300.0 + 700.0 * summer,
        co2: 400.0,
        precipitation: 80.0,
        daylength: 32400.0 + 21600.0 * summer,
        day_span: DAYS_IN_MONTH[month.number() as usize - 1],
        species: HashMap::new(),
    }
    .with_species("acersacc", coefficients)
}
