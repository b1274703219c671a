//! Monthly climate drivers
//!
//! A [`MonthlyClimate`] carries the atmospheric state of one ecoregion for one month,
//! together with the species-specific coefficients derived from it (temperature
//! responses, vapour pressure deficit effects and assimilation coefficients). How those
//! coefficients are derived from raw weather is the provider's concern; the cohort
//! engine only reads them.

use crate::errors::{RSFCError, RSFCResult};
use crate::types::{FloatValue, Month};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Climate-derived coefficients for one species in one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesClimate {
    /// Temperature modifier on photosynthesis
    /// unit: dimensionless [0, 1]
    pub ftemp_psn: FloatValue,

    /// Temperature-driven maintenance respiration rate, as a fraction of structural
    /// carbon per month
    /// unit: 1/month
    pub maint_resp_ftemp_resp: FloatValue,

    /// Temperature modifier on respiration, weighted over day and night
    /// unit: dimensionless
    pub ftemp_resp: FloatValue,

    /// Vapour pressure deficit modifier on gross photosynthesis
    /// unit: dimensionless [0, 1]
    pub dvpd: FloatValue,

    /// Water flux term of the water-use efficiency ratio
    /// unit: mol/m2/s
    pub jh2o: FloatValue,

    /// Slope of maximum assimilation against foliar nitrogen, adjusted for CO2
    /// unit: nmol CO2/g/s per % N
    pub amax_b_co2: FloatValue,

    /// Base foliar respiration as a fraction of maximum assimilation
    /// unit: dimensionless
    pub base_fol_resp_frac: FloatValue,

    /// Q10 temperature adjustment of foliar respiration
    /// unit: dimensionless
    pub q10_factor: FloatValue,
}

/// Climate drivers of one ecoregion in one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyClimate {
    pub year: i32,
    pub month: Month,

    /// Minimum monthly temperature
    /// unit: degC
    pub tmin: FloatValue,

    /// Maximum monthly temperature
    /// unit: degC
    pub tmax: FloatValue,

    /// Mean monthly temperature
    /// unit: degC
    pub tave: FloatValue,

    /// Mean daytime temperature
    /// unit: degC
    pub tday: FloatValue,

    /// Photosynthetically active radiation at the top of the canopy
    /// unit: umol/m2/s
    pub par0: FloatValue,

    /// Atmospheric CO2 concentration
    /// unit: ppm
    pub co2: FloatValue,

    /// Monthly precipitation
    /// unit: mm
    pub precipitation: FloatValue,

    /// Length of daylight
    /// unit: s/day
    pub daylength: FloatValue,

    /// Number of days in the month
    pub day_span: FloatValue,

    /// Species-specific coefficients keyed by species name
    #[serde(default)]
    pub species: HashMap<String, SpeciesClimate>,
}

impl MonthlyClimate {
    /// Decimal time of the start of this month.
    pub fn time(&self) -> FloatValue {
        self.year as FloatValue + (self.month.number() - 1) as FloatValue / 12.0
    }

    /// Coefficients of a single species.
    pub fn species_variables(&self, species: &str) -> RSFCResult<&SpeciesClimate> {
        self.species
            .get(species)
            .ok_or_else(|| RSFCError::UnknownSpecies(species.to_string()))
    }

    pub fn with_species(mut self, species: &str, variables: SpeciesClimate) -> Self {
        self.species.insert(species.to_string(), variables);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn july() -> MonthlyClimate {
        MonthlyClimate {
            year: 2000,
            month: Month::July,
            tmin: 12.0,
            tmax: 27.0,
            tave: 20.0,
            tday: 23.0,
            par0: 1100.0,
            co2: 370.0,
            precipitation: 90.0,
            daylength: 54000.0,
            day_span: 31.0,
            species: HashMap::new(),
        }
    }

    fn coefficients() -> SpeciesClimate {
        SpeciesClimate {
            ftemp_psn: 0.9,
            maint_resp_ftemp_resp: 0.002,
            ftemp_resp: 1.2,
            dvpd: 0.85,
            jh2o: 1.0e-7,
            amax_b_co2: 71.9,
            base_fol_resp_frac: 0.1,
            q10_factor: 1.5,
        }
    }

    #[test]
    fn test_time_is_decimal_year() {
        let climate = july();
        assert!((climate.time() - 2000.5).abs() < 1e-10);
    }

    #[test]
    fn test_species_lookup() {
        let climate = july().with_species("acersacc", coefficients());
        let variables = climate.species_variables("acersacc").unwrap();
        assert!((variables.dvpd - 0.85).abs() < 1e-10);

        match climate.species_variables("pinubank") {
            Err(RSFCError::UnknownSpecies(name)) => assert_eq!(name, "pinubank"),
            other => panic!("Expected an unknown species error, got {:?}", other),
        }
    }

    #[test]
    fn test_serde_roundtrip() {
        let climate = july().with_species("acersacc", coefficients());
        let json = serde_json::to_string(&climate).unwrap();
        let parsed: MonthlyClimate = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, climate);
    }
}
