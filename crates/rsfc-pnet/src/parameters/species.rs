//! Species Parameters
//!
//! Physiological constants of a tree species. One parameter set is shared, read-only,
//! by every cohort of that species.
//!
//! # Reference
//!
//! Parameter names and meanings follow the PnET family of forest ecosystem models
//! (Aber and Federer, 1992; de Bruijn et al., 2014).

use rsfc_core::errors::{check_range, RSFCError, RSFCResult};
use rsfc_core::types::FloatValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stomatal response class of a species to ozone exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OzoneSensitivity {
    #[serde(alias = "Sens")]
    Sensitive,
    #[serde(alias = "Int")]
    Intermediate,
    #[serde(alias = "Tol")]
    Tolerant,
}

impl FromStr for OzoneSensitivity {
    type Err = RSFCError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Sensitive" | "Sens" => Ok(Self::Sensitive),
            "Intermediate" | "Int" => Ok(Self::Intermediate),
            "Tolerant" | "Tol" => Ok(Self::Tolerant),
            other => Err(RSFCError::Error(format!(
                "Unrecognized ozone sensitivity class '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for OzoneSensitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Growth form of a species, used for canopy albedo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Lifeform {
    Ground,
    Open,
    DarkConifer,
    LightConifer,
    Deciduous,
    Other,
}

/// Physiological parameters of one species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeciesParameters {
    pub name: String,

    // ----- Foliage -----
    /// Foliage fraction of active biomass when the canopy is fully shaded
    /// unit: g foliage / g active biomass
    /// default: 0.02
    pub frac_fol: FloatValue,

    /// Foliage fraction of active biomass in full light
    /// unit: g foliage / g active biomass
    /// default: 0.04
    pub max_frac_fol: FloatValue,

    /// Curvature of the foliage fraction against seasonal light response
    /// default: 1.0
    pub frac_fol_shape: FloatValue,

    /// Foliar nitrogen in deep shade
    /// unit: %
    /// default: 1.6
    pub fol_n: FloatValue,

    /// Foliar nitrogen in full light
    /// unit: %
    /// default: 2.4
    pub max_fol_n: FloatValue,

    /// Curvature of foliar nitrogen against light response
    /// default: 1.5
    pub fol_n_shape: FloatValue,

    /// Specific leaf weight at the top of the canopy
    /// unit: g/m2
    /// default: 100.0
    pub slw_max: FloatValue,

    /// Decrease in specific leaf weight per unit of foliage above
    /// unit: g/m2 per g/m2
    /// default: 0.2
    pub slw_del: FloatValue,

    /// Light extinction coefficient
    /// default: 0.58
    pub k: FloatValue,

    /// Fraction of foliage turned over each year
    /// unit: 1/yr
    /// default: 1.0
    pub to_fol: FloatValue,

    /// Lignin fraction of foliage litter
    /// default: 0.2
    pub fol_lignin: FloatValue,

    /// Maximum leaf area index, used for the canopy layer proportion
    /// unit: m2/m2
    /// default: 8.0
    pub max_lai: FloatValue,

    // ----- Biomass and carbon -----
    /// Fraction of structural biomass below ground
    /// default: 0.33
    pub frac_below_g: FloatValue,

    /// Carbon fraction of biomass
    /// unit: gC/gDW
    /// default: 0.45
    pub c_frac_biomass: FloatValue,

    /// Target NSC concentration of active biomass
    /// unit: gC/gC
    /// default: 0.05
    pub dnsc: FloatValue,

    /// NSC of a newly established cohort
    /// unit: gC/m2
    /// default: 7.0
    pub initial_nsc: FloatValue,

    /// Decay of the active wood fraction with maximum biomass
    /// unit: 1/(g/m2)
    /// default: 0.00002
    pub fr_act_wd: FloatValue,

    /// Fraction of NSC held in reserve when shaded below the top of canopy
    /// default: 0.05
    pub nsc_reserve: FloatValue,

    /// Turnover of root biomass
    /// unit: 1/yr
    /// default: 0.02
    pub to_root: FloatValue,

    /// Turnover of wood biomass
    /// unit: 1/yr
    /// default: 0.01
    pub to_wood: FloatValue,

    /// Decomposition rate of woody debris
    /// unit: 1/yr
    /// default: 0.1
    pub k_wd_lit: FloatValue,

    /// unit: yr
    /// default: 300
    pub longevity: FloatValue,

    /// Exponent of the photosynthetic decline with age
    /// default: 5.0
    pub psn_age_red: FloatValue,

    // ----- Photosynthesis -----
    /// Intercept of maximum assimilation against foliar nitrogen
    /// unit: nmol CO2/g/s
    /// default: -46.0
    pub amax_a: FloatValue,

    /// Mean daily assimilation as a fraction of instantaneous maximum
    /// default: 0.75
    pub amax_frac: FloatValue,

    /// Half saturation light level
    /// unit: umol/m2/s
    /// default: 200.0
    pub half_sat: FloatValue,

    /// Change of the half saturation light level per ppm CO2
    /// default: -0.2
    pub co2_half_sat_eff: FloatValue,

    /// Minimum monthly temperature needed for leaf-on
    /// unit: degC
    /// default: 2.0
    pub leaf_on_min_t: FloatValue,

    // ----- Water stress (pressure heads, m) -----
    /// Wettest pressure head at which photosynthesis is possible
    /// default: 0.0
    pub h1: FloatValue,
    /// Lower bound of optimal pressure heads
    /// default: 1.0
    pub h2: FloatValue,
    /// Upper bound of optimal pressure heads
    /// default: 90.0
    pub h3: FloatValue,
    /// Wilting pressure head
    /// default: 150.0
    pub h4: FloatValue,

    // ----- Defoliation -----
    /// Defoliation proportion above which the cohort refoliates
    /// default: 0.5
    pub refoliation_minimum_trigger: FloatValue,

    /// Fraction of target foliage restored by refoliation
    /// default: 1.0
    pub refoliation_maximum: FloatValue,

    /// Fraction of target foliage charged to NSC when refoliating
    /// default: 0.5
    pub refoliation_cost: FloatValue,

    /// Fraction of target foliage charged to NSC when not refoliating
    /// default: 0.1
    pub non_refoliation_cost: FloatValue,

    // ----- Ozone -----
    /// Stomatal response class to cumulative ozone
    /// default: Intermediate
    pub o3_stomata_sens: Option<OzoneSensitivity>,

    /// Scaling of the ozone damage increment
    /// default: 1.0
    pub o3_growth_sens: FloatValue,

    /// default: Deciduous
    pub lifeform: Option<Lifeform>,
}

impl Default for SpeciesParameters {
    fn default() -> Self {
        Self {
            name: "acersacc".to_string(),

            // Foliage
            frac_fol: 0.02,
            max_frac_fol: 0.04,
            frac_fol_shape: 1.0,
            fol_n: 1.6,
            max_fol_n: 2.4,
            fol_n_shape: 1.5,
            slw_max: 100.0,
            slw_del: 0.2,
            k: 0.58,
            to_fol: 1.0,
            fol_lignin: 0.2,
            max_lai: 8.0,

            // Biomass and carbon
            frac_below_g: 0.33,
            c_frac_biomass: 0.45,
            dnsc: 0.05,
            initial_nsc: 7.0,
            fr_act_wd: 0.00002,
            nsc_reserve: 0.05,
            to_root: 0.02,
            to_wood: 0.01,
            k_wd_lit: 0.1,
            longevity: 300.0,
            psn_age_red: 5.0,

            // Photosynthesis
            amax_a: -46.0,
            amax_frac: 0.75,
            half_sat: 200.0,
            co2_half_sat_eff: -0.2,
            leaf_on_min_t: 2.0,

            // Water stress
            h1: 0.0,
            h2: 1.0,
            h3: 90.0,
            h4: 150.0,

            // Defoliation
            refoliation_minimum_trigger: 0.5,
            refoliation_maximum: 1.0,
            refoliation_cost: 0.5,
            non_refoliation_cost: 0.1,

            // Ozone
            o3_stomata_sens: Some(OzoneSensitivity::Intermediate),
            o3_growth_sens: 1.0,

            lifeform: Some(Lifeform::Deciduous),
        }
    }
}

impl SpeciesParameters {
    /// Biomass a cohort must keep to stay alive after its first year.
    ///
    /// Equal to the biomass whose target NSC concentration holds the initial NSC.
    pub fn initial_biomass(&self) -> FloatValue {
        self.initial_nsc / (self.dnsc * self.c_frac_biomass)
    }

    /// Stomatal class for cohorts exposed to ozone.
    pub fn ozone_sensitivity(&self) -> RSFCResult<OzoneSensitivity> {
        self.o3_stomata_sens
            .ok_or_else(|| RSFCError::UnknownOzoneSensitivity {
                species: self.name.clone(),
            })
    }

    pub fn validate(&self) -> RSFCResult<()> {
        check_range("FracFol", self.frac_fol, 0.0, 1.0)?;
        check_range("MaxFracFol", self.max_frac_fol, self.frac_fol, 1.0)?;
        check_range("MaxFolN", self.max_fol_n, self.fol_n, FloatValue::INFINITY)?;
        check_range("FracBelowG", self.frac_below_g, 0.0, 0.999)?;
        check_range("CFracBiomass", self.c_frac_biomass, 1e-6, 1.0)?;
        check_range("DNSC", self.dnsc, 1e-6, 1.0)?;
        check_range("SLWmax", self.slw_max, 1e-6, FloatValue::INFINITY)?;
        check_range("HalfSat", self.half_sat, 1e-6, FloatValue::INFINITY)?;
        check_range("Longevity", self.longevity, 1.0, FloatValue::INFINITY)?;
        check_range("TOfol", self.to_fol, 0.0, 1.0)?;
        check_range("TOroot", self.to_root, 0.0, 1.0)?;
        check_range("TOwood", self.to_wood, 0.0, 1.0)?;
        check_range("NSCReserve", self.nsc_reserve, 0.0, 1.0)?;
        check_range("H4", self.h4, self.h3, FloatValue::INFINITY)?;
        check_range("MaxLAI", self.max_lai, 1e-6, FloatValue::INFINITY)?;
        Ok(())
    }
}
