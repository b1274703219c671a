//! Cohort death notifications
//!
//! Death is a normal end state rather than an error. When a cohort dies, or loses part
//! of its biomass to a disturbance, the site receives one of these records through
//! [`crate::site::SiteCollaborator`].

use crate::site::DisturbanceType;
use rsfc_core::types::FloatValue;
use serde::{Deserialize, Serialize};

/// Why a cohort died.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    /// NSC fell to or below the alive threshold
    CarbonStarvation,
    /// Foliage was killed by cold earlier in the year, leaving no reserves
    ColdKill,
    /// Structural biomass dropped below the species initiation biomass
    BelowInitiationBiomass,
    /// An external disturbance removed all biomass
    Disturbance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeathEvent {
    pub species: String,
    pub age: u16,
    pub cause: DeathCause,
    pub disturbance: Option<DisturbanceType>,
    /// Aboveground biomass at the time of death (g/m2)
    pub ag_biomass: FloatValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialDeathEvent {
    pub species: String,
    pub age: u16,
    pub disturbance: DisturbanceType,
    /// Fraction of the cohort removed
    pub fraction: FloatValue,
    /// Structural plus foliage biomass removed (g/m2)
    pub biomass_removed: FloatValue,
}
