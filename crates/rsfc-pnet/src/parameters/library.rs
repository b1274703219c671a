//! Species parameter library
//!
//! Parameter sets are loaded from a TOML document with one table per species:
//!
//! ```toml
//! [species.acersacc]
//! frac_fol = 0.02
//! half_sat = 200.0
//!
//! [species.pinubank]
//! lifeform = "light-conifer"
//! o3_stomata_sens = "Tol"
//! ```
//!
//! Keys that are not given take the defaults of [`SpeciesParameters`]. The table key
//! becomes the species name.

use super::SpeciesParameters;
use rsfc_core::errors::{RSFCError, RSFCResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Deserialize)]
struct SpeciesFile {
    species: HashMap<String, SpeciesParameters>,
}

/// Shared, validated parameter sets keyed by species name.
#[derive(Debug, Clone, Default)]
pub struct SpeciesLibrary {
    species: HashMap<String, Arc<SpeciesParameters>>,
}

impl SpeciesLibrary {
    pub fn from_toml_str(source: &str) -> RSFCResult<Self> {
        let file: SpeciesFile = toml::from_str(source)?;
        let mut library = Self::default();
        for (name, mut parameters) in file.species {
            parameters.name = name;
            library.insert(parameters)?;
        }
        Ok(library)
    }

    /// Validate and add a parameter set, replacing any set with the same name.
    pub fn insert(&mut self, parameters: SpeciesParameters) -> RSFCResult<Arc<SpeciesParameters>> {
        parameters.validate()?;
        let parameters = Arc::new(parameters);
        self.species
            .insert(parameters.name.clone(), Arc::clone(&parameters));
        Ok(parameters)
    }

    pub fn get(&self, name: &str) -> RSFCResult<Arc<SpeciesParameters>> {
        self.species
            .get(name)
            .cloned()
            .ok_or_else(|| RSFCError::UnknownSpecies(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.species.keys().map(|k| k.as_str())
    }
}
