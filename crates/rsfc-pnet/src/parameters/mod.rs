//! Parameter structures for the cohort engine
//!
//! - [`SpeciesParameters`]: physiological constants of one species
//! - [`SpeciesLibrary`]: validated, shared parameter sets loaded from TOML

mod library;
mod species;

pub use library::SpeciesLibrary;
pub use species::{Lifeform, OzoneSensitivity, SpeciesParameters};
