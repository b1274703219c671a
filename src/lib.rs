//! Reduced-complexity simulation of forest cohort physiology.
//!
//! This crate re-exports the workspace members:
//! - [`core`]: shared drivers, configuration, errors and the soil-water ledger
//! - [`pnet`]: the monthly cohort engine (photosynthesis, phenology, allocation)

pub use rsfc_core as core;
pub use rsfc_pnet as pnet;
