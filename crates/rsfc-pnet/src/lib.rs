//! Monthly cohort physiology for forest landscape models
//!
//! Each [`cohort::Cohort`] carries the carbon pools, foliage and phenology of one
//! species-age group at a site. A host steps every cohort once per canopy sublayer per
//! month, passing the site's soil-water ledger, climate drivers and a
//! [`site::SiteCollaborator`] that receives litter, woody debris and death notices.
//!
//! # Module Organisation
//!
//! - `parameters`: species parameters and the species library
//! - `physiology`: pure response functions (light, water, ozone, CO2, age, leaf area)
//! - `cohort`: the cohort state machine, photosynthesis step and monthly summaries
//! - `site`: traits a host implements for dead pools, disturbance and defoliation
//! - `events`: death and partial-death records

pub mod cohort;
pub mod events;
pub mod parameters;
pub mod physiology;
pub mod site;
