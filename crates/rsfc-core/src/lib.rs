//! Core types and shared drivers for forest cohort physiology models
//!
//! This crate holds everything a cohort engine reads from, or writes to, outside of
//! the cohort itself.
//!
//! # Module Organisation
//!
//! - `types`: scalar alias and calendar month
//! - `constants`: physical and unit-conversion constants shared by the engines
//! - `errors`: the crate-wide error type
//! - `config`: run-level switches loaded from TOML
//! - `climate`: per-month climate drivers and species-specific derived coefficients
//! - `ecoregion`: soil and site parameters of an ecoregion
//! - `hydrology`: the site-level soil-water ledger and water retention curves

pub mod climate;
pub mod config;
pub mod constants;
pub mod ecoregion;
pub mod errors;
pub mod hydrology;
pub mod types;
