//! Site-level soil water ledger
//!
//! Every cohort at a site draws from, and routes precipitation into, the same soil
//! water store. The [`WaterLedger`] trait is the contract the cohort engine relies on;
//! [`Hydrology`] is a single-bucket implementation of it.
//!
//! Ledger mutations report success instead of panicking. A rejected mutation means
//! the water balance is inconsistent, and the engine treats it as fatal for the
//! current timestep.
//!
//! Each ledger is borrowed mutably for the duration of a cohort step, so at most one
//! cohort at a site can be writing to it at any time. Sites are independent and may
//! be processed on separate threads.

mod retention;

pub use retention::{CampbellRetention, PressureHeadTable, SoilWaterRetention, TabulatedRetention};

use crate::errors::RSFCResult;
use crate::types::FloatValue;
use std::sync::Arc;

/// Negative water contents smaller than this in magnitude are rounding noise
const WATER_TOLERANCE: FloatValue = 1.0e-9;

/// Read/mutate contract of the shared soil water store.
pub trait WaterLedger {
    /// Volumetric water content of the rooting zone (m3/m3)
    fn water(&self) -> FloatValue;

    /// Water held in surface storage (mm)
    fn surface_water(&self) -> FloatValue;

    /// Change the surface storage by `amount` mm, never below zero.
    fn add_surface_water(&mut self, amount: FloatValue);

    /// Accumulate runoff leaving the site (mm)
    fn add_runoff(&mut self, amount: FloatValue);

    /// Accumulate leakage below the rooting zone (mm)
    fn add_leakage(&mut self, amount: FloatValue);

    /// Add `amount` mm of water spread over `active_depth` mm of soil.
    ///
    /// Negative amounts remove water. Returns `false`, leaving the ledger unchanged,
    /// if the change would leave a negative water content.
    fn add_water(&mut self, amount: FloatValue, active_depth: FloatValue) -> bool;

    /// Pressure head (m) of the current water content for `soil_type`
    fn pressure_head(&self, soil_type: &str) -> RSFCResult<FloatValue>;

    /// Water content at a soil water potential (kPa) for `soil_type`
    fn water_content_at(&self, pressure_kpa: FloatValue, soil_type: &str)
        -> RSFCResult<FloatValue>;
}

/// Single-bucket soil water store of one site.
#[derive(Debug, Clone)]
pub struct Hydrology {
    water: FloatValue,
    surface_water: FloatValue,
    runoff: FloatValue,
    leakage: FloatValue,
    retention: Arc<PressureHeadTable>,
}

impl Hydrology {
    pub fn new(water: FloatValue, retention: Arc<PressureHeadTable>) -> Self {
        Self {
            water: water.max(0.0),
            surface_water: 0.0,
            runoff: 0.0,
            leakage: 0.0,
            retention,
        }
    }

    /// Cumulative runoff since the last [`Hydrology::reset_fluxes`] (mm)
    pub fn runoff(&self) -> FloatValue {
        self.runoff
    }

    /// Cumulative leakage since the last [`Hydrology::reset_fluxes`] (mm)
    pub fn leakage(&self) -> FloatValue {
        self.leakage
    }

    /// Zero the runoff and leakage accumulators, typically at the start of a month.
    pub fn reset_fluxes(&mut self) {
        self.runoff = 0.0;
        self.leakage = 0.0;
    }
}

impl WaterLedger for Hydrology {
    fn water(&self) -> FloatValue {
        self.water
    }

    fn surface_water(&self) -> FloatValue {
        self.surface_water
    }

    fn add_surface_water(&mut self, amount: FloatValue) {
        self.surface_water = (self.surface_water + amount).max(0.0);
    }

    fn add_runoff(&mut self, amount: FloatValue) {
        self.runoff += amount;
    }

    fn add_leakage(&mut self, amount: FloatValue) {
        self.leakage += amount;
    }

    fn add_water(&mut self, amount: FloatValue, active_depth: FloatValue) -> bool {
        if !amount.is_finite() {
            return false;
        }
        if active_depth <= 0.0 {
            return self.water >= 0.0;
        }
        let updated = self.water + amount / active_depth;
        if updated < -WATER_TOLERANCE {
            return false;
        }
        self.water = updated.max(0.0);
        true
    }

    fn pressure_head(&self, soil_type: &str) -> RSFCResult<FloatValue> {
        self.retention.pressure_head(self.water, soil_type)
    }

    fn water_content_at(
        &self,
        pressure_kpa: FloatValue,
        soil_type: &str,
    ) -> RSFCResult<FloatValue> {
        self.retention.water_content(pressure_kpa, soil_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn hydrology(water: FloatValue) -> Hydrology {
        Hydrology::new(water, Arc::new(PressureHeadTable::default()))
    }

    #[test]
    fn test_add_and_remove_water() {
        let mut h = hydrology(0.2);
        assert!(h.add_water(100.0, 1000.0));
        assert_relative_eq!(h.water(), 0.3, epsilon = 1e-12);
        assert!(h.add_water(-50.0, 1000.0));
        assert_relative_eq!(h.water(), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_overdraw_is_rejected() {
        let mut h = hydrology(0.1);
        assert!(!h.add_water(-200.0, 1000.0));
        assert_relative_eq!(h.water(), 0.1, epsilon = 1e-12);
        assert!(!h.add_water(FloatValue::NAN, 1000.0));
    }

    #[test]
    fn test_zero_active_depth_is_a_no_op() {
        let mut h = hydrology(0.2);
        assert!(h.add_water(500.0, 0.0));
        assert_relative_eq!(h.water(), 0.2);
    }

    #[test]
    fn test_surface_water_never_negative() {
        let mut h = hydrology(0.2);
        h.add_surface_water(5.0);
        h.add_surface_water(-8.0);
        assert_relative_eq!(h.surface_water(), 0.0);
    }

    #[test]
    fn test_flux_accumulators() {
        let mut h = hydrology(0.2);
        h.add_runoff(3.0);
        h.add_runoff(2.0);
        h.add_leakage(1.5);
        assert_relative_eq!(h.runoff(), 5.0);
        assert_relative_eq!(h.leakage(), 1.5);
        h.reset_fluxes();
        assert_relative_eq!(h.runoff(), 0.0);
        assert_relative_eq!(h.leakage(), 0.0);
    }

    #[test]
    fn test_pressure_head_tracks_water() {
        let mut h = hydrology(0.35);
        let wet = h.pressure_head("SILO").unwrap();
        assert!(h.add_water(-150.0, 1000.0));
        let dry = h.pressure_head("SILO").unwrap();
        assert!(dry > wet);
        assert!(h.pressure_head("PEAT").is_err());
    }
}
