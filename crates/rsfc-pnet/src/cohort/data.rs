//! Stored state of a cohort
//!
//! [`CohortData`] is everything that changes as a cohort lives: its carbon pools,
//! canopy placement, phenology and the per-sublayer results of the current month. It
//! serialises without loss, so a cohort rebuilt from a stored record behaves exactly
//! like the original.

use super::phenology::SeasonPhase;
use rsfc_core::errors::{RSFCError, RSFCResult};
use rsfc_core::types::FloatValue;
use serde::{Deserialize, Serialize};

/// Per-sublayer results of the current month, indexed from the top of the canopy.
///
/// All buffers have the same length. They are allocated once and zeroed at the start
/// of each month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SublayerBuffers {
    /// Leaf area index (m2/m2)
    pub lai: Vec<FloatValue>,
    /// Gross photosynthesis (gC/m2/month)
    pub gross_psn: Vec<FloatValue>,
    /// Foliar respiration (gC/m2/month)
    pub fol_resp: Vec<FloatValue>,
    /// Net photosynthesis after ozone damage (gC/m2/month)
    pub net_psn: Vec<FloatValue>,
    /// Maintenance respiration (gC/m2/month)
    pub maintenance_respiration: Vec<FloatValue>,
    /// Actual transpiration (mm/month)
    pub transpiration: Vec<FloatValue>,
    /// Transpiration without soil water limitation (mm/month)
    pub potential_transpiration: Vec<FloatValue>,
    pub frad: Vec<FloatValue>,
    pub fwater: Vec<FloatValue>,
    pub fozone: Vec<FloatValue>,
    /// Soil water content seen by the sublayer (m3/m3)
    pub water: Vec<FloatValue>,
    /// Soil pressure head seen by the sublayer (m)
    pub press_head: Vec<FloatValue>,
    /// Precipitation events routed during the sublayer step
    pub num_events: Vec<u32>,
    /// Foliar nitrogen after light adjustment (%)
    pub adj_fol_n: Vec<FloatValue>,
    pub adj_frac_fol: Vec<FloatValue>,
    pub ci_modifier: Vec<FloatValue>,
    /// CO2 assimilation delta
    pub del_amax: Vec<FloatValue>,
}

impl SublayerBuffers {
    pub fn new(sublayers: usize) -> Self {
        let zeros = vec![0.0; sublayers];
        Self {
            lai: zeros.clone(),
            gross_psn: zeros.clone(),
            fol_resp: zeros.clone(),
            net_psn: zeros.clone(),
            maintenance_respiration: zeros.clone(),
            transpiration: zeros.clone(),
            potential_transpiration: zeros.clone(),
            frad: zeros.clone(),
            fwater: zeros.clone(),
            fozone: zeros.clone(),
            water: zeros.clone(),
            press_head: zeros.clone(),
            num_events: vec![0; sublayers],
            adj_fol_n: zeros.clone(),
            adj_frac_fol: zeros.clone(),
            ci_modifier: zeros.clone(),
            del_amax: zeros,
        }
    }

    pub fn len(&self) -> usize {
        self.lai.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lai.is_empty()
    }

    /// Zero every buffer in place.
    pub fn reset(&mut self) {
        for buffer in self.float_buffers_mut() {
            buffer.fill(0.0);
        }
        self.num_events.fill(0);
    }

    /// Check that every buffer has `expected` slots.
    pub fn validate(&self, expected: usize) -> RSFCResult<()> {
        let lengths = self
            .named_float_buffers()
            .into_iter()
            .map(|(name, buffer)| (name, buffer.len()))
            .chain(std::iter::once(("num_events", self.num_events.len())));

        for (name, found) in lengths {
            if found != expected {
                return Err(RSFCError::SublayerMismatch {
                    buffer: name.to_string(),
                    expected,
                    found,
                });
            }
        }
        Ok(())
    }

    fn named_float_buffers(&self) -> [(&'static str, &Vec<FloatValue>); 16] {
        [
            ("lai", &self.lai),
            ("gross_psn", &self.gross_psn),
            ("fol_resp", &self.fol_resp),
            ("net_psn", &self.net_psn),
            ("maintenance_respiration", &self.maintenance_respiration),
            ("transpiration", &self.transpiration),
            ("potential_transpiration", &self.potential_transpiration),
            ("frad", &self.frad),
            ("fwater", &self.fwater),
            ("fozone", &self.fozone),
            ("water", &self.water),
            ("press_head", &self.press_head),
            ("adj_fol_n", &self.adj_fol_n),
            ("adj_frac_fol", &self.adj_frac_fol),
            ("ci_modifier", &self.ci_modifier),
            ("del_amax", &self.del_amax),
        ]
    }

    fn float_buffers_mut(&mut self) -> [&mut Vec<FloatValue>; 16] {
        [
            &mut self.lai,
            &mut self.gross_psn,
            &mut self.fol_resp,
            &mut self.net_psn,
            &mut self.maintenance_respiration,
            &mut self.transpiration,
            &mut self.potential_transpiration,
            &mut self.frad,
            &mut self.fwater,
            &mut self.fozone,
            &mut self.water,
            &mut self.press_head,
            &mut self.adj_fol_n,
            &mut self.adj_frac_fol,
            &mut self.ci_modifier,
            &mut self.del_amax,
        ]
    }
}

/// Mean of a buffer, zero when empty.
pub(crate) fn mean(values: &[FloatValue]) -> FloatValue {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<FloatValue>() / values.len() as FloatValue
}

/// Mutable physiological state of one cohort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortData {
    /// unit: years
    pub age: u16,

    /// Cold tolerance threshold (degC) recorded when foliage was killed by cold
    pub cold_kill: Option<i32>,

    // ----- Pools -----
    /// Non-structural carbon
    /// unit: gC/m2
    pub nsc: FloatValue,

    /// Wood and root biomass
    /// unit: gDW/m2
    pub total_biomass: FloatValue,

    /// Aboveground wood plus foliage
    /// unit: gDW/m2
    pub ag_biomass: FloatValue,

    /// Largest total biomass ever reached
    /// unit: gDW/m2
    pub biomass_max: FloatValue,

    /// unit: gDW/m2
    pub fol: FloatValue,

    /// Largest foliage mass reached this year
    /// unit: gDW/m2
    pub max_fol_year: FloatValue,

    /// Aboveground net primary production
    /// unit: g/m2
    pub anpp: FloatValue,

    // ----- Canopy placement -----
    pub layer: u8,
    /// Proportion of the canopy layer occupied by this cohort
    pub canopy_layer_prop: FloatValue,
    /// Proportion of growing space available to this cohort
    pub canopy_growing_space: FloatValue,
    pub biomass_layer_prop: FloatValue,
    pub last_lai: FloatValue,
    pub last_ag_bio: FloatValue,

    // ----- Phenology -----
    pub leaf_on: bool,
    pub phase: SeasonPhase,
    /// Set until the first seasonal light history is available
    pub first_year: bool,
    /// Proportion of foliage removed by defoliators this year
    pub defol_prop: FloatValue,
    pub last_woody_senescence: FloatValue,
    pub last_foliage_senescence: FloatValue,
    /// Mean light response of the last leaf-on month
    pub last_frad: FloatValue,
    /// Monthly mean light responses of the current growing season
    pub last_season_frad: Vec<FloatValue>,
    pub adj_frac_fol: FloatValue,
    pub adj_fol_n: FloatValue,
    pub adj_half_sat: FloatValue,

    /// Results of the current month, `None` while the cohort is inactive
    pub sublayers: Option<SublayerBuffers>,
}

impl Default for CohortData {
    fn default() -> Self {
        Self {
            age: 0,
            cold_kill: None,
            nsc: 0.0,
            total_biomass: 0.0,
            ag_biomass: 0.0,
            biomass_max: 0.0,
            fol: 0.0,
            max_fol_year: 0.0,
            anpp: 0.0,
            layer: 0,
            canopy_layer_prop: 1.0,
            canopy_growing_space: 1.0,
            biomass_layer_prop: 1.0,
            last_lai: 0.0,
            last_ag_bio: 0.0,
            leaf_on: false,
            phase: SeasonPhase::Dormant,
            first_year: false,
            defol_prop: 0.0,
            last_woody_senescence: 0.0,
            last_foliage_senescence: 0.0,
            last_frad: 0.0,
            last_season_frad: Vec::new(),
            adj_frac_fol: 0.0,
            adj_fol_n: 0.0,
            adj_half_sat: 0.0,
            sublayers: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffers_are_zeroed() {
        let buffers = SublayerBuffers::new(4);
        assert_eq!(buffers.len(), 4);
        assert!(buffers.validate(4).is_ok());
        assert!(buffers.gross_psn.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_reset_keeps_length() {
        let mut buffers = SublayerBuffers::new(3);
        buffers.net_psn[1] = 5.0;
        buffers.num_events[2] = 4;
        buffers.reset();
        assert_eq!(buffers.len(), 3);
        assert_eq!(buffers.net_psn[1], 0.0);
        assert_eq!(buffers.num_events[2], 0);
    }

    #[test]
    fn test_validate_detects_mismatch() {
        let mut buffers = SublayerBuffers::new(3);
        buffers.fozone.push(1.0);
        match buffers.validate(3) {
            Err(RSFCError::SublayerMismatch { buffer, found, .. }) => {
                assert_eq!(buffer, "fozone");
                assert_eq!(found, 4);
            }
            other => panic!("Expected a length mismatch, got {:?}", other),
        }

        let mut buffers = SublayerBuffers::new(3);
        buffers.num_events.pop();
        assert!(buffers.validate(3).is_err());
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), 0.0);
        assert!((mean(&[1.0, 2.0, 3.0]) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_serde_roundtrip() {
        let data = CohortData {
            age: 12,
            cold_kill: Some(-31),
            nsc: 42.5,
            total_biomass: 8000.25,
            fol: 310.0,
            last_season_frad: vec![0.61, 0.72],
            sublayers: Some(SublayerBuffers::new(5)),
            ..Default::default()
        };
        let json = serde_json::to_string(&data).unwrap();
        let parsed: CohortData = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, data);
    }
}
