//! Canopy sublayer photosynthesis and water use
//!
//! The canopy of a cohort is split into `N` sublayers of equal foliage mass. Each
//! month the host calls [`Cohort::begin_month`] and then
//! [`Cohort::calculate_photosynthesis`] once per sublayer, top to bottom. Each call:
//!
//! 1. Sets the sublayer's leaf area from current foliage
//! 2. Routes snowmelt and precipitation into the soil water ledger
//! 3. Charges maintenance respiration against NSC
//! 4. Runs the annual step (last sublayer of the final month) and the phenology step
//!    (first sublayer)
//! 5. Attenuates light through the leaf area above the sublayer
//! 6. Evaluates the water response from soil pressure head
//! 7. Adjusts foliar nitrogen and the internal CO2 modifier for ozone
//! 8. While leaf-on, computes gross photosynthesis, transpiration (capped by water
//!    above the wilting point), foliar respiration and ozone damage, and adds net
//!    photosynthesis to NSC
//!
//! Water-use efficiency and transpiration follow Kubiske's revision of PnET, with
//! the CO2 flux term in mol/m2/s.

use super::{Cohort, SublayerBuffers};
use crate::physiology::{
    adjusted_half_sat, calculate_lai, co2_assimilation_delta, compute_frad, compute_fwater,
    compute_ozone_effect, stomatal_modifier, NO_THRESHOLD,
};
use crate::site::SiteCollaborator;
use rsfc_core::climate::{MonthlyClimate, SpeciesClimate};
use rsfc_core::config::ModelConfig;
use rsfc_core::constants::{
    ATMOSPHERIC_PRESSURE, BILLION, GAS_CONSTANT, JCO2_UNIT_CONVERSION, KELVIN_OFFSET,
    KPA_PER_METER_H2O, MC, MILLION, SECONDS_PER_DAY, TRANSPIRATION_CONVERSION,
};
use rsfc_core::ecoregion::EcoregionParameters;
use rsfc_core::errors::{RSFCError, RSFCResult};
use rsfc_core::hydrology::WaterLedger;
use rsfc_core::types::FloatValue;

/// Drivers of one sublayer step.
///
/// Built with [`SublayerInputs::new`] and adjusted with the `with_*` methods. The
/// defaults describe a dry, ozone-free, unfrozen month with full top-of-canopy light.
#[derive(Debug, Clone, Copy)]
pub struct SublayerInputs<'a> {
    pub climate: &'a MonthlyClimate,
    pub ecoregion: &'a EcoregionParameters,
    pub config: &'a ModelConfig,

    /// Precipitation reaching the cohort's canopy layer, per event
    /// unit: mm
    pub precip_in: FloatValue,
    /// Number of precipitation events routed during this sublayer step
    pub precip_count: u32,
    /// Snowmelt reaching the cohort's canopy layer
    /// unit: mm
    pub melt_in: FloatValue,
    /// Fraction of water above field capacity lost to fast leakage
    pub leakage_frac: FloatValue,
    /// PAR at the top of the cohort's canopy layer
    /// unit: umol/m2/s
    pub main_layer_par: FloatValue,
    /// Cumulative ozone dose of the growing season
    /// unit: ppm h
    pub o3_cum: FloatValue,
    /// Ozone dose of the month
    /// unit: ppm h
    pub o3_month: FloatValue,
    /// 1-based position of this sublayer within the whole site canopy
    pub sub_canopy_index: usize,
    /// Number of sublayers in the whole site canopy
    pub layer_count: usize,
    /// Unfrozen proportion of the rooting zone
    pub frost_free_prop: FloatValue,
    /// Temperature fell below the cohort's cold tolerance this month
    pub cold_kill: bool,
    /// The simulation is spinning up
    pub spinup: bool,
}

impl<'a> SublayerInputs<'a> {
    pub fn new(
        climate: &'a MonthlyClimate,
        ecoregion: &'a EcoregionParameters,
        config: &'a ModelConfig,
    ) -> Self {
        Self {
            climate,
            ecoregion,
            config,
            precip_in: 0.0,
            precip_count: 0,
            melt_in: 0.0,
            leakage_frac: ecoregion.leakage_frac,
            main_layer_par: climate.par0,
            o3_cum: 0.0,
            o3_month: 0.0,
            sub_canopy_index: 0,
            layer_count: 0,
            frost_free_prop: 1.0,
            cold_kill: false,
            spinup: false,
        }
    }

    pub fn with_precipitation(mut self, per_event: FloatValue, events: u32) -> Self {
        self.precip_in = per_event;
        self.precip_count = events;
        self
    }

    pub fn with_melt(mut self, melt: FloatValue) -> Self {
        self.melt_in = melt;
        self
    }

    pub fn with_leakage_frac(mut self, leakage_frac: FloatValue) -> Self {
        self.leakage_frac = leakage_frac;
        self
    }

    pub fn with_main_layer_par(mut self, par: FloatValue) -> Self {
        self.main_layer_par = par;
        self
    }

    pub fn with_ozone(mut self, o3_cum: FloatValue, o3_month: FloatValue) -> Self {
        self.o3_cum = o3_cum;
        self.o3_month = o3_month;
        self
    }

    pub fn with_canopy_position(mut self, sub_canopy_index: usize, layer_count: usize) -> Self {
        self.sub_canopy_index = sub_canopy_index;
        self.layer_count = layer_count;
        self
    }

    pub fn with_frost_free_prop(mut self, frost_free_prop: FloatValue) -> Self {
        self.frost_free_prop = frost_free_prop;
        self
    }

    pub fn with_cold_kill(mut self, cold_kill: bool) -> Self {
        self.cold_kill = cold_kill;
        self
    }

    pub fn with_spinup(mut self, spinup: bool) -> Self {
        self.spinup = spinup;
        self
    }

    /// Soil depth taking part in the water balance (mm)
    fn active_depth(&self) -> FloatValue {
        self.ecoregion.rooting_depth * self.frost_free_prop
    }
}

/// Apply a checked change to the ledger.
fn add_water(
    ledger: &mut dyn WaterLedger,
    amount: FloatValue,
    active_depth: FloatValue,
    operation: &str,
) -> RSFCResult<()> {
    if ledger.add_water(amount, active_depth) {
        return Ok(());
    }
    Err(RSFCError::WaterBalance {
        operation: operation.to_string(),
        amount,
        active_depth,
        water: ledger.water(),
    })
}

/// Instantaneous runoff of an input above porosity, part of it captured as surface
/// water. Returns the amount left to infiltrate.
fn runoff(inputs: &SublayerInputs<'_>, ledger: &mut dyn WaterLedger, input: FloatValue) -> FloatValue {
    let eco = inputs.ecoregion;
    let depth = inputs.active_depth();
    let capacity = eco.porosity * depth;
    let runoff = input.min((ledger.water() * depth + input - capacity).max(0.0));

    let mut captured = 0.0;
    if eco.runoff_capture > 0.0 && runoff > 0.0 {
        captured = runoff.min(eco.runoff_capture - ledger.surface_water()).max(0.0);
        ledger.add_surface_water(captured);
    }
    ledger.add_runoff(runoff - captured);
    input - runoff
}

/// Drain water above field capacity.
fn leak(inputs: &SublayerInputs<'_>, ledger: &mut dyn WaterLedger) -> RSFCResult<()> {
    let depth = inputs.active_depth();
    let leakage = (inputs.leakage_frac * (ledger.water() - inputs.ecoregion.field_cap)).max(0.0) * depth;
    ledger.add_leakage(leakage);
    add_water(ledger, -leakage, depth, "removing leakage")
}

/// Return surface water to the soil as far as porosity allows.
fn infiltrate_surface_water(
    inputs: &SublayerInputs<'_>,
    ledger: &mut dyn WaterLedger,
) -> RSFCResult<()> {
    if ledger.surface_water() <= 0.0 {
        return Ok(());
    }
    let depth = inputs.active_depth();
    let room = ((inputs.ecoregion.porosity - ledger.water()) * depth).max(0.0);
    let input = ledger.surface_water().min(room);
    ledger.add_surface_water(-input);
    add_water(ledger, input, depth, "returning surface water")
}

/// Route snowmelt and precipitation events through the ledger.
///
/// Leakage only follows incoming water.
fn route_water(inputs: &SublayerInputs<'_>, ledger: &mut dyn WaterLedger) -> RSFCResult<()> {
    let depth = inputs.active_depth();

    if inputs.melt_in > 0.0 {
        let infiltration = runoff(inputs, ledger, inputs.melt_in);
        add_water(ledger, infiltration, depth, "adding snowmelt")?;
    }

    if inputs.precip_in > 0.0 {
        for _ in 0..inputs.precip_count {
            let infiltration = runoff(inputs, ledger, inputs.precip_in);
            add_water(ledger, infiltration, depth, "adding precipitation")?;
            leak(inputs, ledger)?;
            infiltrate_surface_water(inputs, ledger)?;
        }
    } else if inputs.melt_in > 0.0 {
        leak(inputs, ledger)?;
        infiltrate_surface_water(inputs, ledger)?;
    }
    Ok(())
}

/// Gas exchange results of an active sublayer.
struct GasExchange {
    gross_psn: FloatValue,
    fol_resp: FloatValue,
    net_psn: FloatValue,
    transpiration: FloatValue,
    potential_transpiration: FloatValue,
    fwater: FloatValue,
    fozone: FloatValue,
    del_amax: FloatValue,
}

impl Cohort {
    /// Prepare the sublayer buffers and rewind the sublayer cursor.
    pub fn begin_month(&mut self) {
        let n = self.sublayer_count;
        match &mut self.data.sublayers {
            Some(buffers) if buffers.len() == n => buffers.reset(),
            _ => self.data.sublayers = Some(SublayerBuffers::new(n)),
        }
        self.index = 0;
    }

    /// Release the sublayer buffers of an inactive cohort.
    pub fn null_sublayers(&mut self) {
        self.data.sublayers = None;
        self.index = 0;
    }

    /// Process all sublayers of one month.
    ///
    /// `inputs` carries the precipitation of a single sublayer step. The month is closed
    /// with [`Cohort::complete_month`].
    pub fn grow_month(
        &mut self,
        inputs: &SublayerInputs<'_>,
        ozone_effect: &mut FloatValue,
        ledger: &mut dyn WaterLedger,
        site: &mut dyn SiteCollaborator,
    ) -> RSFCResult<()> {
        self.begin_month();
        for _ in 0..self.sublayer_count {
            self.calculate_photosynthesis(inputs, ozone_effect, ledger, site)?;
        }
        self.complete_month(inputs.climate);
        Ok(())
    }

    /// Process the sublayer under the cursor and advance it.
    ///
    /// `ozone_effect` carries cumulative ozone damage from the sublayer above; it is
    /// replaced with this sublayer's value, or zero while leaf-off.
    ///
    /// # Errors
    ///
    /// - [`RSFCError::WaterBalance`] if a ledger update is rejected
    /// - [`RSFCError::UnknownOzoneSensitivity`] with ozone present and no stomatal class
    /// - [`RSFCError::InvalidHalfSat`] if the CO2-adjusted half saturation is not positive
    /// - [`RSFCError::UnknownSpecies`] if the climate has no coefficients for the species
    pub fn calculate_photosynthesis(
        &mut self,
        inputs: &SublayerInputs<'_>,
        ozone_effect: &mut FloatValue,
        ledger: &mut dyn WaterLedger,
        site: &mut dyn SiteCollaborator,
    ) -> RSFCResult<()> {
        let n = self.sublayer_count;
        let index = self.index;
        if index >= n {
            return Err(RSFCError::Error(format!(
                "All {} sublayers of {} have been processed this month",
                n, self.species.name
            )));
        }
        if self.data.sublayers.as_ref().map(|b| b.len()) != Some(n) {
            self.data.sublayers = Some(SublayerBuffers::new(n));
        }

        let climate = inputs.climate;
        let vars = climate.species_variables(&self.species.name)?;
        let last_effect = *ozone_effect;
        *ozone_effect = 0.0;

        self.update_sublayer_lai(index);
        route_water(inputs, ledger)?;

        let c_frac = self.species.c_frac_biomass;
        let maintenance = self
            .data
            .nsc
            .min(vars.maint_resp_ftemp_resp * self.data.total_biomass * c_frac)
            / n as FloatValue;
        self.data.nsc = (self.data.nsc - maintenance).max(0.0);

        if index == n - 1 && climate.month.is_final() {
            self.annual_step(inputs.config.allow_mortality, inputs.spinup, site);
        }
        if index == 0 {
            self.phenology_step(inputs, site);
        }
        let lai = self.update_sublayer_lai(index);

        let species = &self.species;
        self.data.adj_half_sat =
            adjusted_half_sat(species.half_sat, species.co2_half_sat_eff, climate.co2);
        let lai_above = self.lai_above(index);
        let layer_par = inputs.main_layer_par * (-species.k * lai_above).exp();
        let frad = compute_frad(layer_par, self.data.adj_half_sat)?;

        let soil = inputs.ecoregion.soil_type.as_str();
        let pressure_head = ledger.pressure_head(soil)?;
        let water = ledger.water();
        let with_wet_thresholds = !inputs.spinup || inputs.config.spinup_water_stress;
        let (mut fwater, mut fwater_ozone) = {
            let dry_only = compute_fwater(NO_THRESHOLD, NO_THRESHOLD, species.h3, species.h4, pressure_head);
            if with_wet_thresholds {
                (
                    compute_fwater(species.h1, species.h2, species.h3, species.h4, pressure_head),
                    dry_only,
                )
            } else {
                (dry_only, dry_only)
            }
        };
        if inputs.frost_free_prop <= 0.0 {
            fwater = 0.0;
            fwater_ozone = 0.0;
        }

        self.data.adj_fol_n = species.fol_n
            + (species.max_fol_n - species.fol_n) * frad.powf(species.fol_n_shape);
        let ci_modifier = stomatal_modifier(
            species.o3_stomata_sens,
            &species.name,
            fwater_ozone,
            inputs.o3_cum,
        )?;

        let exchange = if self.data.leaf_on {
            Some(self.gas_exchange(
                inputs,
                vars,
                ledger,
                frad,
                fwater,
                ci_modifier,
                lai,
                last_effect,
                ozone_effect,
            )?)
        } else {
            None
        };

        let adj_fol_n = self.data.adj_fol_n;
        let adj_frac_fol = self.data.adj_frac_fol;
        if let Some(exchange) = &exchange {
            self.data.nsc = (self.data.nsc + exchange.net_psn).max(0.0);
        }

        let Some(buffers) = self.data.sublayers.as_mut() else {
            return Err(RSFCError::Error("Sublayer buffers were released mid-month".to_string()));
        };
        buffers.maintenance_respiration[index] = maintenance;
        buffers.frad[index] = frad;
        buffers.water[index] = water;
        buffers.press_head[index] = pressure_head;
        buffers.num_events[index] = inputs.precip_count;
        buffers.adj_fol_n[index] = adj_fol_n;
        buffers.adj_frac_fol[index] = adj_frac_fol;
        buffers.ci_modifier[index] = ci_modifier;
        match exchange {
            Some(exchange) => {
                buffers.gross_psn[index] = exchange.gross_psn;
                buffers.fol_resp[index] = exchange.fol_resp;
                buffers.net_psn[index] = exchange.net_psn;
                buffers.transpiration[index] = exchange.transpiration;
                buffers.potential_transpiration[index] = exchange.potential_transpiration;
                buffers.fwater[index] = exchange.fwater;
                buffers.fozone[index] = exchange.fozone;
                buffers.del_amax[index] = exchange.del_amax;
            }
            None => {
                buffers.gross_psn[index] = 0.0;
                buffers.fol_resp[index] = 0.0;
                buffers.net_psn[index] = 0.0;
                buffers.transpiration[index] = 0.0;
                buffers.potential_transpiration[index] = 0.0;
                buffers.fwater[index] = fwater;
                buffers.fozone[index] = 1.0;
            }
        }

        self.index += 1;
        Ok(())
    }

    /// Leaf area of the sublayers above `index` this month.
    fn lai_above(&self, index: usize) -> FloatValue {
        self.data
            .sublayers
            .as_ref()
            .map(|b| b.lai[..index].iter().sum())
            .unwrap_or(0.0)
    }

    fn update_sublayer_lai(&mut self, index: usize) -> FloatValue {
        let above = self.lai_above(index);
        let lai = calculate_lai(&self.species, self.data.fol, index, self.sublayer_count, above);
        if let Some(buffers) = self.data.sublayers.as_mut() {
            buffers.lai[index] = lai;
        }
        lai
    }

    /// Photosynthesis, transpiration and respiration of a leaf-on sublayer.
    #[allow(clippy::too_many_arguments)]
    fn gas_exchange(
        &self,
        inputs: &SublayerInputs<'_>,
        vars: &SpeciesClimate,
        ledger: &mut dyn WaterLedger,
        frad: FloatValue,
        fwater: FloatValue,
        ci_modifier: FloatValue,
        lai: FloatValue,
        last_effect: FloatValue,
        ozone_effect: &mut FloatValue,
    ) -> RSFCResult<GasExchange> {
        let species = &self.species;
        let climate = inputs.climate;
        let n = self.sublayer_count as FloatValue;
        let fol = self.data.fol;
        let adj_fol_n = self.data.adj_fol_n;
        let canopy_prop = self.data.canopy_layer_prop;

        // Internal CO2
        let cica_ratio = -0.075 * adj_fol_n + 0.875;
        let ci_elev = climate.co2 * cica_ratio * ci_modifier;
        let ca_ci = climate.co2 - ci_elev;
        let del_amax = co2_assimilation_delta(ci_elev);

        // Water-use efficiency
        let molar_volume = GAS_CONSTANT * (climate.tmin + KELVIN_OFFSET) / ATMOSPHERIC_PRESSURE;
        let jco2 = 0.139 * (ca_ci / molar_volume) * JCO2_UNIT_CONVERSION;
        let jh2o = vars.jh2o / ci_modifier;
        let flux_ratio = jco2 / jh2o;

        // Assimilation capacity (nmol CO2/g/s)
        let amax = del_amax * (species.amax_a + vars.amax_b_co2 * adj_fol_n);
        let base_fol_resp = vars.base_fol_resp_frac * amax;
        let gross_amax = amax * species.amax_frac + base_fol_resp;

        // gC/g foliage/month
        let ref_gross_psn =
            climate.day_span * (gross_amax * vars.dvpd * climate.daylength * MC) / BILLION;
        let gross_potential = vars.ftemp_psn * frad * self.fage() * ref_gross_psn * fol / n;

        let potential_transpiration = if flux_ratio > 0.0 && flux_ratio.is_finite() {
            (TRANSPIRATION_CONVERSION * gross_potential / flux_ratio * canopy_prop).max(0.0)
        } else {
            0.0
        };

        let soil = inputs.ecoregion.soil_type.as_str();
        let wilt_water = ledger.water_content_at(species.h4 * KPA_PER_METER_H2O, soil)?;
        let available = ((ledger.water() - wilt_water) * inputs.active_depth()).max(0.0);

        // No uptake at or below the wilting point
        let scale = if available <= 0.0 {
            0.0
        } else if potential_transpiration > 0.0 {
            fwater.min(available / potential_transpiration)
        } else {
            fwater
        };
        let transpiration = potential_transpiration * scale;
        let gross_psn = gross_potential * scale;

        add_water(ledger, -transpiration, inputs.active_depth(), "removing transpiration")?;
        infiltrate_surface_water(inputs, ledger)?;

        // Foliar respiration runs day and night
        let ref_fol_resp =
            base_fol_resp * vars.q10_factor * climate.day_span * SECONDS_PER_DAY * MC / BILLION;
        let fol_resp = ref_fol_resp * fol / n;
        let non_ozone_net_psn = gross_psn - fol_resp;

        // Stomatal conductance to water vapour from leaf-level net photosynthesis
        let net_psn_ground =
            non_ozone_net_psn * MILLION / MC / (climate.daylength * climate.day_span);
        let net_psn_leaf = if net_psn_ground > 0.0 && lai > 0.0 {
            let per_leaf = net_psn_ground / lai;
            if per_leaf.is_finite() {
                per_leaf
            } else {
                0.0
            }
        } else {
            0.0
        };
        let conductance_mol = if ca_ci > 0.0 {
            net_psn_leaf / ca_ci * 1.6 * 1000.0
        } else {
            0.0
        };
        let conductance = conductance_mol / (444.5 - 1.3667 * climate.tave) * 10.0;

        *ozone_effect = if inputs.o3_month > 0.0 {
            compute_ozone_effect(
                inputs.o3_month,
                last_effect,
                conductance,
                fol,
                inputs.sub_canopy_index,
                inputs.layer_count,
                species.o3_growth_sens,
            )
        } else {
            0.0
        };
        let fozone = 1.0 - *ozone_effect;

        Ok(GasExchange {
            gross_psn,
            fol_resp,
            net_psn: non_ozone_net_psn * fozone,
            transpiration,
            potential_transpiration,
            fwater: scale,
            fozone,
            del_amax,
        })
    }
}
