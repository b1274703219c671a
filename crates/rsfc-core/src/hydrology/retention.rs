//! Soil water retention curves
//!
//! A retention curve relates volumetric water content to the pressure head the
//! roots have to overcome. Curves are looked up by soil type through a
//! [`PressureHeadTable`] and are serialised with `typetag` so a table can be read
//! from a parameter file.

use crate::constants::KPA_PER_METER_H2O;
use crate::errors::{RSFCError, RSFCResult};
use crate::types::FloatValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;

/// Water contents below this are treated as this value when computing pressure heads
const MIN_WATER_CONTENT: FloatValue = 1.0e-4;

/// Relationship between soil water content and pressure head for one soil type.
#[typetag::serde(tag = "type")]
pub trait SoilWaterRetention: Debug + Send + Sync {
    /// Pressure head (m H2O) at a volumetric water content (m3/m3).
    ///
    /// Larger values mean drier soil.
    fn pressure_head(&self, water: FloatValue) -> FloatValue;

    /// Volumetric water content (m3/m3) at a soil water potential (kPa).
    fn water_content(&self, pressure_kpa: FloatValue) -> FloatValue;
}

/// Campbell (1974) power-law retention curve.
///
/// $$\psi = \psi_e (\theta / \theta_s)^{-b}$$
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampbellRetention {
    /// Air-entry potential
    /// unit: kPa
    pub air_entry: FloatValue,
    /// Saturated water content
    /// unit: m3/m3
    pub saturation: FloatValue,
    /// Pore-size distribution exponent
    pub b: FloatValue,
}

impl CampbellRetention {
    pub fn new(air_entry: FloatValue, saturation: FloatValue, b: FloatValue) -> Self {
        Self {
            air_entry,
            saturation,
            b,
        }
    }

    /// Soil water potential (kPa) at a volumetric water content.
    pub fn potential(&self, water: FloatValue) -> FloatValue {
        let relative = (water.max(MIN_WATER_CONTENT) / self.saturation).min(1.0);
        self.air_entry * relative.powf(-self.b)
    }
}

#[typetag::serde(name = "campbell")]
impl SoilWaterRetention for CampbellRetention {
    fn pressure_head(&self, water: FloatValue) -> FloatValue {
        self.potential(water) / KPA_PER_METER_H2O
    }

    fn water_content(&self, pressure_kpa: FloatValue) -> FloatValue {
        if pressure_kpa <= self.air_entry {
            return self.saturation;
        }
        self.saturation * (pressure_kpa / self.air_entry).powf(-1.0 / self.b)
    }
}

/// Retention curve given as measured (water content, pressure head) pairs.
///
/// Values between points are linearly interpolated; outside the table the end
/// points are used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TabulatedPoints")]
pub struct TabulatedRetention {
    /// Pairs of water content (m3/m3) and pressure head (m), sorted by water content
    points: Vec<(FloatValue, FloatValue)>,
}

/// Unchecked serialised form of [`TabulatedRetention`]
#[derive(Deserialize)]
struct TabulatedPoints {
    points: Vec<(FloatValue, FloatValue)>,
}

impl TryFrom<TabulatedPoints> for TabulatedRetention {
    type Error = RSFCError;

    fn try_from(value: TabulatedPoints) -> RSFCResult<Self> {
        Self::new(value.points)
    }
}

impl TabulatedRetention {
    pub fn new(mut points: Vec<(FloatValue, FloatValue)>) -> RSFCResult<Self> {
        if points.len() < 2 {
            return Err(RSFCError::Error(
                "A tabulated retention curve needs at least two points".to_string(),
            ));
        }
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        if points.windows(2).any(|w| w[1].1 > w[0].1) {
            return Err(RSFCError::Error(
                "Pressure head must not increase with water content".to_string(),
            ));
        }
        Ok(Self { points })
    }

    /// Driest and wettest points of the table
    fn end_points(&self) -> Option<((FloatValue, FloatValue), (FloatValue, FloatValue))> {
        Some((*self.points.first()?, *self.points.last()?))
    }
}

fn interpolate(
    x: FloatValue,
    (x0, y0): (FloatValue, FloatValue),
    (x1, y1): (FloatValue, FloatValue),
) -> FloatValue {
    if x1 == x0 {
        return y0;
    }
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

#[typetag::serde(name = "tabulated")]
impl SoilWaterRetention for TabulatedRetention {
    fn pressure_head(&self, water: FloatValue) -> FloatValue {
        let Some((first, last)) = self.end_points() else {
            return 0.0;
        };
        if water <= first.0 {
            return first.1;
        }
        if water >= last.0 {
            return last.1;
        }
        self.points
            .windows(2)
            .find(|w| water <= w[1].0)
            .map(|w| interpolate(water, w[0], w[1]))
            .unwrap_or(last.1)
    }

    fn water_content(&self, pressure_kpa: FloatValue) -> FloatValue {
        let head = pressure_kpa / KPA_PER_METER_H2O;
        let Some((first, last)) = self.end_points() else {
            return 0.0;
        };
        if head >= first.1 {
            return first.0;
        }
        if head <= last.1 {
            return last.0;
        }
        self.points
            .windows(2)
            .find(|w| head >= w[1].1)
            .map(|w| interpolate(head, (w[0].1, w[0].0), (w[1].1, w[1].0)))
            .unwrap_or(last.0)
    }
}

/// Retention curves keyed by soil type.
#[derive(Debug, Serialize, Deserialize)]
pub struct PressureHeadTable {
    curves: HashMap<String, Box<dyn SoilWaterRetention>>,
}

impl PressureHeadTable {
    pub fn empty() -> Self {
        Self {
            curves: HashMap::new(),
        }
    }

    pub fn insert(&mut self, soil_type: &str, curve: Box<dyn SoilWaterRetention>) {
        self.curves.insert(soil_type.to_string(), curve);
    }

    pub fn curve(&self, soil_type: &str) -> RSFCResult<&dyn SoilWaterRetention> {
        self.curves
            .get(soil_type)
            .map(|c| c.as_ref())
            .ok_or_else(|| RSFCError::UnknownSoilType(soil_type.to_string()))
    }

    /// Pressure head (m) of `soil_type` at volumetric water content `water`.
    pub fn pressure_head(&self, water: FloatValue, soil_type: &str) -> RSFCResult<FloatValue> {
        Ok(self.curve(soil_type)?.pressure_head(water))
    }

    /// Water content of `soil_type` at soil water potential `pressure_kpa`.
    pub fn water_content(&self, pressure_kpa: FloatValue, soil_type: &str) -> RSFCResult<FloatValue> {
        Ok(self.curve(soil_type)?.water_content(pressure_kpa))
    }

    pub fn soil_types(&self) -> impl Iterator<Item = &str> {
        self.curves.keys().map(|k| k.as_str())
    }
}

impl Default for PressureHeadTable {
    /// Campbell curves for the common texture classes (Clapp and Hornberger, 1978).
    fn default() -> Self {
        let mut table = Self::empty();
        let classes = [
            ("SAND", 1.19, 0.395, 4.05),
            ("LOSA", 0.88, 0.410, 4.38),
            ("SALO", 2.14, 0.435, 4.90),
            ("SILO", 7.71, 0.485, 5.30),
            ("LOAM", 4.69, 0.451, 5.39),
            ("CLLO", 6.18, 0.476, 8.52),
            ("CLAY", 3.97, 0.482, 11.4),
        ];
        for (name, air_entry, saturation, b) in classes {
            table.insert(
                name,
                Box::new(CampbellRetention::new(air_entry, saturation, b)),
            );
        }
        table
    }
}
