use thiserror::Error;

/// Error type for invalid operations.
#[derive(Error, Debug)]
pub enum RSFCError {
    #[error("{0}")]
    Error(String),
    #[error("Water balance violated while {operation}: change of {amount} mm over an active depth of {active_depth} mm was rejected (water content {water})")]
    WaterBalance {
        operation: String,
        amount: f64,
        active_depth: f64,
        water: f64,
    },
    #[error("Ozone stomatal sensitivity of species '{species}' is unset or unrecognized. Expected one of Sensitive, Intermediate or Tolerant")]
    UnknownOzoneSensitivity { species: String },
    #[error("Half saturation light constant must be positive, got {0}")]
    InvalidHalfSat(f64),
    #[error("No climate variables available for species '{0}'")]
    UnknownSpecies(String),
    #[error("No water retention curve registered for soil type '{0}'")]
    UnknownSoilType(String),
    #[error("Parameter {name}={value} is outside of the allowed range [{min}, {max}]")]
    ParameterOutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("Sublayer buffer '{buffer}' has length {found}, expected {expected}")]
    SublayerMismatch {
        buffer: String,
        expected: usize,
        found: usize,
    },
    #[error("Invalid month number {0}. Expected 1-12")]
    InvalidMonth(u32),
    #[error("Could not parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// Convenience type for `Result<T, RSFCError>`.
pub type RSFCResult<T> = Result<T, RSFCError>;

/// Check that `value` lies in `[min, max]`.
pub fn check_range(name: &str, value: f64, min: f64, max: f64) -> RSFCResult<()> {
    if value.is_nan() || value < min || value > max {
        return Err(RSFCError::ParameterOutOfRange {
            name: name.to_string(),
            value,
            min,
            max,
        });
    }
    Ok(())
}
