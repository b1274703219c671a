//! Scalar and calendar types shared across the workspace

use crate::errors::{RSFCError, RSFCResult};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type FloatValue = f64;

/// Calendar month of a monthly timestep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    /// Month from its 1-based number.
    pub fn from_number(number: u32) -> RSFCResult<Self> {
        match number {
            1..=12 => Ok(Self::ALL[(number - 1) as usize]),
            _ => Err(RSFCError::InvalidMonth(number)),
        }
    }

    /// 1-based month number.
    pub fn number(self) -> u32 {
        self as u32 + 1
    }

    /// The last month of the year, in which annual allocation and ageing happen.
    pub fn is_final(self) -> bool {
        self == Month::December
    }

    /// The following month, wrapping from December to January.
    pub fn next(self) -> Self {
        Self::ALL[(self as usize + 1) % 12]
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_numbering() {
        assert_eq!(Month::January.number(), 1);
        assert_eq!(Month::December.number(), 12);
        assert_eq!(Month::from_number(7).unwrap(), Month::July);
        assert!(Month::from_number(0).is_err());
        assert!(Month::from_number(13).is_err());
    }

    #[test]
    fn test_month_wraps() {
        assert_eq!(Month::December.next(), Month::January);
        assert_eq!(Month::March.next(), Month::April);
        assert!(Month::December.is_final());
        assert!(!Month::November.is_final());
    }
}
