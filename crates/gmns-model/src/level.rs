//! Readiness levels.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Cumulative readiness tier. Level N includes every check of levels below N.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum ReadinessLevel {
    /// Node/link structure: required fields, types, ids, forward-star order.
    Structural = 1,
    /// Zone centroids, connectors and demand consistency.
    DemandZone = 2,
    /// VDF parameters, unit conversions and capacity.
    NetworkAttributes = 3,
    /// mode_type.csv and settings.csv.
    Configuration = 4,
    /// Observed volumes and ODME inputs.
    OdmeReadiness = 5,
    /// Engine run plus OD connectivity.
    Accessibility = 6,
    /// Link performance, route assignment and volume fit.
    AssignmentFit = 7,
    /// Top-demand deviation drill-down.
    PostOdAssignment = 8,
}

impl ReadinessLevel {
    pub const ALL: [ReadinessLevel; 8] = [
        Self::Structural,
        Self::DemandZone,
        Self::NetworkAttributes,
        Self::Configuration,
        Self::OdmeReadiness,
        Self::Accessibility,
        Self::AssignmentFit,
        Self::PostOdAssignment,
    ];

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(value: u8) -> Result<Self> {
        match value {
            1..=8 => Ok(Self::ALL[usize::from(value - 1)]),
            _ => Err(ModelError::InvalidLevel { value }),
        }
    }

    /// Levels 1 through `self`, in execution order.
    pub fn cumulative(self) -> impl Iterator<Item = ReadinessLevel> {
        Self::ALL.into_iter().take(usize::from(self.ordinal()))
    }

    /// Levels whose results are cached per validator instance.
    pub fn is_memoized(self) -> bool {
        self >= Self::Accessibility
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Structural => "basic node and link structure",
            Self::DemandZone => "demand and zone consistency",
            Self::NetworkAttributes => "network attributes (VDF, units, capacity)",
            Self::Configuration => "single mode configuration",
            Self::OdmeReadiness => "observed volumes and ODME inputs",
            Self::Accessibility => "network accessibility",
            Self::AssignmentFit => "traffic assignment fit",
            Self::PostOdAssignment => "post-OD assignment deviations",
        }
    }
}

impl TryFrom<u8> for ReadinessLevel {
    type Error = ModelError;

    fn try_from(value: u8) -> Result<Self> {
        Self::from_ordinal(value)
    }
}

impl From<ReadinessLevel> for u8 {
    fn from(level: ReadinessLevel) -> Self {
        level.ordinal()
    }
}

impl fmt::Display for ReadinessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Level {}", self.ordinal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinal_round_trip_and_bounds() {
        for level in ReadinessLevel::ALL {
            assert_eq!(ReadinessLevel::from_ordinal(level.ordinal()), Ok(level));
        }
        assert_eq!(
            ReadinessLevel::from_ordinal(0),
            Err(ModelError::InvalidLevel { value: 0 })
        );
        assert!(ReadinessLevel::try_from(9).is_err());
    }

    #[test]
    fn cumulative_runs_lower_levels_first() {
        let levels: Vec<u8> = ReadinessLevel::Configuration
            .cumulative()
            .map(ReadinessLevel::ordinal)
            .collect();
        assert_eq!(levels, vec![1, 2, 3, 4]);
    }

    #[test]
    fn only_post_run_levels_are_memoized() {
        assert!(!ReadinessLevel::OdmeReadiness.is_memoized());
        assert!(ReadinessLevel::Accessibility.is_memoized());
        assert!(ReadinessLevel::PostOdAssignment.is_memoized());
    }
}
