//! Core types for GMNS network readiness validation.
//!
//! - [`ValidationResult`] / [`ValidationStatus`]: one immutable check outcome
//! - [`ReadinessLevel`]: the eight cumulative validation tiers
//! - [`ValidationReport`]: per-status result lists, metadata and field statistics

pub mod error;
pub mod level;
pub mod report;
pub mod result;

pub use error::{ModelError, Result};
pub use level::ReadinessLevel;
pub use report::{
    FieldStatistic, FieldStatistics, ReportEntry, ReportMetadata, ReportSummary,
    ValidationReport,
};
pub use result::{Details, ValidationResult, ValidationStatus};
