//! Aggregated validation report.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::result::{Details, ValidationResult, ValidationStatus};

/// Result counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total: usize,
    pub errors: usize,
    pub warnings: usize,
    pub success: usize,
    pub info: usize,
}

impl ReportSummary {
    pub fn from_results(results: &[ValidationResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };
        for result in results {
            match result.status() {
                ValidationStatus::Error => summary.errors += 1,
                ValidationStatus::Warning => summary.warnings += 1,
                ValidationStatus::Success => summary.success += 1,
                ValidationStatus::Info => summary.info += 1,
            }
        }
        summary
    }
}

/// One result as it appears in the per-status report lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub message: String,
    pub field: Option<String>,
    pub details: Option<Details>,
}

impl From<&ValidationResult> for ReportEntry {
    fn from(result: &ValidationResult) -> Self {
        Self {
            message: result.message().to_string(),
            field: result.field().map(str::to_string),
            details: result.details().cloned(),
        }
    }
}

/// Run metadata: inputs, requested level, sizes and time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub node_file: Option<String>,
    pub link_file: Option<String>,
    pub demand_file: Option<String>,
    /// Local time formatted as `%Y-%m-%d %H:%M:%S`.
    pub validation_time: String,
    pub level: u8,
    pub node_count: usize,
    pub link_count: usize,
    pub demand_count: usize,
}

/// Per-column descriptive statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldStatistic {
    Numeric {
        min: f64,
        max: f64,
        mean: f64,
        null_count: usize,
    },
    Categorical {
        unique_values: usize,
        null_count: usize,
    },
}

/// Dataset name -> column name -> statistic.
pub type FieldStatistics = BTreeMap<String, BTreeMap<String, FieldStatistic>>;

/// Structured report for one `validate` run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub summary: ReportSummary,
    pub errors: Vec<ReportEntry>,
    pub warnings: Vec<ReportEntry>,
    pub success: Vec<ReportEntry>,
    pub info: Vec<ReportEntry>,
    pub metadata: ReportMetadata,
    pub field_statistics: FieldStatistics,
}

impl ValidationReport {
    pub fn new(
        results: &[ValidationResult],
        metadata: ReportMetadata,
        field_statistics: FieldStatistics,
    ) -> Self {
        let entries = |status: ValidationStatus| -> Vec<ReportEntry> {
            results
                .iter()
                .filter(|result| result.status() == status)
                .map(ReportEntry::from)
                .collect()
        };
        Self {
            summary: ReportSummary::from_results(results),
            errors: entries(ValidationStatus::Error),
            warnings: entries(ValidationStatus::Warning),
            success: entries(ValidationStatus::Success),
            info: entries(ValidationStatus::Info),
            metadata,
            field_statistics,
        }
    }

    pub fn error_count(&self) -> usize {
        self.summary.errors
    }

    pub fn warning_count(&self) -> usize {
        self.summary.warnings
    }

    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }
}
