//! Checks over the assignment engine's output files (levels 6 to 8).
//!
//! Each check takes tables that are already loaded and returns
//! `Result<Vec<ValidationResult>>`. A check failure is turned into a single
//! ERROR by [`absorb`] so the remaining checks still run.

pub mod connectivity;
pub mod distance;
pub mod fit;
pub mod link_performance;
pub mod post_od;
pub mod route;

use gmns_model::ValidationResult;

use crate::error::Result;

/// OD-level engine output.
pub const OD_PERFORMANCE: &str = "od_performance.csv";
/// Link-level engine output.
pub const LINK_PERFORMANCE: &str = "link_performance.csv";
/// Path-level engine output.
pub const ROUTE_ASSIGNMENT: &str = "route_assignment.csv";

/// Keep a check's results, or replace a failure with `"<context>: <error>"`.
pub(crate) fn absorb(
    context: &str,
    field: &str,
    outcome: Result<Vec<ValidationResult>>,
) -> Vec<ValidationResult> {
    match outcome {
        Ok(results) => results,
        Err(err) => {
            tracing::warn!(context, error = %err, "check failed");
            vec![ValidationResult::error(format!("{context}: {err}")).with_field(field)]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gmns_ingest::IngestError;

    #[test]
    fn test_absorb_turns_failure_into_error() {
        let failure = Err(IngestError::ColumnNotFound {
            table: "route_assignment".to_string(),
            column: "prob".to_string(),
        }
        .into());
        let results = absorb("Error validating route assignments", "route_assignment", failure);
        assert_eq!(results.len(), 1);
        assert!(results[0].is_error());
        assert!(results[0].message().starts_with("Error validating route assignments: "));
        assert_eq!(results[0].field(), Some("route_assignment"));
    }
}
