//! mode_type.csv and settings.csv validation.

use gmns_common::parse_f64;
use gmns_ingest::{Dataset, Table};
use gmns_model::ValidationResult;
use gmns_standards::{DatasetKind, schema};
use serde_json::json;

use crate::checks::fields::{check_required, check_types};
use crate::util::num;

const MIN_ITERATIONS: f64 = 10.0;
const MAX_ITERATIONS: f64 = 100.0;
const MAX_PERIOD_HOURS: f64 = 4.0;
const LARGE_NETWORK_ZONES: usize = 3000;

/// Value of a settings column on the first row.
pub(crate) fn first_value(settings: &Table, field: &str) -> Option<f64> {
    settings.floats(field)?.first().copied().flatten()
}

fn first_text(table: &Table, field: &str) -> Option<String> {
    table.text(field)?.into_iter().next().flatten()
}

/// Config file checks. `zone_count` is the number of zone centroids in the node file.
pub fn check_config_files(
    mode_type: &Dataset,
    settings: &Dataset,
    zone_count: Option<usize>,
) -> Vec<ValidationResult> {
    let mut results = Vec::new();

    let mode_table = match mode_type {
        Dataset::Absent => {
            results.push(ValidationResult::warning("mode_type.csv file not found").with_field("mode_type"));
            None
        }
        Dataset::Failed { error, .. } => {
            results.push(
                ValidationResult::error(format!("Error reading mode_type.csv: {error}"))
                    .with_field("mode_type"),
            );
            None
        }
        Dataset::Loaded(table) => {
            results.extend(check_mode_type(table));
            Some(table)
        }
    };

    let settings_table = match settings {
        Dataset::Absent => {
            results.push(ValidationResult::warning("settings.csv file not found").with_field("settings"));
            None
        }
        Dataset::Failed { error, .. } => {
            results.push(
                ValidationResult::error(format!("Error reading settings.csv: {error}"))
                    .with_field("settings"),
            );
            None
        }
        Dataset::Loaded(table) => {
            results.extend(check_settings(table, zone_count));
            Some(table)
        }
    };

    if let (Some(modes), Some(settings)) = (mode_table, settings_table) {
        results.extend(check_base_demand_mode(modes, settings));
    }
    results
}

fn check_mode_type(table: &Table) -> Vec<ValidationResult> {
    let mode_count = table.height();
    let mut results = vec![
        ValidationResult::info(format!(
            "Found mode_type.csv with {mode_count} mode type definitions"
        ))
        .with_field("mode_type"),
    ];
    results.extend(check_required(table, DatasetKind::ModeType));
    results.extend(check_types(table, DatasetKind::ModeType));

    if mode_count == 1 {
        results.push(
            ValidationResult::success("Single mode type defined, satisfying Level 4 readiness criteria")
                .with_field("mode_type"),
        );
    } else {
        let modes: Option<Vec<String>> = table
            .text("name")
            .map(|names| names.into_iter().map(Option::unwrap_or_default).collect());
        results.push(
            ValidationResult::warning(format!(
                "Multiple mode types defined ({mode_count}), which may not satisfy Level 4 readiness criteria"
            ))
            .with_field("mode_type")
            .with_details(json!({ "mode_count": mode_count, "modes": modes })),
        );
    }
    results
}

fn check_settings(table: &Table, zone_count: Option<usize>) -> Vec<ValidationResult> {
    let mut results = vec![
        ValidationResult::info(format!(
            "Found settings.csv with {} configuration rows",
            table.height()
        ))
        .with_field("settings"),
    ];
    results.extend(check_required(table, DatasetKind::Settings));
    results.extend(check_types(table, DatasetKind::Settings));

    if let Some(iterations) = first_value(table, "number_of_iterations") {
        if iterations < MIN_ITERATIONS {
            results.push(
                ValidationResult::warning(format!(
                    "Low number of iterations ({}) may lead to poor convergence",
                    num(iterations)
                ))
                .with_field("number_of_iterations in settings.csv"),
            );
        } else if iterations > MAX_ITERATIONS {
            results.push(
                ValidationResult::warning(format!(
                    "Very high number of iterations ({}) may be inefficient",
                    num(iterations)
                ))
                .with_field("number_of_iterations in settings.csv"),
            );
        }
    }

    if let (Some(start), Some(end)) = (
        first_value(table, "demand_period_starting_hours"),
        first_value(table, "demand_period_ending_hours"),
    ) {
        let (start_text, end_text) = (num(start), num(end));
        let field = "demand_period_hours in settings.csv";
        if start < 0.0 || end < 0.0 {
            results.push(
                ValidationResult::error(format!(
                    "Demand period hours must be non-negative (start: {start_text}, end: {end_text})"
                ))
                .with_field(field),
            );
        }
        if start > 24.0 || end > 24.0 {
            results.push(
                ValidationResult::error(format!(
                    "Demand period hours must be ≤ 24 (start: {start_text}, end: {end_text})"
                ))
                .with_field(field),
            );
        }
        if end <= start {
            results.push(
                ValidationResult::error(format!(
                    "Demand period ending hour ({end_text}) must be greater than starting hour ({start_text})"
                ))
                .with_field(field),
            );
        }
        let duration = end - start;
        if duration > MAX_PERIOD_HOURS {
            results.push(
                ValidationResult::warning(format!(
                    "Demand period duration ({} hours) exceeds typical maximum of 4 hours",
                    num(duration)
                ))
                .with_field(field),
            );
        }
    }

    if let Some(route_output) = first_value(table, "route_output") {
        if route_output < 0.0 {
            results.push(
                ValidationResult::error(format!(
                    "Route output value ({}) must be non-negative",
                    num(route_output)
                ))
                .with_field("route_output in settings.csv"),
            );
        }
        if route_output == 1.0
            && let Some(zone_count) = zone_count.filter(|count| *count > LARGE_NETWORK_ZONES)
        {
            results.push(
                ValidationResult::warning(format!(
                    "Route output enabled with a large network ({zone_count} zones). This may be very time-consuming."
                ))
                .with_field("route_output")
                .with_details(json!({ "zone_count": zone_count })),
            );
        }
    }

    for spec in schema(DatasetKind::Settings) {
        if !spec.field_type.is_numeric() {
            continue;
        }
        let Some(values) = table.floats(spec.name) else {
            continue;
        };
        if values.iter().flatten().any(|value| *value < 0.0) {
            results.push(
                ValidationResult::error(format!(
                    "Field '{}' contains negative values. All settings should be non-negative.",
                    spec.name
                ))
                .with_field(spec.name),
            );
        }
    }
    results
}

fn check_base_demand_mode(modes: &Table, settings: &Table) -> Vec<ValidationResult> {
    let (Some(base_mode), Some(mode_types)) =
        (first_text(settings, "base_demand_mode"), modes.text("mode_type"))
    else {
        return Vec::new();
    };
    let available: Vec<String> = mode_types.into_iter().flatten().collect();
    let is_zero = parse_f64(&base_mode) == Some(0.0);
    if is_zero || available.contains(&base_mode) {
        return Vec::new();
    }
    vec![
        ValidationResult::error(format!(
            "Base demand mode ({base_mode}) in settings.csv does not match any mode_type in mode_type.csv"
        ))
        .with_field("base_demand_mode")
        .with_details(json!({ "base_mode": base_mode, "available_modes": available })),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use gmns_model::ValidationStatus;

    fn settings(start: &str, end: &str, iterations: &str, base_mode: &str) -> Table {
        Table::from_text_columns(
            "settings",
            &[
                ("number_of_iterations", vec![iterations]),
                ("number_of_processors", vec!["4"]),
                ("demand_period_starting_hours", vec![start]),
                ("demand_period_ending_hours", vec![end]),
                ("base_demand_mode", vec![base_mode]),
                ("route_output", vec!["1"]),
                ("log_file", vec!["0"]),
                ("odme_mode", vec!["0"]),
                ("odme_vmt", vec!["0"]),
            ],
        )
        .unwrap()
    }

    fn modes(rows: Vec<&str>) -> Table {
        let n = rows.len();
        Table::from_text_columns(
            "mode_type",
            &[
                ("mode_type", rows),
                ("name", vec!["car"; n]),
                ("vot", vec!["10"; n]),
                ("pce", vec!["1"; n]),
                ("occ", vec!["1"; n]),
                ("demand_file", vec!["demand.csv"; n]),
                ("dedicated_shortest_path", vec!["1"; n]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_missing_files_are_warnings() {
        let results = check_config_files(&Dataset::Absent, &Dataset::Absent, None);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.status() == ValidationStatus::Warning));
        assert_eq!(results[1].message(), "settings.csv file not found");
    }

    #[test]
    fn test_valid_single_mode_config() {
        let results = check_config_files(
            &Dataset::Loaded(modes(vec!["1"])),
            &Dataset::Loaded(settings("7", "8", "20", "1")),
            Some(10),
        );
        assert!(results.iter().all(|r| !r.is_error()), "{results:?}");
        assert!(results.iter().any(|r| {
            r.message() == "Single mode type defined, satisfying Level 4 readiness criteria"
        }));
    }

    #[test]
    fn test_period_and_base_mode_errors() {
        let results = check_config_files(
            &Dataset::Loaded(modes(vec!["auto", "truck"])),
            &Dataset::Loaded(settings("9", "7", "5", "bus")),
            Some(4000),
        );
        let messages: Vec<&str> = results.iter().map(ValidationResult::message).collect();
        assert!(messages.contains(&"Low number of iterations (5) may lead to poor convergence"));
        assert!(messages.contains(
            &"Demand period ending hour (7) must be greater than starting hour (9)"
        ));
        assert!(messages.contains(
            &"Base demand mode (bus) in settings.csv does not match any mode_type in mode_type.csv"
        ));
        assert!(messages.contains(
            &"Route output enabled with a large network (4000 zones). This may be very time-consuming."
        ));
        assert!(messages.contains(
            &"Multiple mode types defined (2), which may not satisfy Level 4 readiness criteria"
        ));
    }

    #[test]
    fn test_base_mode_zero_is_accepted() {
        let results = check_base_demand_mode(&modes(vec!["auto"]), &settings("7", "8", "20", "0"));
        assert!(results.is_empty());
    }
}
