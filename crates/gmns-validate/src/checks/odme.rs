//! OD-matrix estimation readiness: observed volumes, settings and target demand files.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use gmns_ingest::{Dataset, Table};
use gmns_model::ValidationResult;
use gmns_standards::DEMAND_COLUMNS;
use serde_json::json;

use crate::checks::config::first_value;
use crate::error::Result;
use crate::util::{MAX_EXAMPLES, MAX_IDS, num, row_labels, sum};

const ODME_SETTINGS: [&str; 3] = ["odme_mode", "odme_vmt", "route_output"];

/// obs_volume must be non-negative with at least one positive link.
pub fn check_observed_volumes(link: &Table) -> Vec<ValidationResult> {
    let Some(volumes) = link.floats("obs_volume") else {
        return vec![
            ValidationResult::warning("Missing 'obs_volume' field in link file. This is required for ODME.")
                .with_field("obs_volume"),
        ];
    };
    let mut results = Vec::new();

    let negative: Vec<usize> = volumes
        .iter()
        .enumerate()
        .filter(|(_, volume)| volume.is_some_and(|v| v < 0.0))
        .map(|(row, _)| row)
        .collect();
    if !negative.is_empty() {
        let labels = row_labels(link, "link_id");
        let examples: Vec<_> = negative
            .iter()
            .take(MAX_EXAMPLES)
            .map(|row| labels[*row].clone())
            .collect();
        results.push(
            ValidationResult::error(format!(
                "Found {} links with negative obs_volume values. All values must be non-negative for ODME.",
                negative.len()
            ))
            .with_field("obs_volume")
            .with_details(json!({ "negative_count": negative.len(), "example_links": examples })),
        );
    }

    let positive = volumes.iter().flatten().filter(|v| **v > 0.0).count();
    if positive == 0 {
        results.push(
            ValidationResult::error("No links with positive obs_volume values found. ODME requires observed volumes.")
                .with_field("obs_volume"),
        );
    } else {
        results.push(
            ValidationResult::info(format!(
                "Found {positive} links with positive obs_volume values for ODME."
            ))
            .with_field("obs_volume")
            .with_details(json!({ "volume_links_count": positive })),
        );
    }
    results
}

/// `<base>_target<ext>` for a demand file name.
pub fn target_file_name(demand_file: &str) -> String {
    match Path::new(demand_file).extension() {
        Some(ext) => {
            let ext = ext.to_string_lossy();
            let base = &demand_file[..demand_file.len() - ext.len() - 1];
            format!("{base}_target.{ext}")
        }
        None => format!("{demand_file}_target"),
    }
}

/// Demand file names listed in mode_type.csv, blanks skipped.
pub(crate) fn demand_files(mode_type: &Table) -> Option<Vec<String>> {
    Some(mode_type.text("demand_file")?.into_iter().flatten().collect())
}

/// settings.csv ODME flags, then target files when odme_mode is 1.
pub fn check_odme_configuration(
    settings: &Dataset,
    mode_type: &Dataset,
    working_dir: &Path,
    node: Option<&Table>,
) -> Vec<ValidationResult> {
    let settings = match settings {
        Dataset::Absent => {
            return vec![
                ValidationResult::error("settings.csv not found. Required for ODME configuration.")
                    .with_field("settings"),
            ];
        }
        Dataset::Failed { error, .. } => {
            return vec![
                ValidationResult::error(format!("Error validating ODME configuration: {error}"))
                    .with_field("odme"),
            ];
        }
        Dataset::Loaded(table) => table,
    };

    let missing = settings.missing_fields(&ODME_SETTINGS);
    if !missing.is_empty() {
        return vec![
            ValidationResult::error(format!(
                "Missing required ODME fields in settings.csv: {}",
                missing.join(", ")
            ))
            .with_field("settings")
            .with_details(json!({ "missing_fields": missing })),
        ];
    }

    let mut results = Vec::new();
    let setting = |field: &str| {
        first_value(settings, field).map_or_else(|| "missing".to_string(), num)
    };

    let odme_mode = first_value(settings, "odme_mode");
    if odme_mode != Some(1.0) {
        results.push(
            ValidationResult::info(format!(
                "ODME mode is set to {}. ODME validation will be skipped.",
                setting("odme_mode")
            ))
            .with_field("odme_mode"),
        );
        return results;
    }
    results.push(ValidationResult::success("ODME mode is correctly set to 1.").with_field("odme_mode in settings.csv"));

    if first_value(settings, "route_output") == Some(1.0) {
        results.push(
            ValidationResult::success("route_output is correctly set to 1 for ODME.").with_field("route_output"),
        );
    } else {
        results.push(
            ValidationResult::error(format!(
                "route_output is set to {}. Value must be 1 for ODME to generate route_assignment.csv.",
                setting("route_output")
            ))
            .with_field("route_output in settings.csv"),
        );
    }

    if let Some(odme_vmt) = first_value(settings, "odme_vmt") {
        let vmt = num(odme_vmt);
        let result = if odme_vmt < 0.0 {
            ValidationResult::error(format!("odme_vmt value ({vmt}) must be non-negative."))
        } else if odme_vmt == 0.0 {
            ValidationResult::warning("odme_vmt is set to 0. Target values will not be used in ODME process.")
        } else if odme_vmt >= 2.0 {
            ValidationResult::success(format!(
                "odme_vmt is set to {vmt}. ODME will use target values in the process."
            ))
        } else {
            ValidationResult::info(format!("odme_vmt is set to {vmt}."))
        };
        results.push(result.with_field("odme_vmt"));
    }

    let modes = match mode_type {
        Dataset::Absent => {
            results.push(
                ValidationResult::error("mode_type.csv not found. Required for ODME to identify demand files.")
                    .with_field("mode_type"),
            );
            return results;
        }
        Dataset::Failed { error, .. } => {
            results.push(
                ValidationResult::error(format!("Error reading mode_type.csv: {error}"))
                    .with_field("mode_type"),
            );
            return results;
        }
        Dataset::Loaded(table) => table,
    };
    results.extend(check_target_files(modes, working_dir, node));
    results
}

fn check_target_files(mode_type: &Table, working_dir: &Path, node: Option<&Table>) -> Vec<ValidationResult> {
    let Some(demand_files) = demand_files(mode_type) else {
        return vec![
            ValidationResult::error(
                "Column 'demand_file' not found in mode_type.csv. Required to identify demand target files.",
            )
            .with_field("demand_file"),
        ];
    };

    let (found, missing): (Vec<String>, Vec<String>) = demand_files
        .iter()
        .map(|file| target_file_name(file))
        .partition(|target| working_dir.join(target).is_file());

    let mut results = Vec::new();
    if !missing.is_empty() {
        results.push(
            ValidationResult::error(format!(
                "Missing demand target files required for ODME: {}",
                missing.join(", ")
            ))
            .with_field("demand_target")
            .with_details(json!({ "missing_files": missing })),
        );
    }
    if !found.is_empty() {
        results.push(
            ValidationResult::success(format!(
                "Found {} demand target files for ODME: {}",
                found.len(),
                found.join(", ")
            ))
            .with_field("demand_target")
            .with_details(json!({ "found_files": found })),
        );
    }
    if found.is_empty() && missing.is_empty() {
        results.push(
            ValidationResult::warning(
                "No demand files specified in mode_type.csv. ODME requires at least one demand file with a target.",
            )
            .with_field("demand_target"),
        );
    }

    let node_zones: Option<HashSet<i64>> = node
        .and_then(|node| node.ints("zone_id"))
        .map(|zones| zones.into_iter().flatten().filter(|zone| *zone != 0).collect());

    for target in &found {
        match check_target_content(&working_dir.join(target), target, node_zones.as_ref()) {
            Ok(content) => results.extend(content),
            Err(err) => results.push(
                ValidationResult::error(format!("Error validating {target}: {err}"))
                    .with_field("demand_target_content")
                    .with_details(json!({ "file": target })),
            ),
        }
    }
    results
}

fn check_target_content(
    path: &Path,
    file: &str,
    node_zones: Option<&HashSet<i64>>,
) -> Result<Vec<ValidationResult>> {
    let target = Table::read(file, path)?;
    let field = "demand_target_content";

    let missing = target.missing_fields(&DEMAND_COLUMNS);
    if !missing.is_empty() {
        return Ok(vec![
            ValidationResult::error(format!(
                "Missing required columns in {file}: {}",
                missing.join(", ")
            ))
            .with_field(field)
            .with_details(json!({ "file": file, "missing_columns": missing })),
        ]);
    }

    let mut results = Vec::new();
    let origins = target.require_floats("o_zone_id")?;
    let destinations = target.require_floats("d_zone_id")?;
    let volumes = target.require_floats("volume")?;

    for (column, values) in [("o_zone_id", &origins), ("d_zone_id", &destinations)] {
        if values.iter().any(Option::is_none) {
            results.push(
                ValidationResult::error(format!(
                    "Invalid {column} values in {file}. All values must be numeric."
                ))
                .with_field(field)
                .with_details(json!({ "file": file })),
            );
        }
    }

    let negative = volumes.iter().flatten().filter(|v| **v < 0.0).count();
    if negative > 0 {
        results.push(
            ValidationResult::error(format!("Found {negative} negative volume values in {file}"))
                .with_field(field)
                .with_details(json!({ "file": file, "negative_count": negative })),
        );
    }

    let total_records = target.height();
    let zero = volumes.iter().flatten().filter(|v| **v == 0.0).count();
    if zero > 0 && zero * 2 > total_records {
        results.push(
            ValidationResult::warning(format!(
                "More than 50% of volume values in {file} are zero ({zero} out of {total_records})"
            ))
            .with_field(field)
            .with_details(json!({ "file": file, "zero_count": zero, "total_records": total_records })),
        );
    }

    if let Some(node_zones) = node_zones {
        let missing: BTreeSet<i64> = origins
            .iter()
            .chain(&destinations)
            .flatten()
            .filter(|zone| zone.fract() == 0.0)
            .map(|zone| *zone as i64)
            .filter(|zone| !node_zones.contains(zone))
            .collect();
        if !missing.is_empty() {
            let examples: Vec<i64> = missing.iter().take(MAX_IDS).copied().collect();
            results.push(
                ValidationResult::error(format!(
                    "Found {} zones in {file} that don't exist in node file",
                    missing.len()
                ))
                .with_field(field)
                .with_details(json!({ "file": file, "missing_zones": examples })),
            );
        }
    }

    let values: Vec<f64> = volumes.iter().flatten().copied().collect();
    let total_volume = sum(&values);
    results.push(
        ValidationResult::info(format!(
            "Validated {file}: {total_records} OD pairs, total volume: {total_volume:.1}"
        ))
        .with_field(field)
        .with_details(json!({ "file": file, "records": total_records, "total_volume": total_volume })),
    );
    Ok(results)
}
