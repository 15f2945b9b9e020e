//! link_performance.csv: network totals, speeds, congestion and volume fit.

use gmns_ingest::Table;
use gmns_model::ValidationResult;
use serde_json::json;

use crate::error::Result;
use crate::export::Exporter;
use crate::post_run::absorb;
use crate::post_run::fit::{VolumeSource, compare_volumes};
use crate::util::{MAX_EXAMPLES, max, mean, min, percent, row_labels};

const REQUIRED_COLUMNS: [&str; 3] = ["link_id", "volume", "travel_time"];
const MIN_AVG_SPEED_MPH: f64 = 5.0;
const MAX_AVG_SPEED_MPH: f64 = 70.0;
const MAX_DOC: f64 = 4.0;
const SEVERE_DOC: f64 = 2.0;
const MAX_CONGESTION_HOURS: f64 = 5.0;
const FIELD: &str = "assignment";

/// Validate one link_performance table.
pub fn validate_link_performance(perf: &Table, exporter: &Exporter) -> Result<Vec<ValidationResult>> {
    let missing = perf.missing_fields(&REQUIRED_COLUMNS);
    if !missing.is_empty() {
        return Ok(vec![
            ValidationResult::error(format!(
                "Missing required columns in link_performance.csv: {}",
                missing.join(", ")
            ))
            .with_field(FIELD)
            .with_details(json!({ "missing_columns": missing })),
        ]);
    }

    let mut results = absorb("Error computing assignment totals", FIELD, network_totals(perf));
    results.extend(link_speeds(perf));

    for source in [VolumeSource::Observed, VolumeSource::Reference] {
        if perf.has_field(source.column()) {
            let context = format!("Error comparing {} volumes", source.label());
            results.extend(absorb(&context, source.field(), compare_volumes(perf, source, exporter)));
        }
    }

    results.extend(degree_of_congestion(perf));
    results.extend(congestion_duration(perf));
    Ok(results)
}

fn column_total(perf: &Table, column: &str) -> f64 {
    perf.floats(column)
        .map_or(0.0, |values| values.into_iter().flatten().sum())
}

fn network_totals(perf: &Table) -> Result<Vec<ValidationResult>> {
    let total_volume: f64 = perf.require_floats("volume")?.into_iter().flatten().sum();
    let total_vmt = column_total(perf, "vmt");
    let total_vht = column_total(perf, "vht");
    if total_vht <= 0.0 {
        return Ok(Vec::new());
    }

    let avg_speed = total_vmt / total_vht;
    let mut results = vec![
        ValidationResult::info(format!(
            "Assignment metrics: Total volume = {total_volume:.1}, VMT = {total_vmt:.1} vehicle-miles, VHT = {total_vht:.1} vehicle-hours, Avg speed = {avg_speed:.1} mph"
        ))
        .with_field(FIELD)
        .with_details(json!({
            "total_volume": total_volume,
            "total_vmt": total_vmt,
            "total_vht": total_vht,
            "avg_speed": avg_speed,
        })),
    ];

    let verdict = if avg_speed < MIN_AVG_SPEED_MPH {
        Some("low")
    } else if avg_speed > MAX_AVG_SPEED_MPH {
        Some("high")
    } else {
        None
    };
    if let Some(verdict) = verdict {
        results.push(
            ValidationResult::error(format!(
                "Average network speed ({avg_speed:.1} mph) is unreasonably {verdict}"
            ))
            .with_field(FIELD)
            .with_details(json!({ "avg_speed": avg_speed })),
        );
    }
    Ok(results)
}

fn link_speeds(perf: &Table) -> Vec<ValidationResult> {
    let Some(speeds) = perf.floats("speed_mph") else {
        return Vec::new();
    };
    let values: Vec<f64> = speeds.into_iter().flatten().collect();
    let (Some(avg), Some(low), Some(high)) = (mean(&values), min(&values), max(&values)) else {
        return Vec::new();
    };

    let mut results = vec![
        ValidationResult::info(format!(
            "Link speed statistics: Average = {avg:.1} mph, Range = {low:.1} - {high:.1} mph"
        ))
        .with_field(FIELD)
        .with_details(json!({
            "avg_link_speed_mph": avg,
            "min_link_speed_mph": low,
            "max_link_speed_mph": high,
        })),
    ];

    let very_slow = values.iter().filter(|speed| **speed < MIN_AVG_SPEED_MPH).count();
    if very_slow > 0 {
        let very_slow_percent = percent(very_slow, perf.height());
        results.push(
            ValidationResult::warning(format!(
                "Found {very_slow} links ({very_slow_percent:.1}%) with very low speeds (<5 mph)"
            ))
            .with_field(FIELD)
            .with_details(json!({
                "very_slow_count": very_slow,
                "very_slow_percent": very_slow_percent,
            })),
        );
    }
    results
}

fn degree_of_congestion(perf: &Table) -> Vec<ValidationResult> {
    let Some(doc) = perf.floats("doc") else {
        return Vec::new();
    };
    let labels = row_labels(perf, "link_id");
    let invalid: Vec<usize> = doc
        .iter()
        .enumerate()
        .filter(|(_, value)| value.is_some_and(|v| !(0.0..=MAX_DOC).contains(&v)))
        .map(|(row, _)| row)
        .collect();

    if !invalid.is_empty() {
        let invalid_percent = percent(invalid.len(), perf.height());
        let examples: Vec<_> = invalid.iter().take(MAX_EXAMPLES).map(|row| labels[*row].clone()).collect();
        return vec![
            ValidationResult::error(format!(
                "Found {} links ({invalid_percent:.1}%) with invalid doc values (<0 or >4)",
                invalid.len()
            ))
            .with_field(FIELD)
            .with_details(json!({
                "invalid_doc_count": invalid.len(),
                "invalid_doc_percent": invalid_percent,
                "example_links": examples,
            })),
        ];
    }

    let values: Vec<f64> = doc.into_iter().flatten().collect();
    let (Some(avg), Some(peak)) = (mean(&values), max(&values)) else {
        return Vec::new();
    };
    let severe = values.iter().filter(|value| **value > SEVERE_DOC).count();
    let severe_percent = percent(severe, perf.height());
    vec![
        ValidationResult::info(format!(
            "Doc statistics: Average = {avg:.2}, Max = {peak:.2}, {severe_percent:.1}% of links have severe congestion (doc > 2)"
        ))
        .with_field(FIELD)
        .with_details(json!({
            "avg_doc": avg,
            "max_doc": peak,
            "severe_congestion_percent": severe_percent,
        })),
    ]
}

fn congestion_duration(perf: &Table) -> Vec<ValidationResult> {
    let Some(durations) = perf.floats("p") else {
        return Vec::new();
    };
    let labels = row_labels(perf, "link_id");
    let valid: Vec<(usize, f64)> = durations
        .into_iter()
        .enumerate()
        .filter_map(|(row, value)| value.map(|v| (row, v)))
        .collect();
    if valid.is_empty() {
        return Vec::new();
    }

    let mut results = Vec::new();
    let high: Vec<usize> = valid
        .iter()
        .filter(|(_, hours)| *hours > MAX_CONGESTION_HOURS)
        .map(|(row, _)| *row)
        .collect();
    if !high.is_empty() {
        let high_percent = percent(high.len(), valid.len());
        let examples: Vec<_> = high.iter().take(MAX_EXAMPLES).map(|row| labels[*row].clone()).collect();
        results.push(
            ValidationResult::warning(format!(
                "Found {} links ({high_percent:.1}%) with excessive congestion duration (P > 5 hours)",
                high.len()
            ))
            .with_field(FIELD)
            .with_details(json!({
                "high_p_count": high.len(),
                "high_p_percent": high_percent,
                "example_links": examples,
            })),
        );
    }

    let hours: Vec<f64> = valid.iter().map(|(_, hours)| *hours).collect();
    let avg = mean(&hours).unwrap_or_default();
    let peak = max(&hours).unwrap_or_default();
    let congested_percent = percent(hours.iter().filter(|h| **h > 0.0).count(), hours.len());
    results.push(
        ValidationResult::info(format!(
            "Congestion duration statistics: Average = {avg:.2} hours, Max = {peak:.2} hours, {congested_percent:.1}% of links have congestion (P > 0)"
        ))
        .with_field(FIELD)
        .with_details(json!({
            "avg_p": avg,
            "max_p": peak,
            "congested_links_percent": congested_percent,
        })),
    );
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use gmns_model::ValidationStatus;

    fn perf(columns: &[(&str, Vec<&str>)]) -> Table {
        Table::from_text_columns("link_performance", columns).unwrap()
    }

    #[test]
    fn test_missing_columns_stop_validation() {
        let table = perf(&[("link_id", vec!["1"]), ("volume", vec!["10"])]);
        let results = validate_link_performance(&table, &Exporter::disabled()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(
            results[0].message(),
            "Missing required columns in link_performance.csv: travel_time"
        );
    }

    #[test]
    fn test_totals_and_average_speed() {
        let table = perf(&[
            ("link_id", vec!["1", "2"]),
            ("volume", vec!["100", "200"]),
            ("travel_time", vec!["1", "2"]),
            ("VMT", vec!["300", "300"]),
            ("VHT", vec!["100", "100"]),
        ]);
        let results = validate_link_performance(&table, &Exporter::disabled()).unwrap();
        assert_eq!(
            results[0].message(),
            "Assignment metrics: Total volume = 300.0, VMT = 600.0 vehicle-miles, VHT = 200.0 vehicle-hours, Avg speed = 3.0 mph"
        );
        assert_eq!(
            results[1].message(),
            "Average network speed (3.0 mph) is unreasonably low"
        );
    }

    #[test]
    fn test_each_section_reports_independently() {
        let table = perf(&[
            ("link_id", vec!["1", "2"]),
            ("volume", vec!["100", "200"]),
            ("travel_time", vec!["1", "2"]),
            ("vmt", vec!["600", "600"]),
            ("vht", vec!["20", "20"]),
            ("obs_volume", vec!["n/a", ""]),
            ("ref_volume", vec!["100", "200"]),
        ]);
        let results = validate_link_performance(&table, &Exporter::disabled()).unwrap();
        let messages: Vec<&str> = results.iter().map(ValidationResult::message).collect();
        assert!(messages[0].starts_with("Assignment metrics: Total volume = 300.0"));
        assert!(messages.contains(&"No links with valid observed volumes found for comparison."));
        assert!(messages.iter().any(|m| m.starts_with("Reference volume comparison: R² = 1.000")));
        assert!(!messages.iter().any(|m| m.starts_with("Error ")), "{messages:?}");
    }

    #[test]
    fn test_doc_out_of_range_is_error() {
        let table = perf(&[
            ("link_id", vec!["1", "2", "3"]),
            ("volume", vec!["1", "1", "1"]),
            ("travel_time", vec!["1", "1", "1"]),
            ("doc", vec!["0.5", "4.5", "-1"]),
        ]);
        let results = validate_link_performance(&table, &Exporter::disabled()).unwrap();
        let doc = results.iter().find(|r| r.message().contains("doc")).unwrap();
        assert_eq!(doc.status(), ValidationStatus::Error);
        assert_eq!(doc.detail("example_links"), Some(&json!([2, 3])));
    }

    #[test]
    fn test_congestion_duration() {
        let table = perf(&[
            ("link_id", vec!["1", "2", "3", "4"]),
            ("volume", vec!["1", "1", "1", "1"]),
            ("travel_time", vec!["1", "1", "1", "1"]),
            ("P", vec!["0", "6", "1", ""]),
        ]);
        let results = validate_link_performance(&table, &Exporter::disabled()).unwrap();
        let messages: Vec<&str> = results.iter().map(ValidationResult::message).collect();
        assert!(messages.contains(
            &"Found 1 links (33.3%) with excessive congestion duration (P > 5 hours)"
        ));
        assert!(messages.contains(
            &"Congestion duration statistics: Average = 2.33 hours, Max = 6.00 hours, 66.7% of links have congestion (P > 0)"
        ));
    }
}
