//! Link attribute checks: VDF parameters, unit plausibility and unit-pair consistency.

use gmns_ingest::Table;
use gmns_model::ValidationResult;
use serde_json::{Value, json};

use crate::util::{MAX_EXAMPLES, max, mean, min, num, row_labels};

const VDF_FIELDS: [&str; 5] = [
    "vdf_alpha",
    "vdf_beta",
    "vdf_fftt",
    "vdf_length_mi",
    "vdf_free_speed_mph",
];

const METERS_PER_MILE: f64 = 1609.34;
const KMH_PER_MPH: f64 = 1.60934;
const FFTT_EPSILON: f64 = 0.001;
/// Half the step of a value stored to two decimals.
const ROUNDING_TOLERANCE: f64 = 0.005;

/// VDF fields must exist, be non-null and non-negative.
pub fn check_vdf_parameters(link: &Table) -> Vec<ValidationResult> {
    let mut results = Vec::new();
    for field in VDF_FIELDS {
        let Some(values) = link.floats(field) else {
            results.push(
                ValidationResult::error(format!("Missing required VDF parameter field: {field}"))
                    .with_field(field),
            );
            continue;
        };
        let missing = values.iter().filter(|value| value.is_none()).count();
        if missing > 0 {
            results.push(
                ValidationResult::error(format!("Found {missing} links with missing {field} values"))
                    .with_field(field),
            );
        }
        let negative = values.iter().flatten().filter(|value| **value < 0.0).count();
        if negative > 0 {
            results.push(
                ValidationResult::error(format!("Found {negative} links with negative {field} values"))
                    .with_field(field),
            );
        }
    }
    results
}

/// Non-null values of a float column with their mean, min and max.
struct ColumnStats {
    mean: f64,
    min: f64,
    max: f64,
}

impl ColumnStats {
    fn of(table: &Table, field: &str) -> Option<Self> {
        let values: Vec<f64> = table.floats(field)?.into_iter().flatten().collect();
        Some(Self {
            mean: mean(&values)?,
            min: min(&values)?,
            max: max(&values)?,
        })
    }

    fn details(&self) -> Value {
        json!({ "mean": self.mean, "min": self.min, "max": self.max })
    }

    fn range(&self) -> String {
        format!("mean: {:.2}, range: {}-{}", self.mean, num(self.min), num(self.max))
    }
}

/// free_speed should look like km/h and vdf_free_speed_mph like mph.
pub fn check_speed_units(link: &Table) -> Vec<ValidationResult> {
    let mut results = Vec::new();

    if let Some(stats) = ColumnStats::of(link, "free_speed") {
        if (5.0..=150.0).contains(&stats.mean) {
            results.push(
                ValidationResult::info(format!("Speed values appear to be in km/h ({})", stats.range()))
                    .with_field("free_speed"),
            );
        } else {
            results.push(
                ValidationResult::warning(format!(
                    "Average free_speed ({:.2}) is outside typical range for km/h",
                    stats.mean
                ))
                .with_field("free_speed")
                .with_details(stats.details()),
            );
        }
    }

    if let Some(stats) = ColumnStats::of(link, "vdf_free_speed_mph") {
        if (3.0..=90.0).contains(&stats.mean) {
            results.push(
                ValidationResult::info(format!(
                    "VDF free speed values appear to be in mph ({})",
                    stats.range()
                ))
                .with_field("vdf_free_speed_mph"),
            );
        } else {
            results.push(
                ValidationResult::warning(format!(
                    "Average vdf_free_speed_mph ({:.2}) is outside typical range for mph",
                    stats.mean
                ))
                .with_field("vdf_free_speed_mph")
                .with_details(stats.details()),
            );
        }
    }
    results
}

/// length should look like meters and vdf_length_mi like miles.
pub fn check_length_units(link: &Table) -> Vec<ValidationResult> {
    let mut results = Vec::new();

    if let Some(stats) = ColumnStats::of(link, "length") {
        let warning = if stats.mean < 10.0 {
            Some("is very small; may not be in meters")
        } else if stats.mean > 1_000_000.0 {
            Some("is very large; may not be in meters")
        } else {
            None
        };
        results.push(match warning {
            Some(reason) => ValidationResult::warning(format!(
                "Average link length ({:.2}) {reason}",
                stats.mean
            ))
            .with_field("length")
            .with_details(stats.details()),
            None => ValidationResult::info(format!(
                "Length values appear to be in meters ({})",
                stats.range()
            ))
            .with_field("length"),
        });
    }

    if let Some(stats) = ColumnStats::of(link, "vdf_length_mi") {
        results.push(if stats.mean > 50.0 {
            ValidationResult::warning(format!(
                "Average vdf_length_mi ({:.2}) appears too large for miles",
                stats.mean
            ))
            .with_field("vdf_length_mi")
            .with_details(stats.details())
        } else {
            ValidationResult::info(format!(
                "VDF length values appear to be in miles ({})",
                stats.range()
            ))
            .with_field("vdf_length_mi")
        });
    }
    results
}

/// Relative difference in percent of `calculated` against `stored`.
///
/// A zero `stored` value only matches a zero calculation.
pub fn relative_diff_pct(calculated: f64, stored: f64) -> f64 {
    if stored == 0.0 {
        if calculated == 0.0 { 0.0 } else { f64::INFINITY }
    } else {
        100.0 * (calculated - stored).abs() / stored
    }
}

fn fftt_diff_pct(calculated: f64, stored: f64) -> f64 {
    let diff = 100.0 * (calculated - stored).abs() / (stored + FFTT_EPSILON);
    if diff.is_nan() { f64::INFINITY } else { diff }
}

/// One row of a unit-pair comparison.
struct PairRow {
    row: usize,
    left: f64,
    right: f64,
    abs_diff: f64,
    diff_pct: f64,
}

/// A unit-pair comparison and how its outcome is reported.
struct UnitPair {
    label: &'static str,
    field: &'static str,
    tolerance_pct: f64,
    rounding_tolerance: f64,
    left_key: &'static str,
    right_key: &'static str,
    success: &'static str,
}

impl UnitPair {
    fn evaluate(&self, link: &Table, rows: &[PairRow]) -> Option<ValidationResult> {
        if rows.is_empty() {
            return None;
        }
        let inconsistent: Vec<&PairRow> = rows
            .iter()
            .filter(|row| row.diff_pct > self.tolerance_pct && row.abs_diff > self.rounding_tolerance)
            .collect();
        if inconsistent.is_empty() {
            return Some(ValidationResult::success(self.success).with_field(self.field));
        }

        let diffs: Vec<f64> = inconsistent
            .iter()
            .map(|row| row.diff_pct)
            .filter(|diff| diff.is_finite())
            .collect();
        let avg = match mean(&diffs) {
            Some(avg) => format!("avg={avg:.2}%"),
            None => "stored value is zero".to_string(),
        };
        let labels = row_labels(link, "link_id");
        let examples = &inconsistent[..inconsistent.len().min(MAX_EXAMPLES)];

        let mut details = serde_json::Map::new();
        details.insert("inconsistent_count".into(), json!(inconsistent.len()));
        details.insert(
            "example_links".into(),
            examples.iter().map(|row| labels[row.row].clone()).collect(),
        );
        details.insert(self.left_key.into(), examples.iter().map(|row| json!(row.left)).collect());
        details.insert(self.right_key.into(), examples.iter().map(|row| json!(row.right)).collect());
        details.insert(
            "example_diffs".into(),
            examples
                .iter()
                .map(|row| if row.diff_pct.is_finite() { json!(row.diff_pct) } else { json!("inf") })
                .collect(),
        );

        Some(
            ValidationResult::warning(format!(
                "Found {} links with inconsistent {} (>{}% difference, {avg})",
                inconsistent.len(),
                self.label,
                self.tolerance_pct
            ))
            .with_field(self.field)
            .with_details(details.into()),
        )
    }
}

/// Rows where every listed column parses, as `(row, values)`.
fn complete_rows<const N: usize>(link: &Table, fields: [&str; N]) -> Option<Vec<(usize, [f64; N])>> {
    let mut columns = Vec::with_capacity(N);
    for field in fields {
        columns.push(link.floats(field)?);
    }
    Some(
        (0..link.height())
            .filter_map(|row| {
                let mut values = [0.0; N];
                for (slot, column) in values.iter_mut().zip(&columns) {
                    *slot = column[row]?;
                }
                Some((row, values))
            })
            .collect(),
    )
}

/// Base-unit fields against their derived vdf_* counterparts.
pub fn check_unit_consistency(link: &Table) -> Vec<ValidationResult> {
    let mut results = Vec::new();

    if let Some(rows) = complete_rows(link, ["length", "vdf_length_mi"]) {
        let rows: Vec<PairRow> = rows
            .into_iter()
            .map(|(row, [meters, miles])| PairRow {
                row,
                left: meters,
                right: miles,
                abs_diff: (meters / METERS_PER_MILE - miles).abs(),
                diff_pct: relative_diff_pct(meters / METERS_PER_MILE, miles),
            })
            .collect();
        let pair = UnitPair {
            label: "length/vdf_length_mi conversion",
            field: "length",
            tolerance_pct: 5.0,
            rounding_tolerance: ROUNDING_TOLERANCE,
            left_key: "example_meters",
            right_key: "example_miles",
            success: "Length (meters) and vdf_length_mi (miles) values are consistent",
        };
        results.extend(pair.evaluate(link, &rows));
    }

    if let Some(rows) = complete_rows(link, ["free_speed", "vdf_free_speed_mph"]) {
        let rows: Vec<PairRow> = rows
            .into_iter()
            .map(|(row, [kmh, mph])| PairRow {
                row,
                left: kmh,
                right: mph,
                abs_diff: (kmh / KMH_PER_MPH - mph).abs(),
                diff_pct: relative_diff_pct(kmh / KMH_PER_MPH, mph),
            })
            .collect();
        let pair = UnitPair {
            label: "free_speed/vdf_free_speed_mph conversion",
            field: "free_speed",
            tolerance_pct: 5.0,
            rounding_tolerance: ROUNDING_TOLERANCE,
            left_key: "example_kmh",
            right_key: "example_mph",
            success: "Free_speed (km/h) and vdf_free_speed_mph (mph) values are consistent",
        };
        results.extend(pair.evaluate(link, &rows));
    }

    if let Some(rows) = complete_rows(link, ["vdf_fftt", "vdf_length_mi", "vdf_free_speed_mph"]) {
        let rows: Vec<PairRow> = rows
            .into_iter()
            .map(|(row, [fftt, miles, mph])| {
                let calculated = miles / mph * 60.0;
                PairRow {
                    row,
                    left: fftt,
                    right: calculated,
                    abs_diff: (calculated - fftt).abs(),
                    diff_pct: fftt_diff_pct(calculated, fftt),
                }
            })
            .collect();
        let pair = UnitPair {
            label: "vdf_fftt calculation",
            field: "vdf_fftt",
            tolerance_pct: 5.0,
            rounding_tolerance: 0.0,
            left_key: "example_fftt",
            right_key: "example_calc_fftt",
            success: "VDF free flow travel time (vdf_fftt) values are consistent with length and speed",
        };
        results.extend(pair.evaluate(link, &rows));
    }

    let has_vdf_units = link.has_field("vdf_length_mi") && link.has_field("vdf_free_speed_mph");
    if !has_vdf_units
        && let Some(rows) = complete_rows(link, ["length", "free_speed", "vdf_fftt"])
    {
        let rows: Vec<PairRow> = rows
            .into_iter()
            .map(|(row, [meters, kmh, fftt])| {
                let calculated = meters / kmh / 1000.0 * 60.0;
                PairRow {
                    row,
                    left: fftt,
                    right: calculated,
                    abs_diff: (calculated - fftt).abs(),
                    diff_pct: fftt_diff_pct(calculated, fftt),
                }
            })
            .collect();
        let pair = UnitPair {
            label: "vdf_fftt based on length/free_speed",
            field: "vdf_fftt",
            tolerance_pct: 10.0,
            rounding_tolerance: 0.0,
            left_key: "example_fftt",
            right_key: "example_calc_fftt",
            success: "VDF free flow travel time (vdf_fftt) values are consistent with length and free_speed",
        };
        results.extend(pair.evaluate(link, &rows));
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use gmns_model::ValidationStatus;

    #[test]
    fn test_vdf_missing_field_and_values() {
        let link = Table::from_text_columns(
            "link",
            &[
                ("vdf_alpha", vec!["0.15", "", "-1"]),
                ("vdf_beta", vec!["4", "4", "4"]),
                ("vdf_fftt", vec!["1", "1", "1"]),
                ("vdf_length_mi", vec!["1", "1", "1"]),
            ],
        )
        .unwrap();
        let messages: Vec<String> = check_vdf_parameters(&link)
            .iter()
            .map(|result| result.message().to_string())
            .collect();
        assert_eq!(
            messages,
            vec![
                "Found 1 links with missing vdf_alpha values",
                "Found 1 links with negative vdf_alpha values",
                "Missing required VDF parameter field: vdf_free_speed_mph",
            ]
        );
    }

    #[test]
    fn test_speed_and_length_ranges() {
        let link = Table::from_text_columns(
            "link",
            &[
                ("free_speed", vec!["200", "300"]),
                ("length", vec!["120", "80"]),
                ("vdf_length_mi", vec!["0.07", "0.05"]),
            ],
        )
        .unwrap();
        let speed = check_speed_units(&link);
        assert_eq!(speed[0].status(), ValidationStatus::Warning);
        assert_eq!(
            speed[0].message(),
            "Average free_speed (250.00) is outside typical range for km/h"
        );

        let length = check_length_units(&link);
        assert_eq!(
            length[0].message(),
            "Length values appear to be in meters (mean: 100.00, range: 80-120)"
        );
        assert_eq!(length[1].status(), ValidationStatus::Info);
    }

    #[test]
    fn test_unit_pairs() {
        let link = Table::from_text_columns(
            "link",
            &[
                ("link_id", vec!["1", "2"]),
                ("length", vec!["1609.34", "1609.34"]),
                ("vdf_length_mi", vec!["1", "2"]),
                ("free_speed", vec!["96.5604", "96.5604"]),
                ("vdf_free_speed_mph", vec!["60", "60"]),
                ("vdf_fftt", vec!["1", "2"]),
            ],
        )
        .unwrap();
        let results = check_unit_consistency(&link);
        assert_eq!(results.len(), 3);

        assert_eq!(
            results[0].message(),
            "Found 1 links with inconsistent length/vdf_length_mi conversion (>5% difference, avg=50.00%)"
        );
        assert_eq!(results[0].detail("example_links"), Some(&json!([2])));
        assert_eq!(results[1].status(), ValidationStatus::Success);
        assert_eq!(results[2].status(), ValidationStatus::Success);
    }

    #[test]
    fn test_short_links_rounded_to_hundredths_are_consistent() {
        let link = Table::from_text_columns(
            "link",
            &[
                ("link_id", vec!["1", "2"]),
                ("length", vec!["40.0", "5.0"]),
                ("vdf_length_mi", vec!["0.02", "0.00"]),
            ],
        )
        .unwrap();
        let results = check_unit_consistency(&link);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status(), ValidationStatus::Success);
    }

    #[test]
    fn test_zero_stored_miles_keep_message_finite() {
        let link = Table::from_text_columns(
            "link",
            &[
                ("link_id", vec!["7"]),
                ("length", vec!["800.0"]),
                ("vdf_length_mi", vec!["0"]),
            ],
        )
        .unwrap();
        let results = check_unit_consistency(&link);
        assert_eq!(
            results[0].message(),
            "Found 1 links with inconsistent length/vdf_length_mi conversion (>5% difference, stored value is zero)"
        );
        assert_eq!(results[0].detail("example_diffs"), Some(&json!(["inf"])));
    }

    #[test]
    fn test_fftt_fallback_without_vdf_units() {
        let link = Table::from_text_columns(
            "link",
            &[
                ("length", vec!["1000"]),
                ("free_speed", vec!["60"]),
                ("vdf_fftt", vec!["1"]),
            ],
        )
        .unwrap();
        let results = check_unit_consistency(&link);
        assert_eq!(results.len(), 1);
        assert_eq!(
            results[0].message(),
            "VDF free flow travel time (vdf_fftt) values are consistent with length and free_speed"
        );
    }

    #[test]
    fn test_relative_diff_zero_stored() {
        assert_eq!(relative_diff_pct(0.0, 0.0), 0.0);
        assert!(relative_diff_pct(1.0, 0.0).is_infinite());
    }
}
