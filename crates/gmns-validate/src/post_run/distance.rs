//! Distance metrics of od_performance.csv.

use gmns_ingest::Table;
use gmns_model::ValidationResult;
use serde_json::{Value, json};

use crate::error::Result;
use crate::export::{Exporter, PROBLEMATIC_OD_DISTANCES};
use crate::util::{MAX_IDS, label_text, max, mean, median, min, row_labels};

const FIELD: &str = "accessibility_distance";
const DISTANCE_COLUMNS: [&str; 6] = [
    "o_zone_id",
    "d_zone_id",
    "total_distance_km",
    "straight_line_distance_mile",
    "straight_line_distance_km",
    "distance_ratio",
];
const KM_PER_MILE_RANGE: (f64, f64) = (1.5, 1.7);
const MIN_DISTANCE_RATIO: f64 = 0.8;
const MAX_DISTANCE_RATIO: f64 = 5.0;
const MAX_NETWORK_KM: f64 = 500.0;
const RATIO_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone)]
struct DistanceRow {
    o_zone: Value,
    d_zone: Value,
    network_km: f64,
    straight_mile: f64,
    straight_km: f64,
    ratio: f64,
}

impl DistanceRow {
    fn km_per_mile(&self) -> f64 {
        self.straight_km / self.straight_mile
    }

    fn calculated_ratio(&self) -> f64 {
        self.network_km / self.straight_km
    }

    fn ratio_example(&self) -> Value {
        json!([self.o_zone, self.d_zone, self.network_km, self.straight_km, self.ratio])
    }

    fn export_record(&self) -> Vec<String> {
        vec![
            label_text(&self.o_zone),
            label_text(&self.d_zone),
            self.network_km.to_string(),
            self.straight_mile.to_string(),
            self.straight_km.to_string(),
            self.ratio.to_string(),
            self.km_per_mile().to_string(),
        ]
    }
}

/// Rows with every distance column present, and the count of rows dropped.
fn complete_rows(od: &Table) -> Result<(Vec<DistanceRow>, usize)> {
    let o_zones = row_labels(od, "o_zone_id");
    let d_zones = row_labels(od, "d_zone_id");
    let network = od.require_floats("total_distance_km")?;
    let straight_mile = od.require_floats("straight_line_distance_mile")?;
    let straight_km = od.require_floats("straight_line_distance_km")?;
    let ratio = od.require_floats("distance_ratio")?;

    let mut rows = Vec::with_capacity(od.height());
    for row in 0..od.height() {
        let (Some(network_km), Some(mile), Some(km), Some(r)) =
            (network[row], straight_mile[row], straight_km[row], ratio[row])
        else {
            continue;
        };
        if o_zones[row].is_null() || d_zones[row].is_null() {
            continue;
        }
        rows.push(DistanceRow {
            o_zone: o_zones[row].clone(),
            d_zone: d_zones[row].clone(),
            network_km,
            straight_mile: mile,
            straight_km: km,
            ratio: r,
        });
    }
    let dropped = od.height() - rows.len();
    Ok((rows, dropped))
}

/// Plausibility of network vs straight-line distances per OD pair.
pub fn check_distance_metrics(od: &Table, exporter: &Exporter) -> Result<Vec<ValidationResult>> {
    let missing = od.missing_fields(&DISTANCE_COLUMNS);
    if !missing.is_empty() {
        return Ok(vec![
            ValidationResult::warning(format!(
                "Missing distance columns in od_performance.csv: {}. Cannot validate distance metrics.",
                missing.join(", ")
            ))
            .with_field(FIELD)
            .with_details(json!({ "missing_columns": missing })),
        ]);
    }

    let (rows, dropped) = complete_rows(od)?;
    let mut results = Vec::new();
    if dropped > 0 {
        results.push(
            ValidationResult::warning(format!("Found {dropped} OD pairs with missing distance values"))
                .with_field(FIELD)
                .with_details(json!({ "missing_count": dropped })),
        );
    }

    // 1. Mile/km consistency; intra-zonal 0/0 rows compare false
    let (low_factor, high_factor) = KM_PER_MILE_RANGE;
    let inconsistent: Vec<&DistanceRow> = rows
        .iter()
        .filter(|row| {
            let factor = row.km_per_mile();
            factor < low_factor || factor > high_factor
        })
        .collect();
    if !inconsistent.is_empty() {
        let examples: Vec<Value> = inconsistent
            .iter()
            .take(MAX_IDS)
            .map(|row| {
                json!([row.o_zone, row.d_zone, row.straight_mile, row.straight_km, row.km_per_mile()])
            })
            .collect();
        results.push(
            ValidationResult::error(format!(
                "Found {} OD pairs with inconsistent mile/km conversion",
                inconsistent.len()
            ))
            .with_field(FIELD)
            .with_details(json!({
                "inconsistent_count": inconsistent.len(),
                "example_pairs": examples,
            })),
        );
    }

    // 2. Distance ratios
    let mut very_low: Vec<&DistanceRow> =
        rows.iter().filter(|row| row.ratio < MIN_DISTANCE_RATIO).collect();
    very_low.sort_by(|a, b| a.ratio.total_cmp(&b.ratio));
    if !very_low.is_empty() {
        tracing::warn!(count = very_low.len(), "OD pairs with network distance shorter than straight line");
        results.push(
            ValidationResult::error(format!(
                "Found {} OD pairs with impossibly low distance ratios (<0.8) - network distance shorter than straight line",
                very_low.len()
            ))
            .with_field(FIELD)
            .with_details(json!({
                "very_low_count": very_low.len(),
                "example_pairs": very_low.iter().take(MAX_IDS).map(|row| row.ratio_example()).collect::<Vec<_>>(),
            })),
        );
    }

    let mut very_high: Vec<&DistanceRow> =
        rows.iter().filter(|row| row.ratio > MAX_DISTANCE_RATIO).collect();
    very_high.sort_by(|a, b| b.ratio.total_cmp(&a.ratio));
    if !very_high.is_empty() {
        tracing::warn!(count = very_high.len(), "OD pairs with circuitous routes");
        results.push(
            ValidationResult::warning(format!(
                "Found {} OD pairs with very high distance ratios (>5.0) - extremely circuitous routes",
                very_high.len()
            ))
            .with_field(FIELD)
            .with_details(json!({
                "very_high_count": very_high.len(),
                "example_pairs": very_high.iter().take(MAX_IDS).map(|row| row.ratio_example()).collect::<Vec<_>>(),
            })),
        );
    }

    // 3. Absolute distances
    let very_long: Vec<&DistanceRow> =
        rows.iter().filter(|row| row.network_km > MAX_NETWORK_KM).collect();
    if !very_long.is_empty() {
        let examples: Vec<Value> = very_long
            .iter()
            .take(MAX_IDS)
            .map(|row| json!([row.o_zone, row.d_zone, row.network_km]))
            .collect();
        results.push(
            ValidationResult::warning(format!(
                "Found {} OD pairs with very large network distances (>500 km)",
                very_long.len()
            ))
            .with_field(FIELD)
            .with_details(json!({
                "large_distance_count": very_long.len(),
                "example_pairs": examples,
            })),
        );
    }

    // 4. Stored ratio against network / straight-line
    let discrepant: Vec<&DistanceRow> = rows
        .iter()
        .filter(|row| (row.calculated_ratio() - row.ratio).abs() > RATIO_TOLERANCE)
        .collect();
    if !discrepant.is_empty() {
        let examples: Vec<Value> = discrepant
            .iter()
            .take(MAX_IDS)
            .map(|row| json!([row.o_zone, row.d_zone, row.ratio, row.calculated_ratio()]))
            .collect();
        results.push(
            ValidationResult::error(format!(
                "Found {} OD pairs where stored distance_ratio doesn't match calculated value",
                discrepant.len()
            ))
            .with_field(FIELD)
            .with_details(json!({
                "discrepancy_count": discrepant.len(),
                "example_pairs": examples,
            })),
        );
    }

    let ratios: Vec<f64> = rows.iter().map(|row| row.ratio).collect();
    if let (Some(low), Some(high), Some(avg), Some(mid)) =
        (min(&ratios), max(&ratios), mean(&ratios), median(&ratios))
    {
        results.push(
            ValidationResult::info(format!(
                "Distance ratio statistics: Min={low:.4}, Max={high:.4}, Avg={avg:.4}, Median={mid:.4}"
            ))
            .with_field(FIELD)
            .with_details(json!({
                "min_ratio": low,
                "max_ratio": high,
                "avg_ratio": avg,
                "median_ratio": mid,
            })),
        );
    }

    // Low and high ratio bands are disjoint, so the union needs no dedup.
    let problematic: Vec<Vec<String>> = very_low
        .iter()
        .chain(&very_high)
        .map(|row| row.export_record())
        .collect();
    if !problematic.is_empty() {
        let count = problematic.len();
        let mut header = DISTANCE_COLUMNS.to_vec();
        header.push("mile_km_ratio");
        results.extend(exporter.report(PROBLEMATIC_OD_DISTANCES, &header, problematic, FIELD, |path| {
            format!(
                "Exported {count} OD pairs with problematic distance metrics to {}",
                path.display()
            )
        }));
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gmns_model::ValidationStatus;
    use std::fs;
    use tempfile::TempDir;

    fn od(ratio: Vec<&str>, network: Vec<&str>) -> Table {
        let n = ratio.len();
        Table::from_text_columns(
            "od_performance",
            &[
                ("o_zone_id", vec!["1"; n]),
                ("d_zone_id", vec!["2"; n]),
                ("total_distance_km", network),
                ("straight_line_distance_mile", vec!["1"; n]),
                ("straight_line_distance_km", vec!["1.60934"; n]),
                ("distance_ratio", ratio),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_missing_columns_warn() {
        let table = Table::from_text_columns("od_performance", &[("o_zone_id", vec!["1"])]).unwrap();
        let results = check_distance_metrics(&table, &Exporter::disabled()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status(), ValidationStatus::Warning);
        assert!(results[0].message().starts_with("Missing distance columns in od_performance.csv: d_zone_id"));
    }

    #[test]
    fn test_consistent_rows_only_report_stats() {
        let table = od(vec!["1.2", "2"], vec!["1.931208", "3.21868"]);
        let results = check_distance_metrics(&table, &Exporter::disabled()).unwrap();
        assert_eq!(results.len(), 1, "{results:?}");
        assert_eq!(
            results[0].message(),
            "Distance ratio statistics: Min=1.2000, Max=2.0000, Avg=1.6000, Median=1.6000"
        );
    }

    #[test]
    fn test_intra_zonal_rows_are_not_errors() {
        let table = Table::from_text_columns(
            "od_performance",
            &[
                ("o_zone_id", vec!["1", "1"]),
                ("d_zone_id", vec!["1", "2"]),
                ("total_distance_km", vec!["0", "1.931208"]),
                ("straight_line_distance_mile", vec!["0", "1"]),
                ("straight_line_distance_km", vec!["0", "1.60934"]),
                ("distance_ratio", vec!["1.0", "1.2"]),
            ],
        )
        .unwrap();
        let results = check_distance_metrics(&table, &Exporter::disabled()).unwrap();
        assert!(!results.iter().any(ValidationResult::is_error), "{results:?}");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status(), ValidationStatus::Info);
    }

    #[test]
    fn test_low_and_high_ratios_are_exported() {
        let dir = TempDir::new().unwrap();
        let table = od(vec!["0.5", "6", ""], vec!["0.80467", "9.65604", "1"]);
        let results = check_distance_metrics(&table, &Exporter::new(dir.path(), true)).unwrap();
        let messages: Vec<&str> = results.iter().map(ValidationResult::message).collect();
        assert!(messages.contains(&"Found 1 OD pairs with missing distance values"));
        assert!(messages.iter().any(|m| m.starts_with("Found 1 OD pairs with impossibly low")));
        assert!(messages.iter().any(|m| m.starts_with("Found 1 OD pairs with very high")));
        assert!(messages.last().unwrap().starts_with("Exported 2 OD pairs"));

        let exported = fs::read_to_string(dir.path().join(PROBLEMATIC_OD_DISTANCES)).unwrap();
        assert_eq!(exported.lines().count(), 3);
        assert!(exported.starts_with("o_zone_id,d_zone_id,total_distance_km,"));
    }
}
