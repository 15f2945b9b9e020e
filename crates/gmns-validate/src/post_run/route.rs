//! route_assignment.csv: route counts, choice probabilities and congestion.

use std::collections::BTreeMap;

use gmns_ingest::Table;
use gmns_model::ValidationResult;
use serde_json::{Value, json};

use crate::error::Result;
use crate::util::{MAX_EXAMPLES, mean, percent, row_labels};

const FIELD: &str = "route_assignment";
const REQUIRED_COLUMNS: [&str; 8] = [
    "o_zone_id",
    "d_zone_id",
    "distance_mile",
    "total_distance_km",
    "total_free_flow_travel_time",
    "total_travel_time",
    "volume",
    "prob",
];
const PROBABILITY_TOLERANCE: f64 = 0.01;
const MAX_CONGESTION_RATIO: f64 = 5.0;
const MIN_CONGESTION_RATIO: f64 = 0.99;

#[derive(Debug, Default)]
struct OdRoutes {
    routes: usize,
    probability: f64,
}

/// Validate one route_assignment table.
pub fn validate_route_assignment(routes: &Table) -> Result<Vec<ValidationResult>> {
    let missing = routes.missing_fields(&REQUIRED_COLUMNS);
    if !missing.is_empty() {
        return Ok(vec![
            ValidationResult::error(format!(
                "Missing required columns in route_assignment.csv: {}",
                missing.join(", ")
            ))
            .with_field(FIELD)
            .with_details(json!({ "missing_columns": missing })),
        ]);
    }

    let origins = routes.require_ints("o_zone_id")?;
    let destinations = routes.require_ints("d_zone_id")?;
    let probabilities = routes.require_floats("prob")?;
    let travel_times = routes.require_floats("total_travel_time")?;
    let free_flow_times = routes.require_floats("total_free_flow_travel_time")?;

    let mut by_od: BTreeMap<(i64, i64), OdRoutes> = BTreeMap::new();
    for ((o, d), prob) in origins.iter().zip(&destinations).zip(&probabilities) {
        let (Some(o), Some(d)) = (*o, *d) else {
            continue;
        };
        let entry = by_od.entry((o, d)).or_default();
        entry.routes += 1;
        entry.probability += prob.unwrap_or_default();
    }

    // 1. Route counts
    let total_routes = routes.height();
    let od_pairs = by_od.len();
    let avg_routes = if od_pairs > 0 {
        total_routes as f64 / od_pairs as f64
    } else {
        0.0
    };
    let mut results = vec![
        ValidationResult::info(format!(
            "Route assignment statistics: {total_routes} routes for {od_pairs} OD pairs (avg {avg_routes:.2} routes per OD)"
        ))
        .with_field(FIELD)
        .with_details(json!({
            "total_routes": total_routes,
            "unique_od_pairs": od_pairs,
            "avg_routes_per_od": avg_routes,
        })),
    ];

    let multiple = by_od.values().filter(|od| od.routes > 1).count();
    if multiple > 0 {
        let multiple_percent = percent(multiple, od_pairs);
        results.push(
            ValidationResult::info(format!(
                "Found {multiple} OD pairs ({multiple_percent:.1}%) with multiple route choices"
            ))
            .with_field(FIELD)
            .with_details(json!({
                "multiple_route_count": multiple,
                "multiple_route_percent": multiple_percent,
            })),
        );
    }

    // 2. Choice probabilities per OD pair
    let invalid: Vec<(&(i64, i64), f64)> = by_od
        .iter()
        .map(|(od, routes)| (od, routes.probability))
        .filter(|(_, total)| (total - 1.0).abs() > PROBABILITY_TOLERANCE)
        .collect();
    if !invalid.is_empty() {
        let examples: Vec<Value> = invalid
            .iter()
            .take(MAX_EXAMPLES)
            .map(|((o, d), total)| json!([o, d, total]))
            .collect();
        results.push(
            ValidationResult::error(format!(
                "Found {} OD pairs where route probabilities don't sum to 1.0",
                invalid.len()
            ))
            .with_field(FIELD)
            .with_details(json!({
                "invalid_prob_count": invalid.len(),
                "example_ods": examples,
            })),
        );
    }

    // 3. Travel times
    let non_positive = travel_times.iter().flatten().filter(|t| **t <= 0.0).count();
    if non_positive > 0 {
        results.push(
            ValidationResult::error(format!(
                "Found {non_positive} routes with zero or negative travel time"
            ))
            .with_field(FIELD)
            .with_details(json!({ "unreasonable_time_count": non_positive })),
        );
    }

    // 4. Congestion ratio
    let o_labels = row_labels(routes, "o_zone_id");
    let d_labels = row_labels(routes, "d_zone_id");
    let ratios: Vec<(usize, f64)> = travel_times
        .iter()
        .zip(&free_flow_times)
        .enumerate()
        .filter_map(|(row, (time, free_flow))| Some((row, (*time)? / (*free_flow)?)))
        .filter(|(_, ratio)| !ratio.is_nan())
        .collect();
    let example = |row: usize, ratio: f64| json!([o_labels[row], d_labels[row], ratio]);

    let congested: Vec<&(usize, f64)> =
        ratios.iter().filter(|(_, ratio)| *ratio > MAX_CONGESTION_RATIO).collect();
    if !congested.is_empty() {
        let congested_percent = percent(congested.len(), total_routes);
        let examples: Vec<Value> = congested
            .iter()
            .take(MAX_EXAMPLES)
            .map(|(row, ratio)| example(*row, *ratio))
            .collect();
        results.push(
            ValidationResult::warning(format!(
                "Found {} routes ({congested_percent:.1}%) with extremely high congestion (>5x free flow time)",
                congested.len()
            ))
            .with_field(FIELD)
            .with_details(json!({
                "high_congestion_count": congested.len(),
                "high_congestion_percent": congested_percent,
                "example_routes": examples,
            })),
        );
    }

    let faster: Vec<&(usize, f64)> =
        ratios.iter().filter(|(_, ratio)| *ratio < MIN_CONGESTION_RATIO).collect();
    if !faster.is_empty() {
        let examples: Vec<Value> = faster
            .iter()
            .take(MAX_EXAMPLES)
            .map(|(row, ratio)| example(*row, *ratio))
            .collect();
        results.push(
            ValidationResult::error(format!(
                "Found {} routes with travel times faster than free flow",
                faster.len()
            ))
            .with_field(FIELD)
            .with_details(json!({
                "invalid_congestion_count": faster.len(),
                "example_routes": examples,
            })),
        );
    }

    let finite: Vec<f64> = ratios
        .iter()
        .map(|(_, ratio)| *ratio)
        .filter(|ratio| ratio.is_finite())
        .collect();
    if let Some(avg_congestion) = mean(&finite) {
        results.push(
            ValidationResult::info(format!(
                "Average congestion ratio (travel time / free flow time): {avg_congestion:.2}"
            ))
            .with_field(FIELD)
            .with_details(json!({ "avg_congestion": avg_congestion })),
        );
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gmns_model::ValidationStatus;

    fn routes(rows: &[(&str, &str, &str, &str, &str)]) -> Table {
        let n = rows.len();
        Table::from_text_columns(
            "route_assignment",
            &[
                ("o_zone_id", rows.iter().map(|r| r.0).collect()),
                ("d_zone_id", rows.iter().map(|r| r.1).collect()),
                ("distance_mile", vec!["1"; n]),
                ("total_distance_km", vec!["1.6"; n]),
                ("total_free_flow_travel_time", rows.iter().map(|r| r.2).collect()),
                ("total_travel_time", rows.iter().map(|r| r.3).collect()),
                ("volume", vec!["10"; n]),
                ("prob", rows.iter().map(|r| r.4).collect()),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_valid_routes() {
        let table = routes(&[
            ("1", "2", "10", "12", "0.6"),
            ("1", "2", "10", "15", "0.4"),
            ("2", "1", "10", "10", "1"),
        ]);
        let results = validate_route_assignment(&table).unwrap();
        let messages: Vec<&str> = results.iter().map(ValidationResult::message).collect();
        assert_eq!(
            messages,
            vec![
                "Route assignment statistics: 3 routes for 2 OD pairs (avg 1.50 routes per OD)",
                "Found 1 OD pairs (50.0%) with multiple route choices",
                "Average congestion ratio (travel time / free flow time): 1.23",
            ]
        );
    }

    #[test]
    fn test_probability_and_congestion_errors() {
        let table = routes(&[
            ("1", "2", "10", "60", "0.5"),
            ("2", "1", "10", "5", "1"),
            ("3", "1", "10", "0", "1"),
        ]);
        let results = validate_route_assignment(&table).unwrap();
        let prob = results.iter().find(|r| r.message().contains("probabilities")).unwrap();
        assert_eq!(prob.detail("example_ods"), Some(&json!([[1, 2, 0.5]])));

        let congested = results.iter().find(|r| r.message().contains("extremely high")).unwrap();
        assert_eq!(congested.status(), ValidationStatus::Warning);
        assert_eq!(
            congested.message(),
            "Found 1 routes (33.3%) with extremely high congestion (>5x free flow time)"
        );

        let faster = results.iter().find(|r| r.message().contains("faster than free flow")).unwrap();
        assert_eq!(faster.message(), "Found 2 routes with travel times faster than free flow");
        assert!(results.iter().any(|r| r.message() == "Found 1 routes with zero or negative travel time"));
    }

    #[test]
    fn test_missing_columns() {
        let table = Table::from_text_columns("route_assignment", &[("o_zone_id", vec!["1"])]).unwrap();
        let results = validate_route_assignment(&table).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_error());
    }
}
