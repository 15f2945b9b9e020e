//! Drill-down of the heaviest demand pairs against engine outputs.

use gmns_ingest::Table;
use gmns_model::ValidationResult;

use crate::error::Result;
use crate::util::{num, percentile};

const TOP_PAIRS: usize = 10;
const MAX_VOLUME_DEVIATION: f64 = 0.1;
const TRAVEL_TIME_BAND: (f64, f64) = (0.05, 0.95);
const FIELD: &str = "od_assignment";

#[derive(Debug, Clone, Copy, PartialEq)]
struct DemandPair {
    o_zone: i64,
    d_zone: i64,
    volume: f64,
}

/// The `TOP_PAIRS` demand records with the largest volume, ties in file order.
fn top_demand(demand: &Table) -> Result<Vec<DemandPair>> {
    let origins = demand.require_ints("o_zone_id")?;
    let destinations = demand.require_ints("d_zone_id")?;
    let volumes = demand.require_floats("volume")?;
    let mut pairs: Vec<DemandPair> = origins
        .into_iter()
        .zip(destinations)
        .zip(volumes)
        .filter_map(|((o, d), volume)| {
            Some(DemandPair {
                o_zone: o?,
                d_zone: d?,
                volume: volume?,
            })
        })
        .collect();
    pairs.sort_by(|a, b| b.volume.total_cmp(&a.volume));
    pairs.truncate(TOP_PAIRS);
    Ok(pairs)
}

/// Rows of `table` keyed by zone pair, with the value of `column`.
fn zone_pair_values(table: &Table, column: &str) -> Result<Vec<(i64, i64, f64)>> {
    let origins = table.require_ints("o_zone_id")?;
    let destinations = table.require_ints("d_zone_id")?;
    let values = table.require_floats(column)?;
    Ok(origins
        .into_iter()
        .zip(destinations)
        .zip(values)
        .filter_map(|((o, d), value)| Some((o?, d?, value?)))
        .collect())
}

/// Compare top demand pairs with assigned volumes and route travel times.
///
/// `demand` is `None` when no demand file was loaded; the drill-down then
/// stops after a single WARNING.
pub fn validate_post_od(
    demand: Option<&Table>,
    od_performance: Option<&Table>,
    route_assignment: Option<&Table>,
) -> Result<Vec<ValidationResult>> {
    let Some(demand) = demand else {
        return Ok(vec![
            ValidationResult::warning("demand.csv not found. Cannot perform post-OD assignment validation.")
                .with_field(FIELD),
        ]);
    };
    if !demand.missing_fields(&["o_zone_id", "d_zone_id", "volume"]).is_empty() {
        return Ok(vec![
            ValidationResult::error("demand.csv is missing required columns (o_zone_id, d_zone_id, volume).")
                .with_field(FIELD),
        ]);
    }
    let top = top_demand(demand)?;

    let mut results = Vec::new();
    match od_performance {
        None => results.push(
            ValidationResult::warning("od_performance.csv not found. Cannot compare assigned volumes.")
                .with_field(FIELD),
        ),
        Some(od) if !od.missing_fields(&["o_zone_id", "d_zone_id", "assigned_volume"]).is_empty() => {
            results.push(
                ValidationResult::error(
                    "od_performance.csv is missing required columns (o_zone_id, d_zone_id, assigned_volume).",
                )
                .with_field(FIELD),
            );
        }
        Some(od) => results.extend(volume_deviations(&top, &zone_pair_values(od, "assigned_volume")?)),
    }

    match route_assignment {
        None => results.push(
            ValidationResult::warning(
                "route_assignment.csv not found. Cannot analyze travel time for top OD pairs.",
            )
            .with_field("route_assignment"),
        ),
        Some(routes)
            if !routes
                .missing_fields(&["o_zone_id", "d_zone_id", "travel_time", "volume"])
                .is_empty() =>
        {
            results.push(
                ValidationResult::error(
                    "route_assignment.csv is missing required columns (o_zone_id, d_zone_id, travel_time, volume).",
                )
                .with_field("route_assignment"),
            );
        }
        Some(routes) => {
            let all_times: Vec<f64> = routes.require_floats("travel_time")?.into_iter().flatten().collect();
            results.extend(travel_time_outliers(
                &top,
                &zone_pair_values(routes, "travel_time")?,
                &all_times,
            ));
        }
    }
    Ok(results)
}

fn volume_deviations(top: &[DemandPair], assigned: &[(i64, i64, f64)]) -> Vec<ValidationResult> {
    let mut results = Vec::new();
    for pair in top {
        for (_, _, assigned_volume) in assigned
            .iter()
            .filter(|(o, d, _)| *o == pair.o_zone && *d == pair.d_zone)
        {
            let difference = pair.volume - assigned_volume;
            if difference.abs() > MAX_VOLUME_DEVIATION * pair.volume {
                results.push(
                    ValidationResult::warning(format!(
                        "Significant volume deviation for OD ({} -> {}): Expected {}, Assigned {}, Difference {}",
                        pair.o_zone,
                        pair.d_zone,
                        num(pair.volume),
                        num(*assigned_volume),
                        num(difference)
                    ))
                    .with_field(FIELD),
                );
            }
        }
    }
    results
}

fn travel_time_outliers(
    top: &[DemandPair],
    route_times: &[(i64, i64, f64)],
    all_times: &[f64],
) -> Vec<ValidationResult> {
    let (low_q, high_q) = TRAVEL_TIME_BAND;
    let (Some(low), Some(high)) = (percentile(all_times, low_q), percentile(all_times, high_q)) else {
        return Vec::new();
    };
    let mut results = Vec::new();
    for pair in top {
        for (_, _, time) in route_times
            .iter()
            .filter(|(o, d, _)| *o == pair.o_zone && *d == pair.d_zone)
        {
            if *time < low || *time > high {
                results.push(
                    ValidationResult::warning(format!(
                        "Unusual travel time for OD ({} -> {}): Travel time {} out of range ({}, {})",
                        pair.o_zone,
                        pair.d_zone,
                        num(*time),
                        num(low),
                        num(high)
                    ))
                    .with_field("route_assignment"),
                );
            }
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use gmns_model::ValidationStatus;

    fn demand() -> Table {
        Table::from_text_columns(
            "demand",
            &[
                ("o_zone_id", vec!["1", "1", "2"]),
                ("d_zone_id", vec!["2", "3", "1"]),
                ("volume", vec!["100", "50", "200"]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_missing_demand_stops() {
        let results = validate_post_od(None, None, None).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(
            results[0].message(),
            "demand.csv not found. Cannot perform post-OD assignment validation."
        );
    }

    #[test]
    fn test_missing_outputs_warn() {
        let demand = demand();
        let results = validate_post_od(Some(&demand), None, None).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.status() == ValidationStatus::Warning));
    }

    #[test]
    fn test_volume_deviation() {
        let demand = demand();
        let od = Table::from_text_columns(
            "od_performance",
            &[
                ("o_zone_id", vec!["1", "2"]),
                ("d_zone_id", vec!["2", "1"]),
                ("assigned_volume", vec!["80", "195"]),
            ],
        )
        .unwrap();
        let results = validate_post_od(Some(&demand), Some(&od), None).unwrap();
        assert_eq!(
            results[0].message(),
            "Significant volume deviation for OD (1 -> 2): Expected 100, Assigned 80, Difference 20"
        );
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_travel_time_band() {
        let demand = demand();
        let routes = Table::from_text_columns(
            "route_assignment",
            &[
                ("o_zone_id", vec!["1", "2", "5", "5", "5"]),
                ("d_zone_id", vec!["2", "1", "6", "6", "6"]),
                ("travel_time", vec!["1", "3", "2", "4", "5"]),
                ("volume", vec!["1", "1", "1", "1", "1"]),
            ],
        )
        .unwrap();
        let results = validate_post_od(Some(&demand), None, Some(&routes)).unwrap();
        let unusual: Vec<&str> = results
            .iter()
            .map(ValidationResult::message)
            .filter(|m| m.starts_with("Unusual"))
            .collect();
        assert_eq!(
            unusual,
            vec!["Unusual travel time for OD (1 -> 2): Travel time 1 out of range (1.2, 4.8)"]
        );
    }
}
