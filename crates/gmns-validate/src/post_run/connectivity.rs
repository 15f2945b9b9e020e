//! OD connectivity: od_performance.csv against the demand that was loaded.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use gmns_ingest::{Dataset, Table};
use gmns_model::ValidationResult;
use serde_json::json;

use crate::checks::odme::demand_files;
use crate::error::{CheckError, Result};
use crate::export::{DISCONNECTED_OD_PAIRS, Exporter};
use crate::post_run::absorb;
use crate::post_run::distance::check_distance_metrics;
use crate::util::{MAX_IDS, mean};

const FIELD: &str = "accessibility";
const REQUIRED_COLUMNS: [&str; 6] = [
    "o_zone_id",
    "d_zone_id",
    "total_distance_km",
    "total_free_flow_travel_time",
    "total_congestion_travel_time",
    "volume",
];
const MIN_ACCESSIBLE_ZONES: usize = 5;
const SIGNIFICANT_VOLUME: f64 = 10.0;
const MAX_DISCONNECTED_PERCENT: f64 = 5.0;
const TOP_OVERALL_PAIRS: usize = 20;

type OdPair = (i64, i64);

/// Validate od_performance.csv and check demand pairs have a feasible path.
pub fn validate_od_connectivity(
    od: &Table,
    mode_type: &Dataset,
    working_dir: &Path,
    exporter: &Exporter,
) -> Result<Vec<ValidationResult>> {
    let missing = od.missing_fields(&REQUIRED_COLUMNS);
    if !missing.is_empty() {
        return Ok(vec![
            ValidationResult::error(format!(
                "Missing required columns in od_performance.csv: {}",
                missing.join(", ")
            ))
            .with_field(FIELD)
            .with_details(json!({ "missing_columns": missing })),
        ]);
    }

    let origins = od.require_ints("o_zone_id")?;
    let destinations = od.require_ints("d_zone_id")?;
    let total_volume: f64 = od.require_floats("volume")?.into_iter().flatten().sum();
    let unique_origins = origins.iter().flatten().collect::<HashSet<_>>().len();
    let unique_destinations = destinations.iter().flatten().collect::<HashSet<_>>().len();

    let mut results = vec![
        ValidationResult::info(format!(
            "OD Performance statistics: {} OD pairs, {unique_origins} origins, {unique_destinations} destinations, {total_volume:.1} total volume",
            od.height()
        ))
        .with_field(FIELD)
        .with_details(json!({
            "total_od_pairs": od.height(),
            "unique_origins": unique_origins,
            "unique_destinations": unique_destinations,
            "total_volume": total_volume,
        })),
    ];

    let non_positive = |column: &str| -> Result<usize> {
        Ok(od.require_floats(column)?.into_iter().flatten().filter(|v| *v <= 0.0).count())
    };
    let bad_time = non_positive("total_congestion_travel_time")?;
    if bad_time > 0 {
        results.push(
            ValidationResult::error(format!(
                "Found {bad_time} OD pairs with zero or negative congestion travel time"
            ))
            .with_field(FIELD)
            .with_details(json!({ "unreasonable_time_count": bad_time })),
        );
    }
    let bad_distance = non_positive("total_distance_km")?;
    if bad_distance > 0 {
        results.push(
            ValidationResult::error(format!(
                "Found {bad_distance} OD pairs with zero or negative distance"
            ))
            .with_field(FIELD)
            .with_details(json!({ "unreasonable_dist_count": bad_distance })),
        );
    }

    if od.has_field("distance_ratio") && od.has_field("straight_line_distance_km") {
        results.extend(absorb(
            "Error validating OD distance metrics",
            "accessibility_distance",
            check_distance_metrics(od, exporter),
        ));
    }

    let pairs: Vec<OdPair> = origins
        .iter()
        .zip(&destinations)
        .filter_map(|(o, d)| Some(((*o)?, (*d)?)))
        .collect();
    results.extend(accessibility_metrics(&pairs));

    let connected: HashSet<OdPair> = pairs.into_iter().collect();
    results.extend(check_demand_connectivity(&connected, mode_type, working_dir, exporter));
    Ok(results)
}

/// Destinations reachable per origin and origins reaching each destination.
fn accessibility_metrics(pairs: &[OdPair]) -> Vec<ValidationResult> {
    let mut per_origin: BTreeMap<i64, usize> = BTreeMap::new();
    let mut per_destination: BTreeMap<i64, usize> = BTreeMap::new();
    for (o, d) in pairs {
        *per_origin.entry(*o).or_default() += 1;
        *per_destination.entry(*d).or_default() += 1;
    }

    let poorly_served = |counts: &BTreeMap<i64, usize>| -> Vec<i64> {
        counts
            .iter()
            .filter(|(_, count)| **count < MIN_ACCESSIBLE_ZONES)
            .map(|(zone, _)| *zone)
            .collect()
    };

    let mut results = Vec::new();
    let poor_origins = poorly_served(&per_origin);
    if !poor_origins.is_empty() {
        results.push(
            ValidationResult::warning(format!(
                "Found {} origins with poor accessibility (< {MIN_ACCESSIBLE_ZONES} destinations)",
                poor_origins.len()
            ))
            .with_field(FIELD)
            .with_details(json!({ "poor_access_origins": &poor_origins[..poor_origins.len().min(MAX_IDS)] })),
        );
    }
    let poor_destinations = poorly_served(&per_destination);
    if !poor_destinations.is_empty() {
        results.push(
            ValidationResult::warning(format!(
                "Found {} destinations with poor reachability (< {MIN_ACCESSIBLE_ZONES} origins)",
                poor_destinations.len()
            ))
            .with_field(FIELD)
            .with_details(json!({
                "poor_reach_dests": &poor_destinations[..poor_destinations.len().min(MAX_IDS)]
            })),
        );
    }

    let average = |counts: &BTreeMap<i64, usize>| {
        let values: Vec<f64> = counts.values().map(|count| *count as f64).collect();
        mean(&values)
    };
    if let (Some(avg_destinations), Some(avg_origins)) = (average(&per_origin), average(&per_destination)) {
        results.push(
            ValidationResult::info(format!(
                "Accessibility metrics: Avg destinations per origin = {avg_destinations:.1}, Avg origins per destination = {avg_origins:.1}"
            ))
            .with_field(FIELD)
            .with_details(json!({
                "avg_accessible_destinations": avg_destinations,
                "avg_reachable_origins": avg_origins,
            })),
        );
    }
    results
}

#[derive(Debug, Clone)]
struct DisconnectedPair {
    o_zone: i64,
    d_zone: i64,
    volume: f64,
    demand_file: String,
}

impl DisconnectedPair {
    fn describe(&self) -> String {
        format!("O={}, D={}, Volume={:.1}", self.o_zone, self.d_zone, self.volume)
    }
}

/// Totals of one demand file's pairs against the connected set.
#[derive(Debug, Default)]
struct DemandTally {
    pairs: usize,
    significant: usize,
    volume: f64,
    disconnected: Vec<DisconnectedPair>,
}

impl DemandTally {
    fn disconnected_volume(&self) -> f64 {
        self.disconnected.iter().map(|pair| pair.volume).sum()
    }

    fn merge(&mut self, other: Self) {
        self.pairs += other.pairs;
        self.significant += other.significant;
        self.volume += other.volume;
        self.disconnected.extend(other.disconnected);
    }
}

fn by_volume_desc(pairs: &[DisconnectedPair]) -> Vec<&DisconnectedPair> {
    let mut sorted: Vec<&DisconnectedPair> = pairs.iter().collect();
    sorted.sort_by(|a, b| b.volume.total_cmp(&a.volume));
    sorted
}

fn tally_demand(demand: &Table, demand_file: &str, connected: &HashSet<OdPair>) -> Result<DemandTally> {
    let origins = demand.require_ints("o_zone_id")?;
    let destinations = demand.require_ints("d_zone_id")?;
    let volumes = demand.require_floats("volume")?;

    let mut tally = DemandTally {
        pairs: demand.height(),
        ..DemandTally::default()
    };
    for ((o, d), volume) in origins.iter().zip(&destinations).zip(&volumes) {
        let volume = volume.unwrap_or_default();
        tally.volume += volume;
        if volume <= SIGNIFICANT_VOLUME {
            continue;
        }
        tally.significant += 1;
        let (Some(o_zone), Some(d_zone)) = (*o, *d) else {
            continue;
        };
        if !connected.contains(&(o_zone, d_zone)) {
            tally.disconnected.push(DisconnectedPair {
                o_zone,
                d_zone,
                volume,
                demand_file: demand_file.to_string(),
            });
        }
    }
    Ok(tally)
}

/// Every demand pair with volume > 10 must appear in od_performance.csv.
fn check_demand_connectivity(
    connected: &HashSet<OdPair>,
    mode_type: &Dataset,
    working_dir: &Path,
    exporter: &Exporter,
) -> Vec<ValidationResult> {
    let Some(mode_type) = mode_type.table() else {
        return vec![
            ValidationResult::warning(
                "mode_type.csv not loaded. Cannot check demand-performance connectivity.",
            )
            .with_field(FIELD),
        ];
    };
    let Some(files) = demand_files(mode_type) else {
        return vec![
            ValidationResult::warning(
                "mode_type.csv does not contain demand_file column. Cannot check demand-performance connectivity.",
            )
            .with_field(FIELD),
        ];
    };

    let mut results = Vec::new();
    let mut overall = DemandTally::default();
    for demand_file in files {
        let path = working_dir.join(&demand_file);
        if !path.is_file() {
            results.push(
                ValidationResult::warning(format!(
                    "Demand file {demand_file} specified in mode_type.csv not found"
                ))
                .with_field(FIELD)
                .with_details(json!({ "missing_file": demand_file })),
            );
            continue;
        }

        let tally = Table::read("demand", &path)
            .map_err(CheckError::from)
            .and_then(|demand| {
                if demand.missing_fields(&["o_zone_id", "d_zone_id", "volume"]).is_empty() {
                    tally_demand(&demand, &demand_file, connected).map(Some)
                } else {
                    Ok(None)
                }
            });
        let tally = match tally {
            Ok(Some(tally)) => tally,
            Ok(None) => {
                results.push(
                    ValidationResult::error(format!(
                        "Demand file {demand_file} is missing required columns"
                    ))
                    .with_field(FIELD)
                    .with_details(json!({ "file": demand_file })),
                );
                continue;
            }
            Err(err) => {
                results.push(
                    ValidationResult::error(format!(
                        "Error checking connectivity for demand file {demand_file}: {err}"
                    ))
                    .with_field(FIELD)
                    .with_details(json!({ "file": demand_file, "error": err.to_string() })),
                );
                continue;
            }
        };

        if tally.disconnected.is_empty() {
            results.push(
                ValidationResult::success(format!(
                    "Demand file {demand_file}: All significant OD pairs have feasible paths"
                ))
                .with_field(FIELD)
                .with_details(json!({ "file": demand_file })),
            );
        } else {
            let top: Vec<String> = by_volume_desc(&tally.disconnected)
                .into_iter()
                .take(MAX_IDS)
                .map(DisconnectedPair::describe)
                .collect();
            let volume = tally.disconnected_volume();
            tracing::warn!(
                file = %demand_file,
                disconnected = tally.disconnected.len(),
                "demand pairs without a feasible path"
            );
            results.push(
                ValidationResult::error(format!(
                    "Demand file {demand_file}: {} significant OD pairs ({volume:.1} trips) have no feasible path",
                    tally.disconnected.len()
                ))
                .with_field(FIELD)
                .with_details(json!({
                    "file": demand_file,
                    "disconnected_count": tally.disconnected.len(),
                    "disconnected_volume": volume,
                    "disconnected_percentage": 100.0 * tally.disconnected.len() as f64 / tally.significant.max(1) as f64,
                    "disconnected_pairs": top,
                })),
            );
        }
        overall.merge(tally);
    }

    if overall.pairs > 0 {
        results.extend(overall_connectivity(&overall, exporter));
    }
    results
}

fn overall_connectivity(overall: &DemandTally, exporter: &Exporter) -> Vec<ValidationResult> {
    let count = overall.disconnected.len();
    if count == 0 {
        return vec![
            ValidationResult::success(
                "Overall network connectivity: All significant OD pairs have feasible paths",
            )
            .with_field(FIELD),
        ];
    }

    let disconnected_percent = 100.0 * count as f64 / overall.significant.max(1) as f64;
    let volume = overall.disconnected_volume();
    let volume_percent = 100.0 * volume / overall.volume.max(1.0);
    let top: Vec<String> = by_volume_desc(&overall.disconnected)
        .into_iter()
        .take(TOP_OVERALL_PAIRS)
        .map(|pair| format!("{}, File={}", pair.describe(), pair.demand_file))
        .collect();

    let message = format!(
        "Overall network connectivity: {count} significant OD pairs ({disconnected_percent:.1}%) with {volume:.1} trips ({volume_percent:.1}%) have no feasible path"
    );
    let result = if disconnected_percent > MAX_DISCONNECTED_PERCENT {
        ValidationResult::error(message)
    } else {
        ValidationResult::warning(message)
    };
    tracing::info!(disconnected = count, percent = disconnected_percent, "demand connectivity checked");
    let mut results = vec![
        result.with_field(FIELD).with_details(json!({
            "disconnected_count": count,
            "disconnected_percentage": disconnected_percent,
            "disconnected_volume": volume,
            "disconnected_volume_percentage": volume_percent,
            "top_disconnected_pairs": top,
        })),
    ];

    let rows = overall.disconnected.iter().map(|pair| {
        vec![
            pair.o_zone.to_string(),
            pair.d_zone.to_string(),
            pair.volume.to_string(),
            pair.demand_file.clone(),
        ]
    });
    results.extend(exporter.report(
        DISCONNECTED_OD_PAIRS,
        &["o_zone_id", "d_zone_id", "volume", "demand_file"],
        rows,
        FIELD,
        |path| {
            format!(
                "Complete list of {count} disconnected OD pairs written to {}",
                path.display()
            )
        },
    ));
    results
}
