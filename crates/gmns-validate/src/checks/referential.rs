//! Cross-file checks: link endpoints, zone centroids, connectors and demand zones.

use std::collections::{BTreeSet, HashSet};

use gmns_ingest::Table;
use gmns_model::ValidationResult;
use gmns_standards::DEMAND_COLUMNS;
use serde_json::json;

use crate::checks::structural::is_non_decreasing;
use crate::util::MAX_IDS;

/// ERROR per endpoint column referencing ids absent from the node file.
pub fn check_link_endpoints(node: &Table, link: &Table) -> Vec<ValidationResult> {
    let (Some(node_ids), Some(from), Some(to)) = (
        node.ints("node_id"),
        link.ints("from_node_id"),
        link.ints("to_node_id"),
    ) else {
        return Vec::new();
    };
    let node_ids: HashSet<i64> = node_ids.into_iter().flatten().collect();

    let mut results = Vec::new();
    for (field, ids) in [("from_node_id", from), ("to_node_id", to)] {
        let mut seen = HashSet::new();
        let missing: Vec<i64> = ids
            .into_iter()
            .flatten()
            .filter(|id| !node_ids.contains(id) && seen.insert(*id))
            .collect();
        if !missing.is_empty() {
            results.push(
                ValidationResult::error(format!(
                    "Links reference {field} values that don't exist in node file"
                ))
                .with_field(field)
                .with_details(json!({
                    "missing_count": missing.len(),
                    "missing_node_ids": &missing[..missing.len().min(MAX_IDS)],
                })),
            );
        }
    }
    results
}

/// Node rows in file order, reduced to the ids the centroid rules need.
///
/// Row position is the physical row order of the node file; it is never
/// re-indexed.
#[derive(Debug, Clone)]
pub struct CentroidLayout {
    rows: Vec<(Option<i64>, Option<i64>)>,
}

impl CentroidLayout {
    /// `None` when node_id or zone_id is missing.
    pub fn from_table(node: &Table) -> Option<Self> {
        let node_ids = node.ints("node_id")?;
        let zone_ids = node.ints("zone_id")?;
        Some(Self {
            rows: node_ids.into_iter().zip(zone_ids).collect(),
        })
    }

    fn is_centroid(row: &(Option<i64>, Option<i64>)) -> bool {
        matches!(row, (Some(node_id), Some(zone_id)) if node_id == zone_id)
    }

    pub fn total(&self) -> usize {
        self.rows.len()
    }

    /// Node ids of rows where node_id equals zone_id, in file order.
    pub fn centroid_ids(&self) -> Vec<i64> {
        self.rows
            .iter()
            .filter(|row| Self::is_centroid(row))
            .filter_map(|(node_id, _)| *node_id)
            .collect()
    }

    fn centroid_positions(&self) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| Self::is_centroid(row))
            .map(|(idx, _)| idx)
            .collect()
    }

    fn first_non_centroid_position(&self) -> Option<usize> {
        self.rows.iter().position(|row| !Self::is_centroid(row))
    }

    /// Smallest node_id among non-centroid rows.
    pub fn first_through_node(&self) -> Option<i64> {
        self.rows
            .iter()
            .filter(|row| !Self::is_centroid(row))
            .filter_map(|(node_id, _)| *node_id)
            .min()
    }

    /// Distinct nonzero zone ids that have no node with node_id == zone_id.
    pub fn missing_centroid_zones(&self) -> Vec<i64> {
        let centroids: HashSet<i64> = self.centroid_ids().into_iter().collect();
        self.rows
            .iter()
            .filter_map(|(_, zone_id)| *zone_id)
            .filter(|zone_id| *zone_id != 0 && !centroids.contains(zone_id))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn zero_zone_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|(_, zone_id)| *zone_id == Some(0))
            .count()
    }
}

/// Centroid presence, placement and ordering.
pub fn check_centroid_structure(node: Option<&Table>) -> Vec<ValidationResult> {
    let Some(layout) = node.and_then(CentroidLayout::from_table) else {
        return vec![
            ValidationResult::error("Cannot check zone centroid structure: required columns missing")
                .with_field("zone_id"),
        ];
    };
    let mut results = Vec::new();

    let zero_zone_count = layout.zero_zone_count();
    if zero_zone_count > 0 {
        results.push(
            ValidationResult::info(format!(
                "Found {zero_zone_count} nodes with zone_id = 0 (exempt from centroid checks)"
            ))
            .with_field("zone_id"),
        );
    }

    let centroid_positions = layout.centroid_positions();
    if centroid_positions.is_empty() {
        results.push(
            ValidationResult::error("No zone centroids found (nodes where node_id == zone_id)")
                .with_field("zone_id"),
        );
        return results;
    }

    let missing = layout.missing_centroid_zones();
    if !missing.is_empty() {
        results.push(
            ValidationResult::error(format!(
                "Found {} zone_id values without corresponding node_id = zone_id",
                missing.len()
            ))
            .with_field("zone_id")
            .with_details(json!({
                "missing_centroid_count": missing.len(),
                "missing_centroid_zones": &missing[..missing.len().min(MAX_IDS)],
            })),
        );
    }

    if let Some(first_physical) = layout.first_non_centroid_position() {
        let first_centroid = centroid_positions[0];
        let last_centroid = centroid_positions[centroid_positions.len() - 1];
        if last_centroid > first_physical {
            let contiguous = last_centroid - first_centroid + 1 == centroid_positions.len();
            let message = if contiguous {
                "Zone centroids are not listed as the first block in node file"
            } else {
                "Zone centroids are scattered throughout the node file, not in a contiguous block"
            };
            results.push(ValidationResult::error(message).with_field("zone_id"));
        } else if is_non_decreasing(&layout.centroid_ids()) {
            results.push(
                ValidationResult::success(
                    "Zone centroids are correctly listed before physical nodes in non-decreasing order",
                )
                .with_field("zone_id"),
            );
        } else {
            results.push(
                ValidationResult::warning("Zone centroids are not in non-decreasing order by node_id")
                    .with_field("node_id"),
            );
        }
    }

    results.push(
        ValidationResult::info(format!(
            "Found {} zone centroids out of {} total nodes",
            centroid_positions.len(),
            layout.total()
        ))
        .with_field("zone_id"),
    );
    results
}

/// Connector links: exactly one endpoint is a zone centroid.
pub fn check_connectors(node: Option<&Table>, link: &Table) -> Vec<ValidationResult> {
    let Some(layout) = node.and_then(CentroidLayout::from_table) else {
        return Vec::new();
    };
    let (Some(from), Some(to)) = (link.ints("from_node_id"), link.ints("to_node_id")) else {
        return Vec::new();
    };

    let centroids: HashSet<i64> = layout.centroid_ids().into_iter().collect();
    if centroids.is_empty() {
        return vec![
            ValidationResult::warning("No zone centroids found, can't identify connectors")
                .with_field("zone_id"),
        ];
    }

    let mut results = Vec::new();
    match layout.first_through_node() {
        Some(first) => results.push(
            ValidationResult::info(format!("First through node identified as node_id={first}"))
                .with_field("node_id")
                .with_details(json!({ "first_through_node": first })),
        ),
        None => results.push(
            ValidationResult::info("No physical nodes found, network contains only zone centroids")
                .with_field("node_id"),
        ),
    }

    let is_centroid = |id: &Option<i64>| id.is_some_and(|id| centroids.contains(&id));
    let mut connector_count = 0usize;
    let mut centroid_link_count = 0usize;
    for (from_id, to_id) in from.iter().zip(&to) {
        match (is_centroid(from_id), is_centroid(to_id)) {
            (true, true) => centroid_link_count += 1,
            (true, false) | (false, true) => connector_count += 1,
            (false, false) => {}
        }
    }

    results.push(
        ValidationResult::info(format!(
            "Identified {connector_count} connector links between zone centroids and physical nodes"
        ))
        .with_field("link_id")
        .with_details(json!({ "connector_count": connector_count })),
    );
    if centroid_link_count > 0 {
        results.push(
            ValidationResult::info(format!(
                "Found {centroid_link_count} links directly connecting zone centroids to other zone centroids"
            ))
            .with_field("link_id")
            .with_details(json!({ "centroid_links_count": centroid_link_count })),
        );
    }
    results
}

/// Demand columns must be exactly o_zone_id, d_zone_id, volume, in that order.
pub fn check_demand_shape(demand: &Table) -> Vec<ValidationResult> {
    let columns = demand.column_names();
    let missing: Vec<&str> = DEMAND_COLUMNS
        .iter()
        .copied()
        .filter(|name| !columns.iter().any(|column| column == name))
        .collect();
    let extra: Vec<&str> = columns
        .iter()
        .map(String::as_str)
        .filter(|column| !DEMAND_COLUMNS.contains(column))
        .collect();

    if !missing.is_empty() || !extra.is_empty() {
        let mut message = String::from("Demand file has incorrect column structure.");
        let mut details = serde_json::Map::new();
        if !missing.is_empty() {
            message.push_str(&format!(" Missing columns: {}.", missing.join(", ")));
            details.insert("missing_columns".to_string(), json!(missing));
        }
        if !extra.is_empty() {
            message.push_str(&format!(" Extra columns not allowed: {}.", extra.join(", ")));
            details.insert("extra_columns".to_string(), json!(extra));
        }
        message.push_str(" Demand file must have exactly 3 columns: o_zone_id, d_zone_id, volume.");
        return vec![
            ValidationResult::error(message)
                .with_field("demand")
                .with_details(details.into()),
        ];
    }

    if columns.iter().map(String::as_str).ne(DEMAND_COLUMNS) {
        return vec![
            ValidationResult::error(
                "Demand file columns are not in the correct order. Required: o_zone_id, d_zone_id, volume",
            )
            .with_field("demand")
            .with_details(json!({ "current_order": columns })),
        ];
    }
    Vec::new()
}

/// Demand o/d zones must all be node zone ids.
pub fn check_zone_consistency(node: Option<&Table>, demand: Option<&Table>) -> Vec<ValidationResult> {
    let Some(node) = node else {
        return vec![
            ValidationResult::error("Cannot validate zone consistency: node file is empty")
                .with_field("zone_id"),
        ];
    };
    let Some(zone_ids) = node.ints("zone_id") else {
        return vec![
            ValidationResult::error("'zone_id' column is not defined in node.csv file")
                .with_field("zone_id"),
        ];
    };
    let node_zones: HashSet<i64> = zone_ids.into_iter().flatten().collect();

    let Some(demand) = demand else {
        tracing::debug!("no demand file available to validate zone consistency");
        return Vec::new();
    };

    let (Some(origins), Some(destinations)) = (demand.ints("o_zone_id"), demand.ints("d_zone_id"))
    else {
        let missing = demand.missing_fields(&["o_zone_id", "d_zone_id"]);
        return vec![
            ValidationResult::warning("Required zone ID columns missing in demand file")
                .with_field("zone_id")
                .with_details(json!({ "missing_columns": missing })),
        ];
    };

    let missing: BTreeSet<i64> = origins
        .into_iter()
        .chain(destinations)
        .flatten()
        .filter(|zone| !node_zones.contains(zone))
        .collect();

    if missing.is_empty() {
        return vec![
            ValidationResult::success("All zones in demand file exist in node file").with_field("zone_id"),
        ];
    }
    let examples: Vec<i64> = missing.iter().take(MAX_IDS).copied().collect();
    vec![
        ValidationResult::error(format!(
            "Found {} zones in demand file that don't exist in node file",
            missing.len()
        ))
        .with_field("zone_id")
        .with_details(json!({ "missing_zones": examples })),
    ]
}

/// Self-loop counts and non-positive volumes.
pub fn check_demand_zones(demand: &Table) -> Vec<ValidationResult> {
    let (Some(origins), Some(destinations)) = (demand.ints("o_zone_id"), demand.ints("d_zone_id"))
    else {
        return Vec::new();
    };
    let mut results = Vec::new();

    let self_loops = origins
        .iter()
        .zip(&destinations)
        .filter(|(o, d)| o.is_some() && o == d)
        .count();
    if self_loops > 0 {
        results.push(
            ValidationResult::info(format!(
                "Found {self_loops} demand records with same origin and destination zone"
            ))
            .with_field("o_zone_id")
            .with_details(json!({ "self_loop_count": self_loops })),
        );
    }

    if let Some(volumes) = demand.floats("volume") {
        let invalid = volumes.iter().flatten().filter(|volume| **volume <= 0.0).count();
        if invalid > 0 {
            results.push(
                ValidationResult::warning(format!(
                    "Found {invalid} demand records with zero or negative volume"
                ))
                .with_field("volume")
                .with_details(json!({ "invalid_volume_count": invalid })),
            );
        }
    }
    results
}
