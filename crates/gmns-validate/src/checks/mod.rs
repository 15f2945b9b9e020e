//! Pre-run validation checks.
//!
//! Each module covers one family of rules. The `run_*` functions below
//! sequence them into readiness levels 1 through 5.

pub mod attributes;
pub mod capacity;
pub mod config;
pub mod fields;
pub mod odme;
pub mod referential;
pub mod structural;

use std::path::Path;

use gmns_ingest::{Dataset, Table};
use gmns_model::ValidationResult;
use gmns_standards::DatasetKind;

use self::referential::CentroidLayout;

/// Inputs shared by the pre-run levels.
#[derive(Debug, Clone, Copy)]
pub struct CheckInputs<'a> {
    pub node: &'a Dataset,
    pub link: &'a Table,
    pub demand: &'a Dataset,
    pub mode_type: &'a Dataset,
    pub settings: &'a Dataset,
    pub working_dir: &'a Path,
}

/// Level 1: field presence, types, ids and forward-star order.
pub fn run_structural(inputs: &CheckInputs<'_>) -> Vec<ValidationResult> {
    if inputs.node.is_absent() {
        tracing::debug!("node file absent, skipping structural checks");
        return Vec::new();
    }
    let node = inputs.node.table();
    let link = inputs.link;
    let mut results = Vec::new();

    // 1. Required fields
    if let Some(node) = node {
        results.extend(fields::check_required(node, DatasetKind::Node));
    }
    results.extend(fields::check_required(link, DatasetKind::Link));

    // 2. Field types and null counts
    if let Some(node) = node {
        results.extend(fields::check_types(node, DatasetKind::Node));
    }
    results.extend(fields::check_types(link, DatasetKind::Link));

    // 3. Forward-star ordering
    if let Some(node) = node {
        results.extend(structural::check_node_order(node));
    }
    results.extend(structural::check_link_order(link));

    // 4. Link endpoints exist
    if let Some(node) = node {
        results.extend(referential::check_link_endpoints(node, link));
    }

    // 5. Unique ids
    if let Some(node) = node {
        results.extend(structural::check_duplicates(node, "node_id", DatasetKind::Node));
    }
    results.extend(structural::check_duplicates(link, "link_id", DatasetKind::Link));

    results
}

/// Level 2: centroids, connectors and demand.
pub fn run_demand_zone(inputs: &CheckInputs<'_>) -> Vec<ValidationResult> {
    let node = inputs.node.table();
    let demand = inputs.demand.rows();
    let mut results = Vec::new();

    // 1. Centroid block and connectors
    results.extend(referential::check_centroid_structure(node));
    results.extend(referential::check_connectors(node, inputs.link));

    // 2. Demand zones against node zones
    results.extend(referential::check_zone_consistency(node, demand));

    // 3. Demand file shape and values
    match demand {
        Some(demand) => {
            results.extend(referential::check_demand_shape(demand));
            results.extend(fields::check_required(demand, DatasetKind::Demand));
            results.extend(referential::check_demand_zones(demand));
        }
        None => results.push(
            ValidationResult::warning("Demand file not provided or empty. Skipping demand validations.")
                .with_field("demand"),
        ),
    }
    results
}

/// Level 3: VDF parameters, units and capacity.
pub fn run_network_attributes(inputs: &CheckInputs<'_>) -> Vec<ValidationResult> {
    let link = inputs.link;
    let mut results = Vec::new();
    results.extend(attributes::check_vdf_parameters(link));
    results.extend(attributes::check_speed_units(link));
    results.extend(attributes::check_length_units(link));
    results.extend(capacity::check_capacity(link));
    results.extend(attributes::check_unit_consistency(link));
    results
}

/// Level 4: mode_type.csv and settings.csv.
pub fn run_configuration(inputs: &CheckInputs<'_>) -> Vec<ValidationResult> {
    let zone_count = inputs
        .node
        .table()
        .and_then(CentroidLayout::from_table)
        .map(|layout| layout.centroid_ids().len());
    config::check_config_files(inputs.mode_type, inputs.settings, zone_count)
}

/// Level 5: observed volumes and ODME inputs.
pub fn run_odme(inputs: &CheckInputs<'_>) -> Vec<ValidationResult> {
    let mut results = odme::check_observed_volumes(inputs.link);
    results.extend(odme::check_odme_configuration(
        inputs.settings,
        inputs.mode_type,
        inputs.working_dir,
        inputs.node.table(),
    ));
    results
}
