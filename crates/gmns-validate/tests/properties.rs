use std::collections::{BTreeSet, HashSet};

use gmns_ingest::Table;
use gmns_model::{ValidationResult, ValidationStatus};
use gmns_validate::checks::attributes::check_unit_consistency;
use gmns_validate::checks::referential::check_centroid_structure;
use gmns_validate::checks::structural::check_link_order;
use proptest::prelude::*;
use proptest::sample::Index;

fn table(name: &str, columns: &[(&str, Vec<String>)]) -> Table {
    let borrowed: Vec<(&str, Vec<&str>)> = columns
        .iter()
        .map(|(column, cells)| (*column, cells.iter().map(String::as_str).collect()))
        .collect();
    Table::from_text_columns(name, &borrowed).unwrap()
}

fn violations(results: &[ValidationResult]) -> usize {
    results
        .iter()
        .filter(|result| result.status() != ValidationStatus::Success)
        .count()
}

fn sorted_links(groups: &[BTreeSet<i64>]) -> Vec<(i64, i64)> {
    groups
        .iter()
        .enumerate()
        .flat_map(|(idx, targets)| targets.iter().map(move |to| (idx as i64 + 1, *to)))
        .collect()
}

fn link_table(links: &[(i64, i64)]) -> Table {
    table(
        "link",
        &[
            ("from_node_id", links.iter().map(|(from, _)| from.to_string()).collect()),
            ("to_node_id", links.iter().map(|(_, to)| to.to_string()).collect()),
        ],
    )
}

proptest! {
    #[test]
    fn missing_centroid_error_counts_distinct_zones(
        rows in prop::collection::vec((1i64..30, prop::option::of(0i64..30)), 1..40)
    ) {
        let centroids: HashSet<i64> = rows
            .iter()
            .filter(|(node, zone)| *zone == Some(*node))
            .map(|(node, _)| *node)
            .collect();
        prop_assume!(!centroids.is_empty());
        let expected: BTreeSet<i64> = rows
            .iter()
            .filter_map(|(_, zone)| *zone)
            .filter(|zone| *zone != 0 && !centroids.contains(zone))
            .collect();

        let node = table(
            "node",
            &[
                ("node_id", rows.iter().map(|(node, _)| node.to_string()).collect()),
                ("zone_id", rows.iter().map(|(_, zone)| zone.map(|z| z.to_string()).unwrap_or_default()).collect()),
            ],
        );
        let results = check_centroid_structure(Some(&node));
        let missing: Vec<&ValidationResult> = results
            .iter()
            .filter(|result| result.message().contains("without corresponding node_id = zone_id"))
            .collect();

        if expected.is_empty() {
            prop_assert!(missing.is_empty());
        } else {
            prop_assert_eq!(missing.len(), 1);
            prop_assert!(missing[0].is_error());
            prop_assert_eq!(
                missing[0].detail("missing_centroid_count").and_then(|v| v.as_u64()),
                Some(expected.len() as u64)
            );
        }
    }

    #[test]
    fn one_adjacent_swap_is_one_ordering_violation(
        groups in prop::collection::vec(prop::collection::btree_set(1i64..50, 1..5), 1..6),
        at in any::<Index>(),
    ) {
        let mut links = sorted_links(&groups);
        prop_assume!(links.len() >= 2);
        prop_assert_eq!(violations(&check_link_order(&link_table(&links))), 0);

        let row = at.index(links.len() - 1);
        links.swap(row, row + 1);
        prop_assert_eq!(violations(&check_link_order(&link_table(&links))), 1);
    }

    #[test]
    fn rounded_mile_lengths_are_consistent(
        meters in prop::collection::vec(0.0f64..500_000.0, 1..20)
    ) {
        let lengths: Vec<String> = meters.iter().map(|m| format!("{m:.1}")).collect();
        let miles: Vec<String> = lengths
            .iter()
            .map(|m| format!("{:.2}", m.parse::<f64>().unwrap() / 1609.34))
            .collect();
        let ids: Vec<String> = (1..=meters.len()).map(|id| id.to_string()).collect();
        let link = table("link", &[("link_id", ids), ("length", lengths), ("vdf_length_mi", miles)]);

        let results = check_unit_consistency(&link);
        prop_assert_eq!(results.len(), 1);
        prop_assert_eq!(results[0].status(), ValidationStatus::Success);
        prop_assert_eq!(results[0].field(), Some("length"));
    }
}
