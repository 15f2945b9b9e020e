//! Per-file structural invariants: unique ids and forward-star ordering.

use std::collections::{BTreeMap, HashMap};

use gmns_ingest::Table;
use gmns_model::ValidationResult;
use gmns_standards::DatasetKind;
use serde_json::{Value, json};

use crate::util::{MAX_IDS, cell_value, id_key};

/// ERROR when any id value occurs more than once.
pub fn check_duplicates(table: &Table, id_field: &str, kind: DatasetKind) -> Vec<ValidationResult> {
    let Some(cells) = table.text(id_field) else {
        return Vec::new();
    };

    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for raw in cells.iter().flatten() {
        let count = counts.entry(id_key(raw)).or_insert(0);
        *count += 1;
        if *count == 2 {
            order.push(raw.as_str());
        }
    }

    if order.is_empty() {
        return Vec::new();
    }

    let duplicate_ids: Vec<Value> = order
        .iter()
        .take(MAX_IDS)
        .map(|raw| cell_value(raw))
        .collect();
    vec![
        ValidationResult::error(format!("Duplicate {id_field} values found in {kind} file"))
            .with_field(id_field)
            .with_details(json!({
                "duplicate_count": order.len(),
                "duplicate_ids": duplicate_ids,
            })),
    ]
}

/// Node ids must be non-decreasing. Unparseable ids are ignored.
pub fn check_node_order(node: &Table) -> Vec<ValidationResult> {
    let Some(ids) = node.ints("node_id") else {
        return Vec::new();
    };
    let ids: Vec<i64> = ids.into_iter().flatten().collect();

    let result = if is_non_decreasing(&ids) {
        ValidationResult::success("Nodes are correctly sorted by node_id in ascending order")
    } else {
        ValidationResult::error(
            "Nodes are not sorted by node_id in ascending order (Forward-Star Structure)",
        )
    };
    vec![result.with_field("node_id")]
}

/// Links must be sorted by from_node_id, then by to_node_id within each group.
pub fn check_link_order(link: &Table) -> Vec<ValidationResult> {
    let (Some(from), Some(to)) = (link.ints("from_node_id"), link.ints("to_node_id")) else {
        return Vec::new();
    };
    let mut results = Vec::new();

    let from_ids: Vec<i64> = from.iter().flatten().copied().collect();
    if is_non_decreasing(&from_ids) {
        results.push(
            ValidationResult::success(
                "Links are correctly sorted by from_node_id in ascending order",
            )
            .with_field("from_node_id"),
        );
    } else {
        results.push(
            ValidationResult::warning(
                "Links are not sorted by from_node_id in ascending order (Forward-Star Structure)",
            )
            .with_field("from_node_id")
            .with_details(json!({
                "suggestion": "Sort link.csv by from_node_id, then to_node_id, and rewrite the file",
            })),
        );
    }

    let mut groups: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
    for (from_id, to_id) in from.iter().zip(&to) {
        if let (Some(from_id), Some(to_id)) = (from_id, to_id) {
            groups.entry(*from_id).or_default().push(*to_id);
        }
    }
    let unsorted: Vec<i64> = groups
        .iter()
        .filter(|(_, targets)| !is_non_decreasing(targets))
        .map(|(from_id, _)| *from_id)
        .collect();

    if unsorted.is_empty() {
        results.push(
            ValidationResult::success(
                "Links are correctly sorted by to_node_id within from_node_id groups",
            )
            .with_field("to_node_id"),
        );
    } else {
        results.push(
            ValidationResult::error("Links are not sorted by to_node_id within from_node_id groups")
                .with_field("to_node_id")
                .with_details(json!({
                    "unsorted_group_count": unsorted.len(),
                    "unsorted_from_node_groups": &unsorted[..unsorted.len().min(MAX_IDS)],
                })),
        );
    }

    results
}

pub(crate) fn is_non_decreasing(values: &[i64]) -> bool {
    values.windows(2).all(|pair| pair[0] <= pair[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use gmns_model::ValidationStatus;

    fn links(from: Vec<&str>, to: Vec<&str>) -> Table {
        Table::from_text_columns("link", &[("from_node_id", from), ("to_node_id", to)]).unwrap()
    }

    #[test]
    fn test_duplicates_listed_once() {
        let node = Table::from_text_columns("node", &[("node_id", vec!["1", "2", "2", "3", "2.0", "3"])])
            .unwrap();
        let results = check_duplicates(&node, "node_id", DatasetKind::Node);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].message(), "Duplicate node_id values found in node file");
        assert_eq!(results[0].detail("duplicate_ids"), Some(&json!([2, 3])));
    }

    #[test]
    fn test_node_order() {
        let sorted = Table::from_text_columns("node", &[("node_id", vec!["1", "2", "", "5"])]).unwrap();
        assert_eq!(check_node_order(&sorted)[0].status(), ValidationStatus::Success);

        let unsorted = Table::from_text_columns("node", &[("node_id", vec!["2", "1"])]).unwrap();
        assert_eq!(check_node_order(&unsorted)[0].status(), ValidationStatus::Error);
    }

    #[test]
    fn test_unsorted_within_group_is_error() {
        let table = links(vec!["1", "1", "2", "2"], vec!["5", "3", "4", "6"]);
        let results = check_link_order(&table);
        assert_eq!(results[0].status(), ValidationStatus::Success);
        assert_eq!(results[1].status(), ValidationStatus::Error);
        assert_eq!(results[1].detail("unsorted_from_node_groups"), Some(&json!([1])));
    }

    #[test]
    fn test_unsorted_from_node_is_warning() {
        let table = links(vec!["2", "1"], vec!["1", "2"]);
        let results = check_link_order(&table);
        assert_eq!(results[0].status(), ValidationStatus::Warning);
        assert_eq!(results[1].status(), ValidationStatus::Success);
    }
}
