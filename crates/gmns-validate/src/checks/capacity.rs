//! Capacity plausibility: non-positive values, per-lane bounds, link-type spread.

use std::collections::BTreeMap;

use gmns_ingest::Table;
use gmns_model::ValidationResult;
use serde_json::{Value, json};

use crate::util::{MAX_EXAMPLES, max, mean, min, num, row_labels};

const HIGH_CAPACITY_TRIGGER: f64 = 3000.0;
const HIGH_CAPACITY: f64 = 5000.0;
const MAX_PER_LANE: f64 = 2500.0;
const MIN_PER_LANE: f64 = 500.0;
const MIN_GROUP_SAMPLES: usize = 5;
const MAX_GROUP_VARIATION: f64 = 2.0;

pub fn check_capacity(link: &Table) -> Vec<ValidationResult> {
    for field in ["link_id", "capacity"] {
        if !link.has_field(field) {
            return vec![
                ValidationResult::error(format!("Missing required '{field}' field in link file"))
                    .with_field(field),
            ];
        }
    }
    let Some(capacity) = link.floats("capacity") else {
        return Vec::new();
    };
    let labels = row_labels(link, "link_id");
    let examples = |rows: &[usize]| -> Vec<Value> {
        rows.iter()
            .take(MAX_EXAMPLES)
            .map(|row| labels[*row].clone())
            .collect()
    };
    let rows_where = |predicate: &dyn Fn(f64) -> bool| -> Vec<usize> {
        capacity
            .iter()
            .enumerate()
            .filter_map(|(row, value)| value.filter(|v| predicate(*v)).map(|_| row))
            .collect()
    };
    let mut results = Vec::new();

    let invalid = rows_where(&|value| value <= 0.0);
    if !invalid.is_empty() {
        results.push(
            ValidationResult::error(format!(
                "Found {} links with zero or negative capacity",
                invalid.len()
            ))
            .with_field("capacity")
            .with_details(json!({
                "invalid_count": invalid.len(),
                "example_links": examples(&invalid),
            })),
        );
    }

    let values: Vec<f64> = capacity.iter().flatten().copied().collect();
    if max(&values).is_some_and(|max| max > HIGH_CAPACITY_TRIGGER) {
        let high = rows_where(&|value| value > HIGH_CAPACITY);
        if !high.is_empty() {
            results.push(
                ValidationResult::warning(format!(
                    "Found {} links with unusually high hourly capacity (>{HIGH_CAPACITY})",
                    high.len()
                ))
                .with_field("capacity")
                .with_details(json!({
                    "high_capacity_count": high.len(),
                    "example_links": examples(&high),
                })),
            );
        }
    }

    if let Some(lanes) = link.floats("lanes") {
        let mut high = Vec::new();
        let mut low = Vec::new();
        for (row, (cap, lanes)) in capacity.iter().zip(&lanes).enumerate() {
            let (Some(cap), Some(lanes)) = (cap, lanes) else {
                continue;
            };
            let per_lane = cap / lanes;
            if per_lane > MAX_PER_LANE {
                high.push(row);
            } else if per_lane < MIN_PER_LANE {
                low.push(row);
            }
        }
        if !high.is_empty() {
            results.push(
                ValidationResult::warning(format!(
                    "Found {} links with unusually high capacity per lane (>2500)",
                    high.len()
                ))
                .with_field("capacity")
                .with_details(json!({
                    "high_cap_per_lane_count": high.len(),
                    "example_links": examples(&high),
                })),
            );
        }
        if !low.is_empty() {
            results.push(
                ValidationResult::warning(format!(
                    "Found {} links with unusually low capacity per lane (<500)",
                    low.len()
                ))
                .with_field("capacity")
                .with_details(json!({
                    "low_cap_per_lane_count": low.len(),
                    "example_links": examples(&low),
                })),
            );
        }
    }

    if let Some(link_types) = link.text("link_type") {
        let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for (link_type, cap) in link_types.into_iter().zip(&capacity) {
            if let (Some(link_type), Some(cap)) = (link_type, cap) {
                groups.entry(link_type).or_default().push(*cap);
            }
        }
        for (link_type, caps) in &groups {
            if caps.len() < MIN_GROUP_SAMPLES {
                continue;
            }
            let (Some(lo), Some(hi), Some(avg)) = (min(caps), max(caps), mean(caps)) else {
                continue;
            };
            let variation = if avg > 0.0 { (hi - lo) / avg } else { 0.0 };
            if variation > MAX_GROUP_VARIATION {
                results.push(
                    ValidationResult::warning(format!(
                        "Link type {link_type} has large capacity variation (min={}, max={})",
                        num(lo),
                        num(hi)
                    ))
                    .with_field("capacity")
                    .with_details(json!({
                        "link_type": link_type,
                        "capacity_min": lo,
                        "capacity_max": hi,
                        "capacity_mean": avg,
                        "count": caps.len(),
                    })),
                );
            }
        }
    }

    if let (Some(lo), Some(hi), Some(avg)) = (min(&values), max(&values), mean(&values)) {
        results.push(
            ValidationResult::info(format!(
                "Capacity values range from {} to {} (mean: {avg:.2})",
                num(lo),
                num(hi)
            ))
            .with_field("capacity")
            .with_details(json!({ "min": lo, "max": hi, "mean": avg })),
        );
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use gmns_model::ValidationStatus;

    #[test]
    fn test_zero_capacity_lists_link() {
        let link = Table::from_text_columns(
            "link",
            &[
                ("link_id", vec!["7", "8"]),
                ("capacity", vec!["0", "1800"]),
                ("lanes", vec!["1", "1"]),
            ],
        )
        .unwrap();
        let results = check_capacity(&link);
        let errors: Vec<&ValidationResult> = results.iter().filter(|r| r.is_error()).collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field(), Some("capacity"));
        assert_eq!(errors[0].detail("example_links"), Some(&json!([7])));
        assert_eq!(
            results.last().unwrap().message(),
            "Capacity values range from 0 to 1800 (mean: 900.00)"
        );
    }

    #[test]
    fn test_high_capacity_and_type_variation() {
        let link = Table::from_text_columns(
            "link",
            &[
                ("link_id", vec!["1", "2", "3", "4", "5"]),
                ("capacity", vec!["600", "600", "600", "4000", "9000"]),
                ("link_type", vec!["1", "1", "1", "1", "1"]),
            ],
        )
        .unwrap();
        let results = check_capacity(&link);
        let messages: Vec<&str> = results.iter().map(ValidationResult::message).collect();
        assert!(messages.contains(&"Found 1 links with unusually high hourly capacity (>5000)"));
        assert!(messages.contains(&"Link type 1 has large capacity variation (min=600, max=9000)"));
        assert!(results.iter().all(|r| r.status() != ValidationStatus::Error));
    }

    #[test]
    fn test_missing_capacity_column() {
        let link = Table::from_text_columns("link", &[("link_id", vec!["1"])]).unwrap();
        let results = check_capacity(&link);
        assert_eq!(results[0].message(), "Missing required 'capacity' field in link file");
    }
}
