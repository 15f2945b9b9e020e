//! Shared helpers for checks: sample limits, summary statistics, JSON values.

use gmns_common::parse_id;
use gmns_ingest::Table;
use serde_json::{Value, json};

/// Value/row samples attached to a result.
pub(crate) const MAX_EXAMPLES: usize = 5;

/// Id lists attached to a result.
pub(crate) const MAX_IDS: usize = 10;

pub(crate) fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| sum(values) / values.len() as f64)
}

pub(crate) fn min(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

pub(crate) fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

pub(crate) fn median(values: &[f64]) -> Option<f64> {
    percentile(values, 0.5)
}

/// Quantile with linear interpolation between closest ranks.
pub(crate) fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Pearson correlation; zero when either side has no variance.
pub(crate) fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let (Some(mean_a), Some(mean_b)) = (mean(a), mean(b)) else {
        return 0.0;
    };
    let mut numerator = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        numerator += (x - mean_a) * (y - mean_b);
        var_a += (x - mean_a).powi(2);
        var_b += (y - mean_b).powi(2);
    }
    let denominator = (var_a * var_b).sqrt();
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

pub(crate) fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * count as f64 / total as f64
    }
}

/// JSON form of a raw cell: an integer when it parses as one, else the text.
pub(crate) fn cell_value(raw: &str) -> Value {
    match parse_id(raw) {
        Some(id) => json!(id),
        None => json!(raw),
    }
}

/// Comparison key for an id cell: the integer form when it parses, else the text.
pub(crate) fn id_key(raw: &str) -> String {
    parse_id(raw).map_or_else(|| raw.to_string(), |id| id.to_string())
}

/// Per-row JSON labels of an id column; `null` where the column or cell is missing.
pub(crate) fn row_labels(table: &Table, id_field: &str) -> Vec<Value> {
    match table.text(id_field) {
        Some(cells) => cells
            .iter()
            .map(|cell| cell.as_deref().map_or(Value::Null, cell_value))
            .collect(),
        None => vec![Value::Null; table.height()],
    }
}

/// CSV cell text of a row label.
pub(crate) fn label_text(label: &Value) -> String {
    match label {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Float rendered the way result messages show plain numbers ("1800", "0.5").
pub(crate) fn num(value: f64) -> String {
    gmns_common::format_numeric(value)
}
