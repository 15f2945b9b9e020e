//! Catalog-driven required-field and type checks.

use gmns_common::{CellParseError, is_null_cell, parse_float_cell, parse_int_cell};
use gmns_ingest::Table;
use gmns_model::ValidationResult;
use gmns_standards::{DatasetKind, FieldSpec, FieldType, required_fields, schema};
use serde_json::json;

use crate::util::MAX_EXAMPLES;

/// One ERROR naming every required field the table lacks.
pub fn check_required(table: &Table, kind: DatasetKind) -> Vec<ValidationResult> {
    let required: Vec<&str> = required_fields(kind).map(|spec| spec.name).collect();
    let missing = table.missing_fields(&required);
    if missing.is_empty() {
        return Vec::new();
    }
    vec![
        ValidationResult::error(format!(
            "Missing required fields in {kind} file: {}",
            missing.join(", ")
        ))
        .with_details(json!({ "missing_fields": missing })),
    ]
}

/// Null counts and type conformance for every catalog field present.
pub fn check_types(table: &Table, kind: DatasetKind) -> Vec<ValidationResult> {
    let mut results = Vec::new();
    for spec in schema(kind) {
        let Some(cells) = table.text(spec.name) else {
            continue;
        };
        results.extend(check_column(spec, &cells, kind));
    }
    results
}

#[derive(Default)]
struct Offenders {
    count: usize,
    values: Vec<String>,
    rows: Vec<usize>,
}

impl Offenders {
    fn push(&mut self, row: usize, raw: &str) {
        self.count += 1;
        if self.values.len() < MAX_EXAMPLES {
            self.values.push(raw.to_string());
            self.rows.push(row);
        }
    }

    fn into_result(self, field: &str, message: String) -> Option<ValidationResult> {
        (self.count > 0).then(|| {
            ValidationResult::error(message)
                .with_field(field)
                .with_details(json!({
                    "example_values": self.values,
                    "example_rows": self.rows,
                }))
        })
    }
}

fn check_column(
    spec: &FieldSpec,
    cells: &[Option<String>],
    kind: DatasetKind,
) -> Vec<ValidationResult> {
    let mut results = Vec::new();
    let field = spec.name;

    let mut null_count = 0usize;
    let mut non_numeric = Offenders::default();
    let mut non_integral = Offenders::default();

    for (row, cell) in cells.iter().enumerate() {
        let raw = cell.as_deref().unwrap_or("");
        let parsed = match spec.field_type {
            FieldType::Int => parse_int_cell(raw).map(|_| ()),
            FieldType::Float => parse_float_cell(raw).map(|_| ()),
            FieldType::Str => {
                if is_null_cell(raw) {
                    null_count += 1;
                }
                continue;
            }
        };
        match parsed {
            Ok(()) => {}
            Err(CellParseError::Empty) => null_count += 1,
            Err(CellParseError::NotNumeric { raw }) => non_numeric.push(row, &raw),
            Err(CellParseError::NotIntegral { raw }) => non_integral.push(row, &raw),
        }
    }

    if null_count > 0 {
        results.push(
            ValidationResult::info(format!(
                "Field '{field}' in {kind} file contains {null_count} null/empty values"
            ))
            .with_field(field),
        );
    }

    let non_numeric_message = match spec.field_type {
        FieldType::Int => format!(
            "Field '{field}' in {kind} file contains {} non-integer values",
            non_numeric.count
        ),
        _ => format!(
            "Field '{field}' in {kind} file contains {} non-numeric values",
            non_numeric.count
        ),
    };
    let integral_message = format!(
        "Field '{field}' in {kind} file contains {} non-integer values (decimal numbers)",
        non_integral.count
    );
    results.extend(non_numeric.into_result(field, non_numeric_message));
    results.extend(non_integral.into_result(field, integral_message));

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use gmns_model::ValidationStatus;

    #[test]
    fn test_missing_required_fields_single_error() {
        let node = Table::from_text_columns("node", &[("node_id", vec!["1"])]).unwrap();
        let results = check_required(&node, DatasetKind::Node);
        assert_eq!(results.len(), 1);
        assert_eq!(
            results[0].message(),
            "Missing required fields in node file: zone_id, x_coord, y_coord"
        );
    }

    #[test]
    fn test_type_errors_distinguish_non_numeric_and_decimal() {
        let node = Table::from_text_columns(
            "node",
            &[
                ("node_id", vec!["1", "2.5", "x", "4", ""]),
                ("x_coord", vec!["0.1", "0.2", "east", "0.4", "0.5"]),
                ("name", vec!["a", "", "c", "d", "e"]),
            ],
        )
        .unwrap();
        let results = check_types(&node, DatasetKind::Node);
        let messages: Vec<&str> = results.iter().map(ValidationResult::message).collect();
        assert_eq!(
            messages,
            vec![
                "Field 'node_id' in node file contains 1 null/empty values",
                "Field 'node_id' in node file contains 1 non-integer values",
                "Field 'node_id' in node file contains 1 non-integer values (decimal numbers)",
                "Field 'x_coord' in node file contains 1 non-numeric values",
                "Field 'name' in node file contains 1 null/empty values",
            ]
        );
        assert_eq!(results[1].status(), ValidationStatus::Error);
        assert_eq!(results[1].detail("example_values"), Some(&json!(["x"])));
        assert_eq!(results[2].detail("example_rows"), Some(&json!([1])));
    }

    #[test]
    fn test_examples_are_capped() {
        let values: Vec<&str> = vec!["bad"; 8];
        let link = Table::from_text_columns("link", &[("capacity", values)]).unwrap();
        let results = check_types(&link, DatasetKind::Link);
        assert_eq!(results.len(), 1);
        assert_eq!(
            results[0].detail("example_rows"),
            Some(&json!([0, 1, 2, 3, 4]))
        );
    }
}
