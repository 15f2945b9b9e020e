//! Per-column statistics for the report.

use std::collections::{BTreeMap, HashSet};

use gmns_common::{is_null_cell, parse_f64};
use gmns_ingest::Table;
use gmns_model::{FieldStatistic, FieldStatistics};

use crate::util::{max, mean, min};

/// Statistic of one column.
///
/// A column is numeric when it has at least one non-null cell and every
/// non-null cell parses as a number. Everything else is categorical.
/// Null markers such as `NA` or `nan` count as null.
pub fn column_statistic(cells: &[Option<String>]) -> FieldStatistic {
    let present: Vec<&str> = cells
        .iter()
        .flatten()
        .map(String::as_str)
        .filter(|cell| !is_null_cell(cell))
        .collect();
    let null_count = cells.len() - present.len();

    let numbers: Option<Vec<f64>> = present.iter().map(|cell| parse_f64(cell)).collect();
    if let Some(numbers) = numbers
        && let (Some(low), Some(high), Some(avg)) = (min(&numbers), max(&numbers), mean(&numbers))
    {
        return FieldStatistic::Numeric {
            min: low,
            max: high,
            mean: avg,
            null_count,
        };
    }
    FieldStatistic::Categorical {
        unique_values: present.into_iter().collect::<HashSet<_>>().len(),
        null_count,
    }
}

fn table_statistics(table: &Table) -> BTreeMap<String, FieldStatistic> {
    table
        .column_names()
        .into_iter()
        .filter_map(|column| {
            let cells = table.text(&column)?;
            Some((column, column_statistic(&cells)))
        })
        .collect()
}

/// Statistics for each loaded dataset, keyed by dataset name.
pub fn field_statistics<'a>(tables: impl IntoIterator<Item = (&'a str, Option<&'a Table>)>) -> FieldStatistics {
    tables
        .into_iter()
        .filter_map(|(name, table)| Some((name.to_string(), table_statistics(table?))))
        .collect()
}
