use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ColumnConstraint, ContentArrangement, Table, Width};
use gmns_model::{ReportEntry, ValidationStatus};
use serde_json::Value;

use crate::commands::RunOutcome;

const MAX_DETAIL_CHARS: usize = 80;

pub fn print_summary(outcome: &RunOutcome) {
    let report = &outcome.report;
    let metadata = &report.metadata;
    println!("Readiness level: {}", metadata.level);
    if let Some(link) = &metadata.link_file {
        println!("Link file: {link}");
    }
    println!(
        "Rows: {} nodes, {} links, {} demand",
        metadata.node_count, metadata.link_count, metadata.demand_count
    );
    println!("Report: {}", outcome.report_path.display());

    let mut table = Table::new();
    table.set_header(vec![header_cell("Status"), header_cell("Count")]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    let summary = &report.summary;
    for (status, count) in [
        (ValidationStatus::Error, summary.errors),
        (ValidationStatus::Warning, summary.warnings),
        (ValidationStatus::Success, summary.success),
        (ValidationStatus::Info, summary.info),
    ] {
        table.add_row(vec![status_cell(status), count_cell(count, status_color(status))]);
    }
    table.add_row(vec![
        Cell::new("TOTAL").fg(Color::Cyan).add_attribute(Attribute::Bold),
        Cell::new(summary.total).add_attribute(Attribute::Bold),
    ]);
    println!("{table}");
    print_issue_table(&report.errors, &report.warnings);
}

fn print_issue_table(errors: &[ReportEntry], warnings: &[ReportEntry]) {
    if errors.is_empty() && warnings.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Status"),
        header_cell("Field"),
        header_cell("Message"),
        header_cell("Details"),
    ]);
    apply_issue_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Center);
    let issues = errors
        .iter()
        .map(|entry| (ValidationStatus::Error, entry))
        .chain(warnings.iter().map(|entry| (ValidationStatus::Warning, entry)));
    for (status, entry) in issues {
        table.add_row(vec![
            status_cell(status),
            entry.field.as_deref().map_or_else(|| dim_cell("-"), Cell::new),
            Cell::new(&entry.message),
            details_cell(entry),
        ]);
    }
    println!();
    println!("Issues:");
    println!("{table}");
}

/// Compact one-line rendering of a result's details.
pub(crate) fn details_text(entry: &ReportEntry) -> Option<String> {
    let details = entry.details.as_ref().filter(|details| !details.is_empty())?;
    let text = Value::Object(details.clone()).to_string();
    if text.chars().count() <= MAX_DETAIL_CHARS {
        return Some(text);
    }
    let truncated: String = text.chars().take(MAX_DETAIL_CHARS - 3).collect();
    Some(format!("{truncated}..."))
}

fn details_cell(entry: &ReportEntry) -> Cell {
    match details_text(entry) {
        Some(text) => Cell::new(text),
        None => dim_cell("-"),
    }
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

fn apply_issue_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(160);
    table.set_constraints(vec![
        ColumnConstraint::UpperBoundary(Width::Fixed(9)),
        ColumnConstraint::UpperBoundary(Width::Fixed(22)),
        ColumnConstraint::UpperBoundary(Width::Percentage(50)),
        ColumnConstraint::UpperBoundary(Width::Percentage(35)),
    ]);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn status_color(status: ValidationStatus) -> Color {
    match status {
        ValidationStatus::Error => Color::Red,
        ValidationStatus::Warning => Color::Yellow,
        ValidationStatus::Success => Color::Green,
        ValidationStatus::Info => Color::Blue,
    }
}

fn status_cell(status: ValidationStatus) -> Cell {
    let label = match status {
        ValidationStatus::Error => "ERROR",
        ValidationStatus::Warning => "WARN",
        ValidationStatus::Success => "SUCCESS",
        ValidationStatus::Info => "INFO",
    };
    Cell::new(label).fg(status_color(status))
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label).fg(Color::Cyan).add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(details: Option<Value>) -> ReportEntry {
        ReportEntry {
            message: "Found 1 links with zero or negative capacity".to_string(),
            field: Some("capacity".to_string()),
            details: details.and_then(|value| value.as_object().cloned()),
        }
    }

    #[test]
    fn test_details_text() {
        assert_eq!(details_text(&entry(None)), None);
        assert_eq!(
            details_text(&entry(Some(json!({ "invalid_count": 1 })))),
            Some(r#"{"invalid_count":1}"#.to_string())
        );
    }

    #[test]
    fn test_long_details_are_truncated() {
        let ids: Vec<i64> = (1000..1040).collect();
        let text = details_text(&entry(Some(json!({ "example_links": ids })))).unwrap();
        assert_eq!(text.chars().count(), MAX_DETAIL_CHARS);
        assert!(text.ends_with("..."));
    }
}
