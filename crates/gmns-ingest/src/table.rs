//! Typed access over loaded tables.

use std::path::{Path, PathBuf};

use gmns_common::{any_to_string, parse_f64, parse_i64};
use polars::prelude::{AnyValue, Column, DataFrame};

use crate::error::{IngestError, Result};
use crate::reader::{normalize_column_names, read_csv_text};

/// A loaded tabular file with lower-case column names and text cells.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    path: Option<PathBuf>,
    df: DataFrame,
}

impl Table {
    /// Wrap an existing frame, normalizing its column names.
    pub fn from_frame(name: impl Into<String>, df: DataFrame) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            path: None,
            df: normalize_column_names(df)?,
        })
    }

    /// Build a table from text columns. Empty strings become nulls.
    ///
    /// ```
    /// use gmns_ingest::Table;
    ///
    /// let table = Table::from_text_columns(
    ///     "node",
    ///     &[("node_id", vec!["1", "2"]), ("zone_id", vec!["1", ""])],
    /// )
    /// .unwrap();
    /// assert!(table.has_field("zone_id"));
    /// assert_eq!(table.ints("zone_id"), Some(vec![Some(1), None]));
    /// ```
    pub fn from_text_columns(name: impl Into<String>, columns: &[(&str, Vec<&str>)]) -> Result<Self> {
        let columns: Vec<Column> = columns
            .iter()
            .map(|(column, values)| {
                let cells: Vec<Option<&str>> = values
                    .iter()
                    .map(|value| (!value.is_empty()).then_some(*value))
                    .collect();
                Column::new((*column).into(), cells)
            })
            .collect();
        Self::from_frame(name, DataFrame::new(columns)?)
    }

    /// Read a CSV file from disk.
    pub fn read(name: impl Into<String>, path: &Path) -> Result<Self> {
        let df = read_csv_text(path)?;
        Ok(Self {
            name: name.into(),
            path: Some(path.to_path_buf()),
            df,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Column names in file order.
    pub fn column_names(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect()
    }

    /// Whether the table carries a column (names are lower-case).
    pub fn has_field(&self, name: &str) -> bool {
        self.df.column(name).is_ok()
    }

    /// The subset of `names` this table lacks, in the given order.
    pub fn missing_fields(&self, names: &[&str]) -> Vec<String> {
        names
            .iter()
            .filter(|name| !self.has_field(name))
            .map(|name| (*name).to_string())
            .collect()
    }

    /// Trimmed cell text per row; blank cells are `None`.
    pub fn text(&self, name: &str) -> Option<Vec<Option<String>>> {
        let column = self.df.column(name).ok()?;
        Some(
            (0..column.len())
                .map(|idx| {
                    let raw = any_to_string(column.get(idx).unwrap_or(AnyValue::Null));
                    let trimmed = raw.trim();
                    (!trimmed.is_empty()).then(|| trimmed.to_string())
                })
                .collect(),
        )
    }

    /// Cells parsed as floats; blank or unparseable cells are `None`.
    pub fn floats(&self, name: &str) -> Option<Vec<Option<f64>>> {
        self.text(name)
            .map(|cells| cells.iter().map(|cell| cell.as_deref().and_then(parse_f64)).collect())
    }

    /// Cells parsed as integers; blank, non-numeric or fractional cells are `None`.
    pub fn ints(&self, name: &str) -> Option<Vec<Option<i64>>> {
        self.text(name)
            .map(|cells| cells.iter().map(|cell| cell.as_deref().and_then(parse_i64)).collect())
    }

    pub fn require_floats(&self, name: &str) -> Result<Vec<Option<f64>>> {
        self.floats(name).ok_or_else(|| self.column_not_found(name))
    }

    pub fn require_ints(&self, name: &str) -> Result<Vec<Option<i64>>> {
        self.ints(name).ok_or_else(|| self.column_not_found(name))
    }

    fn column_not_found(&self, column: &str) -> IngestError {
        IngestError::ColumnNotFound {
            table: self.name.clone(),
            column: column.to_string(),
        }
    }
}

/// Load state of an input file.
#[derive(Debug, Clone, Default)]
pub enum Dataset {
    /// No path was supplied.
    #[default]
    Absent,
    Loaded(Table),
    /// A path was supplied but the file could not be read.
    Failed { path: PathBuf, error: String },
}

impl Dataset {
    /// Load an optional file. Failures are kept, not returned.
    pub fn load(name: &str, path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::Absent;
        };
        match Table::read(name, path) {
            Ok(table) => {
                tracing::debug!(
                    dataset = name,
                    path = %path.display(),
                    rows = table.height(),
                    columns = table.frame().width(),
                    "loaded table"
                );
                Self::Loaded(table)
            }
            Err(err) => {
                tracing::warn!(dataset = name, path = %path.display(), error = %err, "failed to load table");
                Self::Failed {
                    path: path.to_path_buf(),
                    error: err.to_string(),
                }
            }
        }
    }

    pub fn table(&self) -> Option<&Table> {
        match self {
            Self::Loaded(table) => Some(table),
            Self::Absent | Self::Failed { .. } => None,
        }
    }

    /// The table when it is loaded and has at least one row.
    pub fn rows(&self) -> Option<&Table> {
        self.table().filter(|table| !table.is_empty())
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Loaded with zero rows, or failed.
    pub fn is_empty_or_failed(&self) -> bool {
        match self {
            Self::Absent => false,
            Self::Loaded(table) => table.is_empty(),
            Self::Failed { .. } => true,
        }
    }

    pub fn height(&self) -> usize {
        self.table().map_or(0, Table::height)
    }

    /// Load failure message, if any.
    pub fn load_error(&self) -> Option<String> {
        match self {
            Self::Failed { path, error } => {
                Some(format!("Failed to load {}: {error}", path.display()))
            }
            Self::Absent | Self::Loaded(_) => None,
        }
    }
}
