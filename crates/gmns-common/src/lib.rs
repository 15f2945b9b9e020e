//! Shared utilities for GMNS validation crates.
//!
//! - `values`: polars `AnyValue` conversions
//! - `cell`: fallible per-cell numeric parsing with typed errors

mod cell;
mod values;

pub use cell::{CellParseError, is_null_cell, parse_float_cell, parse_id, parse_int_cell};
pub use values::{any_to_string, format_numeric, parse_f64, parse_i64};
