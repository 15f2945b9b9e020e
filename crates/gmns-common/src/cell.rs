//! Fallible per-cell numeric parsing.
//!
//! Every table cell is read as text and typed here, so a malformed value
//! surfaces as a [`CellParseError`] for that cell instead of failing the load
//! of the whole file.

use thiserror::Error;

/// Why a cell could not be read as the requested number type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CellParseError {
    /// Blank cell, or one of the textual null markers (`nan`, `NaN`, `NA`).
    #[error("empty value")]
    Empty,
    /// The text is not a number at all.
    #[error("non-numeric value '{raw}'")]
    NotNumeric { raw: String },
    /// A valid number that is not a whole integer (`2.5` in an integer field).
    #[error("non-integer value '{raw}'")]
    NotIntegral { raw: String },
}

impl CellParseError {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

const NULL_MARKERS: &[&str] = &["nan", "na", "n/a", "null", "none"];

fn normalized(raw: &str) -> Result<&str, CellParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || NULL_MARKERS
            .iter()
            .any(|marker| trimmed.eq_ignore_ascii_case(marker))
    {
        return Err(CellParseError::Empty);
    }
    Ok(trimmed)
}

/// Whether a cell counts as missing: blank or a null marker.
///
/// ```
/// use gmns_common::is_null_cell;
///
/// assert!(is_null_cell(" NA "));
/// assert!(!is_null_cell("Main St"));
/// ```
pub fn is_null_cell(raw: &str) -> bool {
    normalized(raw).is_err()
}

/// Parse a float cell.
///
/// ```
/// use gmns_common::{CellParseError, parse_float_cell};
///
/// assert_eq!(parse_float_cell(" 88.5 "), Ok(88.5));
/// assert_eq!(parse_float_cell(""), Err(CellParseError::Empty));
/// assert!(matches!(parse_float_cell("fast"), Err(CellParseError::NotNumeric { .. })));
/// ```
pub fn parse_float_cell(raw: &str) -> Result<f64, CellParseError> {
    let trimmed = normalized(raw)?;
    trimmed
        .parse::<f64>()
        .map_err(|_| CellParseError::NotNumeric {
            raw: trimmed.to_string(),
        })
}

/// Parse an integer cell. Integral decimals (`"3.0"`) are accepted.
///
/// ```
/// use gmns_common::{CellParseError, parse_int_cell};
///
/// assert_eq!(parse_int_cell("3"), Ok(3));
/// assert_eq!(parse_int_cell("3.0"), Ok(3));
/// assert!(matches!(parse_int_cell("3.5"), Err(CellParseError::NotIntegral { .. })));
/// assert!(matches!(parse_int_cell("x3"), Err(CellParseError::NotNumeric { .. })));
/// ```
pub fn parse_int_cell(raw: &str) -> Result<i64, CellParseError> {
    let trimmed = normalized(raw)?;
    if let Ok(value) = trimmed.parse::<i64>() {
        return Ok(value);
    }
    let value = trimmed
        .parse::<f64>()
        .map_err(|_| CellParseError::NotNumeric {
            raw: trimmed.to_string(),
        })?;
    integral(value).ok_or_else(|| CellParseError::NotIntegral {
        raw: trimmed.to_string(),
    })
}

/// Parse an id-like cell, discarding the error kind.
pub fn parse_id(raw: &str) -> Option<i64> {
    parse_int_cell(raw).ok()
}

pub(crate) fn integral(value: f64) -> Option<i64> {
    const LIMIT: f64 = 9_007_199_254_740_992.0; // 2^53
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= LIMIT {
        Some(value as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn null_markers_are_empty() {
        for raw in ["", "  ", "nan", "NaN", "NA", "null"] {
            assert_eq!(parse_float_cell(raw), Err(CellParseError::Empty), "{raw}");
        }
    }

    #[test]
    fn integer_errors_distinguish_kind() {
        assert_eq!(
            parse_int_cell("12.25"),
            Err(CellParseError::NotIntegral {
                raw: "12.25".to_string()
            })
        );
        assert_eq!(
            parse_int_cell("twelve"),
            Err(CellParseError::NotNumeric {
                raw: "twelve".to_string()
            })
        );
        assert_eq!(parse_int_cell("inf").unwrap_err().to_string(), "non-integer value 'inf'");
    }

    proptest! {
        #[test]
        fn any_i64_in_float_range_round_trips(value in -1_000_000_000i64..1_000_000_000i64) {
            prop_assert_eq!(parse_int_cell(&value.to_string()), Ok(value));
            prop_assert_eq!(parse_int_cell(&format!("{value}.0")), Ok(value));
        }
    }
}
