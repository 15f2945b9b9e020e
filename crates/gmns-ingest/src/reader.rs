//! CSV file reading.
//!
//! Every column is read as text. Numeric typing happens per cell in the
//! checks, so a single malformed value never makes a file unreadable.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use polars::prelude::*;

use crate::error::{IngestError, Result};

fn open_error(path: &Path, err: std::io::Error) -> IngestError {
    if err.kind() == std::io::ErrorKind::NotFound {
        IngestError::FileNotFound {
            path: path.to_path_buf(),
        }
    } else {
        IngestError::FileRead {
            path: path.to_path_buf(),
            source: err,
        }
    }
}

/// Reject UTF-16 input and empty files.
///
/// A UTF-8 BOM is fine; the CSV reader skips it.
pub fn validate_encoding(path: &Path) -> Result<()> {
    let mut file = File::open(path).map_err(|e| open_error(path, e))?;

    let mut buffer = [0u8; 4];
    let bytes_read = file.read(&mut buffer).map_err(|e| IngestError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    if bytes_read == 0 {
        return Err(IngestError::EmptyCsv {
            path: path.to_path_buf(),
        });
    }
    if bytes_read >= 2 {
        if buffer[0..2] == [0xFF, 0xFE] {
            return Err(IngestError::UnsupportedEncoding {
                path: path.to_path_buf(),
                encoding: "UTF-16 LE",
            });
        }
        if buffer[0..2] == [0xFE, 0xFF] {
            return Err(IngestError::UnsupportedEncoding {
                path: path.to_path_buf(),
                encoding: "UTF-16 BE",
            });
        }
    }

    Ok(())
}

/// Lower-case and trim column names so lookups are case-insensitive.
pub fn normalize_column_names(df: DataFrame) -> Result<DataFrame> {
    let columns: Vec<Column> = df
        .get_columns()
        .iter()
        .map(|column| {
            let name = column
                .name()
                .trim_start_matches('\u{feff}')
                .trim()
                .to_ascii_lowercase();
            column.clone().with_name(name.into())
        })
        .collect();
    Ok(DataFrame::new(columns)?)
}

/// Read a CSV file into a DataFrame of text columns with normalized names.
pub fn read_csv_text(path: &Path) -> Result<DataFrame> {
    validate_encoding(path)?;

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
        .finish()
        .map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    normalize_column_names(df).map_err(|e| IngestError::CsvParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_csv(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file
    }

    #[test]
    fn test_read_csv_text_lowercases_headers() {
        let file = create_temp_csv(b"Node_ID,ZONE_ID,x_coord\n1,1,0.5\n2,,0.7\n");
        let df = read_csv_text(file.path()).unwrap();

        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        assert_eq!(names, vec!["node_id", "zone_id", "x_coord"]);
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("node_id").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_read_csv_text_with_utf8_bom() {
        let file = create_temp_csv(b"\xEF\xBB\xBFlink_id,length\n1,100\n");
        let df = read_csv_text(file.path()).unwrap();
        assert!(df.column("link_id").is_ok());
    }

    #[test]
    fn test_header_only_file_is_empty_table() {
        let file = create_temp_csv(b"o_zone_id,d_zone_id,volume\n");
        let df = read_csv_text(file.path()).unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), 3);
    }

    #[test]
    fn test_utf16_is_rejected() {
        let file = create_temp_csv(&[0xFF, 0xFE, b'a', 0x00]);
        let result = read_csv_text(file.path());
        assert!(matches!(
            result,
            Err(IngestError::UnsupportedEncoding {
                encoding: "UTF-16 LE",
                ..
            })
        ));
    }

    #[test]
    fn test_zero_byte_file_is_empty_csv() {
        let file = create_temp_csv(b"");
        assert!(matches!(
            read_csv_text(file.path()),
            Err(IngestError::EmptyCsv { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = read_csv_text(Path::new("/nonexistent/node.csv"));
        assert!(matches!(result, Err(IngestError::FileNotFound { .. })));
    }
}
