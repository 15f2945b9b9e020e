//! GMNS data ingestion.
//!
//! Loads network CSV files into Polars DataFrames with every column kept as
//! text and column names lower-cased, exposes them through [`Table`] with
//! typed per-column views, and tracks absent / loaded / failed inputs as
//! [`Dataset`] values.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use gmns_ingest::{Dataset, discover_network_files};
//!
//! let files = discover_network_files(Path::new("networks/chicago"))?;
//! let link = Dataset::load("link", Some(&files.link));
//! if let Some(table) = link.rows() {
//!     let capacity = table.floats("capacity");
//! }
//! ```

mod discovery;
mod error;
mod reader;
mod table;

// === Error Types ===
pub use error::{IngestError, Result};

// === CSV Reading ===
pub use reader::{normalize_column_names, read_csv_text, validate_encoding};

// === Tables ===
pub use table::{Dataset, Table};

// === File Discovery ===
pub use discovery::{NetworkFiles, discover_network_files, find_by_keyword, list_csv_files};
