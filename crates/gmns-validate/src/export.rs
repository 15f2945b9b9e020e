//! Diagnostic CSV exports written next to the network files.

use std::path::{Path, PathBuf};

use gmns_model::ValidationResult;
use serde_json::json;

use crate::error::{CheckError, Result};

/// Disconnected significant OD pairs.
pub const DISCONNECTED_OD_PAIRS: &str = "disconnected_od_pairs.csv";
/// OD pairs with implausible distance ratios.
pub const PROBLEMATIC_OD_DISTANCES: &str = "problematic_od_distances.csv";
/// Links whose assigned volume deviates >100% from ref_volume.
pub const PROBLEM_VOLUME_LINKS: &str = "problem_volume_links.csv";
/// Links whose assigned volume deviates >100% from obs_volume.
pub const PROBLEM_OBS_VOLUME_LINKS: &str = "problem_obs_volume_links.csv";

/// Writes diagnostic CSV files into one directory, or nothing when disabled.
#[derive(Debug, Clone)]
pub struct Exporter {
    dir: PathBuf,
    enabled: bool,
}

impl Exporter {
    pub fn new(dir: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            dir: dir.into(),
            enabled,
        }
    }

    pub fn disabled() -> Self {
        Self::new(PathBuf::new(), false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Write `rows` under `header` to `<dir>/<file_name>`.
    ///
    /// Returns the written path, or `None` when exports are disabled.
    pub fn write<I>(&self, file_name: &str, header: &[&str], rows: I) -> Result<Option<PathBuf>>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        if !self.enabled {
            return Ok(None);
        }
        let path = self.dir.join(file_name);
        write_csv(&path, header, rows).map_err(|source| CheckError::Export {
            path: path.clone(),
            source,
        })?;
        tracing::info!(path = %path.display(), "wrote diagnostic export");
        Ok(Some(path))
    }

    /// Write an export and describe the outcome as a result.
    ///
    /// Success yields the INFO built by `message` from the written path. A
    /// write failure yields an ERROR. Disabled exports yield nothing.
    pub(crate) fn report<I, F>(
        &self,
        file_name: &str,
        header: &[&str],
        rows: I,
        field: &str,
        message: F,
    ) -> Option<ValidationResult>
    where
        I: IntoIterator<Item = Vec<String>>,
        F: FnOnce(&Path) -> String,
    {
        match self.write(file_name, header, rows) {
            Ok(Some(path)) => Some(
                ValidationResult::info(message(&path))
                    .with_field(field)
                    .with_details(json!({ "output_file": path.display().to_string() })),
            ),
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(file = file_name, error = %err, "diagnostic export failed");
                Some(ValidationResult::error(err.to_string()).with_field(field))
            }
        }
    }
}

fn write_csv<I>(path: &Path, header: &[&str], rows: I) -> std::result::Result<(), csv::Error>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = csv::WriterBuilder::new().from_path(path)?;
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}
