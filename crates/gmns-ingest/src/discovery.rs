//! File discovery for network working directories.

use std::path::{Path, PathBuf};

use crate::error::{IngestError, Result};

/// Stem fragments of engine outputs and ODME targets, never picked as inputs.
const EXCLUDED_STEM_PARTS: &[&str] = &["performance", "assignment", "_target"];

/// Input files found in a working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkFiles {
    pub node: PathBuf,
    pub link: PathBuf,
    /// Only set when a demand file exists.
    pub demand: Option<PathBuf>,
}

/// Lists all CSV files in a directory.
///
/// Returns files sorted by filename.
pub fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(IngestError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut files = Vec::new();

    let entries = std::fs::read_dir(dir).map_err(|e| IngestError::DirectoryRead {
        path: dir.to_path_buf(),
        source: e,
    })?;

    for entry_result in entries {
        let entry = entry_result.map_err(|e| IngestError::DirectoryRead {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

        if is_csv {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    Ok(files)
}

/// First file whose lower-cased stem contains `keyword`, skipping engine outputs.
pub fn find_by_keyword(files: &[PathBuf], keyword: &str) -> Option<PathBuf> {
    files
        .iter()
        .find(|path| {
            let stem = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .map(str::to_ascii_lowercase)
                .unwrap_or_default();
            stem.contains(keyword) && !EXCLUDED_STEM_PARTS.iter().any(|part| stem.contains(part))
        })
        .cloned()
}

/// Locate node, link and demand files in `dir`.
///
/// Node and link fall back to `node.csv` / `link.csv` even when those do not
/// exist, so a missing file is reported by the loader. Demand is optional.
pub fn discover_network_files(dir: &Path) -> Result<NetworkFiles> {
    let files = list_csv_files(dir)?;

    let node = find_by_keyword(&files, "node").unwrap_or_else(|| dir.join("node.csv"));
    let link = find_by_keyword(&files, "link").unwrap_or_else(|| dir.join("link.csv"));
    let demand = find_by_keyword(&files, "demand").or_else(|| {
        let fallback = dir.join("demand.csv");
        fallback.is_file().then_some(fallback)
    });

    tracing::debug!(
        dir = %dir.display(),
        node = %node.display(),
        link = %link.display(),
        demand = ?demand,
        "discovered network files"
    );

    Ok(NetworkFiles { node, link, demand })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_dir(names: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for name in names {
            std::fs::write(dir.path().join(name), "header\n").unwrap();
        }
        dir
    }

    #[test]
    fn test_list_csv_files_sorted_case_insensitive() {
        let dir = create_test_dir(&["link.CSV", "demand.csv", "notes.txt"]);
        let files = list_csv_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["demand.csv", "link.CSV"]);
    }

    #[test]
    fn test_discovery_skips_engine_outputs() {
        let dir = create_test_dir(&[
            "link_performance.csv",
            "my_links.csv",
            "Node.csv",
            "demand_target.csv",
            "route_assignment.csv",
        ]);
        let found = discover_network_files(dir.path()).unwrap();
        assert_eq!(found.link.file_name().unwrap(), "my_links.csv");
        assert_eq!(found.node.file_name().unwrap(), "Node.csv");
        assert_eq!(found.demand, None);
    }

    #[test]
    fn test_discovery_defaults() {
        let dir = create_test_dir(&[]);
        let found = discover_network_files(dir.path()).unwrap();
        assert_eq!(found.node, dir.path().join("node.csv"));
        assert_eq!(found.link, dir.path().join("link.csv"));
        assert!(found.demand.is_none());
    }

    #[test]
    fn test_not_a_directory() {
        let dir = create_test_dir(&["node.csv"]);
        let result = list_csv_files(&dir.path().join("node.csv"));
        assert!(matches!(result, Err(IngestError::DirectoryNotFound { .. })));
    }
}
