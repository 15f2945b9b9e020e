//! Input resolution and the JSON report file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gmns_ingest::discover_network_files;
use gmns_model::ValidationReport;
use gmns_validate::NetworkPaths;

pub const REPORT_FILE: &str = "validation_report.json";

/// Explicit file choices from the command line.
#[derive(Debug, Clone, Default)]
pub struct FileOverrides {
    pub node: Option<PathBuf>,
    pub link: Option<PathBuf>,
    pub demand: Option<PathBuf>,
}

/// Node, link and demand paths: overrides first, discovery for the rest.
///
/// Discovery only runs when at least one of node or link is not given.
pub fn resolve_network_paths(working_dir: &Path, overrides: FileOverrides) -> Result<NetworkPaths> {
    if let (Some(node), Some(link)) = (&overrides.node, &overrides.link) {
        return Ok(NetworkPaths::new(Some(node.clone()), link.clone(), overrides.demand));
    }
    let discovered = discover_network_files(working_dir)
        .with_context(|| format!("read working directory {}", working_dir.display()))?;
    Ok(NetworkPaths::new(
        Some(overrides.node.unwrap_or(discovered.node)),
        overrides.link.unwrap_or(discovered.link),
        overrides.demand.or(discovered.demand),
    ))
}

pub fn default_report_path(working_dir: &Path) -> PathBuf {
    working_dir.join(REPORT_FILE)
}

/// Pretty-printed JSON report.
pub fn write_report(report: &ValidationReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("serialize validation report")?;
    fs::write(path, json).with_context(|| format!("write report {}", path.display()))?;
    tracing::info!(path = %path.display(), "wrote validation report");
    Ok(())
}

/// 1 when the report holds any ERROR, otherwise 0.
pub fn exit_code(report: &ValidationReport) -> i32 {
    i32::from(report.has_errors())
}
