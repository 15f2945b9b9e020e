//! Readiness-level orchestration.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Local;
use gmns_ingest::{Dataset, NetworkFiles, Table};
use gmns_model::{ReadinessLevel, ReportMetadata, ValidationReport, ValidationResult};
use tracing::{debug, error, info, info_span, warn};

use crate::cache::{LevelCache, input_fingerprint};
use crate::checks::{self, CheckInputs};
use crate::engine::{EngineRunner, ProcessRunner, wait_for_file};
use crate::error::{CheckError, EngineError};
use crate::execution::{EngineMode, ExecutionConfig};
use crate::export::Exporter;
use crate::post_run::connectivity::validate_od_connectivity;
use crate::post_run::fit::check_reference_r2;
use crate::post_run::link_performance::validate_link_performance;
use crate::post_run::post_od::validate_post_od;
use crate::post_run::route::validate_route_assignment;
use crate::post_run::{LINK_PERFORMANCE, OD_PERFORMANCE, ROUTE_ASSIGNMENT, absorb};
use crate::stats::field_statistics;

const MODE_TYPE_FILE: &str = "mode_type.csv";
const SETTINGS_FILE: &str = "settings.csv";

/// Input file locations. The working directory is the link file's directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkPaths {
    pub node: Option<PathBuf>,
    pub link: PathBuf,
    pub demand: Option<PathBuf>,
}

impl NetworkPaths {
    pub fn new(node: Option<PathBuf>, link: PathBuf, demand: Option<PathBuf>) -> Self {
        Self { node, link, demand }
    }

    pub fn working_dir(&self) -> PathBuf {
        match self.link.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

impl From<NetworkFiles> for NetworkPaths {
    fn from(files: NetworkFiles) -> Self {
        Self::new(Some(files.node), files.link, files.demand)
    }
}

#[derive(Debug)]
struct LoadedInputs {
    node: Dataset,
    link: Dataset,
    demand: Dataset,
    mode_type: Dataset,
    settings: Dataset,
}

/// Validates a GMNS network up to a readiness level.
///
/// Levels 6 to 8 are memoized per instance and replayed while the input
/// files are unchanged, so repeated calls do not re-run the engine.
pub struct NetworkValidator {
    paths: NetworkPaths,
    working_dir: PathBuf,
    config: ExecutionConfig,
    runner: Option<Box<dyn EngineRunner>>,
    inputs: Option<LoadedInputs>,
    cache: LevelCache,
}

impl NetworkValidator {
    pub fn new(paths: NetworkPaths, config: ExecutionConfig) -> Self {
        let working_dir = paths.working_dir();
        Self {
            paths,
            working_dir,
            config,
            runner: None,
            inputs: None,
            cache: LevelCache::new(),
        }
    }

    /// Register the engine used by [`EngineMode::InProcess`].
    #[must_use]
    pub fn with_engine_runner(mut self, runner: Box<dyn EngineRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn paths(&self) -> &NetworkPaths {
        &self.paths
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    fn config_path(&self, file_name: &str) -> Option<PathBuf> {
        let path = self.working_dir.join(file_name);
        path.is_file().then_some(path)
    }

    fn fingerprint(&self) -> String {
        let mode_type = self.config_path(MODE_TYPE_FILE);
        let settings = self.config_path(SETTINGS_FILE);
        input_fingerprint([
            self.paths.node.as_deref(),
            Some(self.paths.link.as_path()),
            self.paths.demand.as_deref(),
            mode_type.as_deref(),
            settings.as_deref(),
        ])
    }

    fn load_inputs(&self) -> LoadedInputs {
        let started = Instant::now();
        let inputs = LoadedInputs {
            node: Dataset::load("node", self.paths.node.as_deref()),
            link: Dataset::load("link", Some(&self.paths.link)),
            demand: Dataset::load("demand", self.paths.demand.as_deref()),
            mode_type: Dataset::load("mode_type", self.config_path(MODE_TYPE_FILE).as_deref()),
            settings: Dataset::load("settings", self.config_path(SETTINGS_FILE).as_deref()),
        };
        info!(
            nodes = inputs.node.height(),
            links = inputs.link.height(),
            demand_rows = inputs.demand.height(),
            duration_ms = started.elapsed().as_millis() as u64,
            "loaded network inputs"
        );
        inputs
    }

    /// Run every level up to and including `level` and build the report.
    pub fn validate(&mut self, level: ReadinessLevel) -> ValidationReport {
        let started = Instant::now();
        let fingerprint = self.fingerprint();
        if self.cache.refresh(&fingerprint) || self.inputs.is_none() {
            self.inputs = Some(self.load_inputs());
        }
        let Some(inputs) = self.inputs.take() else {
            return ValidationReport::new(&[], ReportMetadata::default(), Default::default());
        };

        let mut results = self.file_existence(&inputs);
        match inputs.link.rows() {
            Some(link) => {
                for current in level.cumulative() {
                    let span = info_span!("readiness_level", level = current.ordinal());
                    let _guard = span.enter();
                    results.extend(self.run_level(current, &inputs, link));
                }
            }
            None => error!(
                link = %self.paths.link.display(),
                "link file is unusable, skipping all readiness levels"
            ),
        }

        let report = self.build_report(level, &inputs, &results);
        info!(
            level = level.ordinal(),
            errors = report.summary.errors,
            warnings = report.summary.warnings,
            total = report.summary.total,
            duration_ms = started.elapsed().as_millis() as u64,
            "validation complete"
        );
        self.inputs = Some(inputs);
        report
    }

    fn file_existence(&self, inputs: &LoadedInputs) -> Vec<ValidationResult> {
        let mut results: Vec<ValidationResult> = [&inputs.node, &inputs.link, &inputs.demand]
            .into_iter()
            .filter_map(Dataset::load_error)
            .map(ValidationResult::error)
            .collect();
        if let Some(node_path) = &self.paths.node
            && inputs.node.is_empty_or_failed()
        {
            results.push(ValidationResult::error(format!(
                "Node file is empty or couldn't be loaded: {}",
                node_path.display()
            )));
        }
        if inputs.link.rows().is_none() {
            results.push(ValidationResult::error(format!(
                "Link file is empty or couldn't be loaded: {}",
                self.paths.link.display()
            )));
        }
        results
    }

    fn run_level(&mut self, level: ReadinessLevel, inputs: &LoadedInputs, link: &Table) -> Vec<ValidationResult> {
        if let Some(cached) = self.cache.get(level) {
            debug!(level = level.ordinal(), results = cached.len(), "replaying cached level");
            return cached.to_vec();
        }
        let started = Instant::now();
        let check_inputs = CheckInputs {
            node: &inputs.node,
            link,
            demand: &inputs.demand,
            mode_type: &inputs.mode_type,
            settings: &inputs.settings,
            working_dir: &self.working_dir,
        };
        let results = match level {
            ReadinessLevel::Structural => checks::run_structural(&check_inputs),
            ReadinessLevel::DemandZone => checks::run_demand_zone(&check_inputs),
            ReadinessLevel::NetworkAttributes => checks::run_network_attributes(&check_inputs),
            ReadinessLevel::Configuration => checks::run_configuration(&check_inputs),
            ReadinessLevel::OdmeReadiness => checks::run_odme(&check_inputs),
            ReadinessLevel::Accessibility => self.run_accessibility(inputs),
            ReadinessLevel::AssignmentFit => self.run_assignment_fit(link),
            ReadinessLevel::PostOdAssignment => self.run_post_od(inputs),
        };
        info!(
            level = level.ordinal(),
            results = results.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "level complete"
        );
        self.cache.insert(level, results.clone());
        results
    }

    fn exporter(&self) -> Exporter {
        Exporter::new(&self.working_dir, self.config.export_diagnostics)
    }

    fn output_path(&self, file_name: &str) -> PathBuf {
        self.working_dir.join(file_name)
    }

    /// An engine output if it exists: `Some(Err)` when it cannot be read.
    fn load_output(&self, file_name: &str) -> Option<gmns_ingest::Result<Table>> {
        let path = self.output_path(file_name);
        path.is_file().then(|| {
            let stem = file_name.trim_end_matches(".csv");
            Table::read(stem, &path)
        })
    }

    fn run_engine(&self) -> Result<(), EngineError> {
        match &self.config.engine {
            EngineMode::Disabled => Ok(()),
            EngineMode::InProcess => match &self.runner {
                Some(runner) => runner.run(&self.working_dir),
                None => Err(EngineError::InProcess {
                    message: "no engine runner registered".to_string(),
                }),
            },
            EngineMode::Executable { program, args } => {
                ProcessRunner::new(program.clone(), args.clone()).run(&self.working_dir)
            }
        }
    }

    /// Level 6: engine run, OD connectivity and route assignment.
    fn run_accessibility(&self, inputs: &LoadedInputs) -> Vec<ValidationResult> {
        let mut results = Vec::new();
        let od_path = self.output_path(OD_PERFORMANCE);

        let engine_completed = if self.config.runs_engine() {
            match self.run_engine() {
                Ok(()) => true,
                Err(err) => {
                    warn!(error = %err, "assignment engine failed");
                    results.push(
                        ValidationResult::warning(format!("Assignment engine did not complete: {err}"))
                            .with_field("accessibility"),
                    );
                    false
                }
            }
        } else {
            false
        };
        let od_available = if engine_completed {
            wait_for_file(&od_path, self.config.output_timeout, self.config.poll_interval)
        } else {
            od_path.is_file()
        };

        let context = "Error validating OD connectivity";
        if od_available {
            let outcome = Table::read("od_performance", &od_path)
                .map_err(CheckError::from)
                .and_then(|od| validate_od_connectivity(&od, &inputs.mode_type, &self.working_dir, &self.exporter()));
            results.extend(absorb(context, "accessibility", outcome));
        } else {
            results.push(
                ValidationResult::warning("od_performance.csv not found. Cannot perform accessibility validation.")
                    .with_field("accessibility"),
            );
        }

        match self.load_output(ROUTE_ASSIGNMENT) {
            Some(routes) => results.extend(absorb(
                "Error validating route assignments",
                "route_assignment",
                routes.map_err(CheckError::from).and_then(|routes| validate_route_assignment(&routes)),
            )),
            None => results.push(
                ValidationResult::info(
                    "route_assignment.csv not found. Will only use od_performance.csv for accessibility checks.",
                )
                .with_field("accessibility"),
            ),
        }
        results
    }

    /// Level 7: link performance, reference R² and route assignment.
    fn run_assignment_fit(&self, link: &Table) -> Vec<ValidationResult> {
        let mut results = Vec::new();
        let exporter = self.exporter();

        let perf = match self.load_output(LINK_PERFORMANCE) {
            None => {
                results.push(
                    ValidationResult::warning("link_performance.csv not found. Cannot perform assignment validation.")
                        .with_field("assignment"),
                );
                None
            }
            Some(Err(err)) => {
                results.push(
                    ValidationResult::error(format!("Error validating link performance: {err}"))
                        .with_field("assignment"),
                );
                results.push(link_performance_done());
                None
            }
            Some(Ok(perf)) => {
                results.extend(absorb(
                    "Error validating link performance",
                    "assignment",
                    validate_link_performance(&perf, &exporter),
                ));
                results.push(link_performance_done());
                Some(perf)
            }
        };

        results.extend(check_reference_r2(link, perf.as_ref()));

        match self.load_output(ROUTE_ASSIGNMENT) {
            Some(routes) => {
                results.extend(absorb(
                    "Error validating route assignments",
                    "route_assignment",
                    routes.map_err(CheckError::from).and_then(|routes| validate_route_assignment(&routes)),
                ));
                results.push(
                    ValidationResult::success(
                        "Route assignment validation completed successfully with proper path distributions",
                    )
                    .with_field("route_assignment"),
                );
            }
            None => results.push(
                ValidationResult::info(
                    "route_assignment.csv not found. Will only use link_performance.csv for assignment checks.",
                )
                .with_field("assignment"),
            ),
        }

        results.push(
            ValidationResult::success("Traffic assignment validation (Level 7) completed successfully")
                .with_field("level_7"),
        );
        results
    }

    /// Level 8: top demand pairs against assigned volume and travel time.
    fn run_post_od(&self, inputs: &LoadedInputs) -> Vec<ValidationResult> {
        let demand = inputs.demand.rows();
        let mut results = Vec::new();

        let mut read_output = |file_name: &str| match self.load_output(file_name) {
            Some(Ok(table)) => Some(table),
            Some(Err(err)) => {
                results.push(
                    ValidationResult::error(format!("Error reading {file_name}: {err}")).with_field("od_assignment"),
                );
                None
            }
            None => None,
        };
        let od = read_output(OD_PERFORMANCE);
        let routes = read_output(ROUTE_ASSIGNMENT);

        results.extend(absorb(
            "Error validating post-OD assignment",
            "od_assignment",
            validate_post_od(demand, od.as_ref(), routes.as_ref()),
        ));

        let demand_usable =
            demand.is_some_and(|demand| demand.missing_fields(&["o_zone_id", "d_zone_id", "volume"]).is_empty());
        if demand_usable {
            results.push(
                ValidationResult::success("Post-OD assignment validation (Level 8) completed successfully")
                    .with_field("level_8"),
            );
        }
        results
    }

    fn build_report(
        &self,
        level: ReadinessLevel,
        inputs: &LoadedInputs,
        results: &[ValidationResult],
    ) -> ValidationReport {
        let display = |path: &Path| path.display().to_string();
        let metadata = ReportMetadata {
            node_file: self.paths.node.as_deref().map(display),
            link_file: Some(display(&self.paths.link)),
            demand_file: self.paths.demand.as_deref().map(display),
            validation_time: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            level: level.ordinal(),
            node_count: inputs.node.height(),
            link_count: inputs.link.height(),
            demand_count: inputs.demand.height(),
        };
        let statistics = field_statistics([
            ("node", inputs.node.table()),
            ("link", inputs.link.table()),
            ("demand", inputs.demand.table()),
        ]);
        ValidationReport::new(results, metadata, statistics)
    }
}

fn link_performance_done() -> ValidationResult {
    ValidationResult::success("Link performance validation completed successfully with reasonable metrics")
        .with_field("assignment")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_working_dir_is_link_parent() {
        let paths = NetworkPaths::new(None, PathBuf::from("net/link.csv"), None);
        assert_eq!(paths.working_dir(), PathBuf::from("net"));
        let bare = NetworkPaths::new(None, PathBuf::from("link.csv"), None);
        assert_eq!(bare.working_dir(), PathBuf::from("."));
    }

    #[test]
    fn test_missing_link_is_the_only_fatal_condition() {
        let dir = TempDir::new().unwrap();
        let paths = NetworkPaths::new(None, dir.path().join("link.csv"), None);
        let mut validator = NetworkValidator::new(paths, ExecutionConfig::default());
        let report = validator.validate(ReadinessLevel::NetworkAttributes);
        assert!(report.has_errors());
        assert!(report.errors.iter().any(|e| e.message.starts_with("Failed to load")));
        assert!(report.errors.iter().any(|e| e.message.starts_with("Link file is empty")));
        assert!(report.warnings.is_empty());
        assert_eq!(report.metadata.level, 3);
    }

    #[test]
    fn test_header_only_node_file_is_reported() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("node.csv"), "node_id,zone_id,x_coord,y_coord\n").unwrap();
        fs::write(
            dir.path().join("link.csv"),
            "link_id,from_node_id,to_node_id\n1,1,2\n",
        )
        .unwrap();
        let paths = NetworkPaths::new(Some(dir.path().join("node.csv")), dir.path().join("link.csv"), None);
        let mut validator = NetworkValidator::new(paths, ExecutionConfig::default());
        let report = validator.validate(ReadinessLevel::Structural);
        assert!(report.errors.iter().any(|e| e.message.starts_with("Node file is empty")));
        assert_eq!(report.metadata.link_count, 1);
    }
}
