use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use gmns_cli::report::{FileOverrides, default_report_path, resolve_network_paths, write_report};
use gmns_model::{ReadinessLevel, ValidationReport};
use gmns_validate::{EngineMode, ExecutionConfig, NetworkValidator};
use tracing::{info, info_span};

use crate::cli::Cli;

/// A finished run and where its report was written.
pub struct RunOutcome {
    pub report: ValidationReport,
    pub report_path: PathBuf,
}

pub fn execution_config(cli: &Cli) -> ExecutionConfig {
    let engine = match &cli.engine {
        Some(program) => EngineMode::Executable {
            program: program.clone(),
            args: cli.engine_args.clone(),
        },
        None => EngineMode::Disabled,
    };
    ExecutionConfig::default()
        .with_engine(engine)
        .with_accessibility(!cli.no_accessibility)
        .with_output_timeout(Duration::from_secs(cli.timeout_secs))
        .with_poll_interval(Duration::from_millis(cli.poll_interval_ms))
        .with_export_diagnostics(!cli.no_exports)
}

pub fn run_validate(cli: &Cli) -> Result<RunOutcome> {
    let level = ReadinessLevel::from_ordinal(cli.level)?;
    let span = info_span!("validate", dir = %cli.working_dir.display(), level = cli.level);
    let _guard = span.enter();
    let started = Instant::now();

    let paths = resolve_network_paths(
        &cli.working_dir,
        FileOverrides {
            node: cli.node.clone(),
            link: cli.link.clone(),
            demand: cli.demand.clone(),
        },
    )?;
    let config = execution_config(cli);
    info!(
        node = ?paths.node,
        link = %paths.link.display(),
        demand = ?paths.demand,
        engine = %config.engine,
        "starting validation"
    );

    let mut validator = NetworkValidator::new(paths, config);
    let report = validator.validate(level);

    let report_path = cli
        .report
        .clone()
        .unwrap_or_else(|| default_report_path(&cli.working_dir));
    write_report(&report, &report_path)?;

    info!(
        errors = report.summary.errors,
        warnings = report.summary.warnings,
        duration_ms = started.elapsed().as_millis() as u64,
        "validation finished"
    );
    Ok(RunOutcome { report, report_path })
}
